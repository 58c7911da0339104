use crate::libs::error::{ChainError, Result};
use std::io::BufRead;
use std::str::FromStr;

/// The net of one target sequence: top-level fills, each owning its gaps,
/// each gap owning the fills nested inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Net {
    pub name: String,
    pub size: u64,
    pub fills: Vec<Fill>,
}

/// A target range covered by one chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fill {
    pub t_start: u64,
    pub t_end: u64,
    pub q_name: String,
    pub q_strand: char,
    pub q_start: u64,
    pub q_end: u64,
    pub chain_id: u64,
    pub score: f64,
    pub ali: u64,
    pub gaps: Vec<Gap>,
}

/// An unaligned range inside a fill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gap {
    pub t_start: u64,
    pub t_end: u64,
    pub q_start: u64,
    pub q_end: u64,
    pub fills: Vec<Fill>,
}

enum Node {
    Fill(Fill),
    Gap(Gap),
}

fn malformed(line: usize, message: impl Into<String>) -> ChainError {
    ChainError::MalformedNet {
        line,
        message: message.into(),
    }
}

fn field<T: FromStr>(parts: &[&str], i: usize, line: usize, name: &str) -> Result<T> {
    parts
        .get(i)
        .ok_or_else(|| malformed(line, format!("missing {}", name)))?
        .parse::<T>()
        .map_err(|_| malformed(line, format!("invalid {} '{}'", name, parts[i])))
}

fn parse_fill(parts: &[&str], line: usize) -> Result<Fill> {
    let t_start: u64 = field(parts, 1, line, "tStart")?;
    let t_size: u64 = field(parts, 2, line, "tSize")?;
    let q_strand: char = field(parts, 4, line, "qStrand")?;
    let q_start: u64 = field(parts, 5, line, "qStart")?;
    let q_size: u64 = field(parts, 6, line, "qSize")?;

    let mut chain_id = None;
    let mut score = 0.0;
    let mut ali = 0;
    // Trailing `key value` pairs; only the ones used here are kept
    for (j, pair) in parts[7..].chunks(2).enumerate() {
        let i = 7 + j * 2;
        match pair[0] {
            "id" => chain_id = Some(field(parts, i + 1, line, "id")?),
            "score" => score = field(parts, i + 1, line, "score")?,
            "ali" => ali = field(parts, i + 1, line, "ali")?,
            _ => {}
        }
    }

    Ok(Fill {
        t_start,
        t_end: t_start + t_size,
        q_name: parts[3].to_string(),
        q_strand,
        q_start,
        q_end: q_start + q_size,
        chain_id: chain_id.ok_or_else(|| malformed(line, "fill without chain id"))?,
        score,
        ali,
        gaps: Vec::new(),
    })
}

fn parse_gap(parts: &[&str], line: usize) -> Result<Gap> {
    let t_start: u64 = field(parts, 1, line, "tStart")?;
    let t_size: u64 = field(parts, 2, line, "tSize")?;
    let q_start: u64 = field(parts, 5, line, "qStart")?;
    let q_size: u64 = field(parts, 6, line, "qSize")?;
    Ok(Gap {
        t_start,
        t_end: t_start + t_size,
        q_start,
        q_end: q_start + q_size,
        fills: Vec::new(),
    })
}

/// Pops the innermost open node and hangs it under its parent.
fn close_top(stack: &mut Vec<(usize, Node)>, net: &mut Net) {
    let Some((_, node)) = stack.pop() else {
        return;
    };
    match (stack.last_mut(), node) {
        (None, Node::Fill(fill)) => net.fills.push(fill),
        (Some((_, Node::Fill(parent))), Node::Gap(gap)) => parent.gaps.push(gap),
        (Some((_, Node::Gap(parent))), Node::Fill(fill)) => parent.fills.push(fill),
        // Alternation is checked when nodes are opened
        _ => {}
    }
}

/// Reads UCSC net text.
///
/// Nesting follows indentation; fills and gaps must alternate, starting
/// with a fill under each `net` line. Comment lines are skipped.
pub fn read_nets<R: BufRead>(reader: R) -> Result<Vec<Net>> {
    let mut nets = Vec::new();
    let mut current: Option<Net> = None;
    let mut stack: Vec<(usize, Node)> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let indent = line.len() - line.trim_start_matches(' ').len();
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts[0] == "net" {
            if let Some(mut net) = current.take() {
                while !stack.is_empty() {
                    close_top(&mut stack, &mut net);
                }
                nets.push(net);
            }
            current = Some(Net {
                name: parts
                    .get(1)
                    .ok_or_else(|| malformed(line_no, "missing net name"))?
                    .to_string(),
                size: field(&parts, 2, line_no, "net size")?,
                fills: Vec::new(),
            });
            continue;
        }

        let net = current
            .as_mut()
            .ok_or_else(|| malformed(line_no, "record before the first net line"))?;
        while stack.last().is_some_and(|(ind, _)| *ind >= indent) {
            close_top(&mut stack, net);
        }

        let node = match parts[0] {
            "fill" => {
                if let Some((_, Node::Fill(_))) = stack.last() {
                    return Err(malformed(line_no, "fill nested directly in a fill"));
                }
                Node::Fill(parse_fill(&parts, line_no)?)
            }
            "gap" => {
                if !matches!(stack.last(), Some((_, Node::Fill(_)))) {
                    return Err(malformed(line_no, "gap outside of a fill"));
                }
                Node::Gap(parse_gap(&parts, line_no)?)
            }
            other => return Err(malformed(line_no, format!("unknown record '{}'", other))),
        };
        stack.push((indent, node));
    }

    if let Some(mut net) = current.take() {
        while !stack.is_empty() {
            close_top(&mut stack, &mut net);
        }
        nets.push(net);
    }

    Ok(nets)
}
