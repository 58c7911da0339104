use crate::libs::error::{ChainError, Result};
use std::io::BufRead;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainHeader {
    pub score: f64,
    pub t_name: String,
    pub t_size: u64,
    pub t_strand: char,
    pub t_start: u64,
    pub t_end: u64,
    pub q_name: String,
    pub q_size: u64,
    pub q_strand: char,
    pub q_start: u64,
    pub q_end: u64,
    pub id: u64,
}

/// One `size dt dq` line of the chain format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainData {
    pub size: u64,
    pub dt: u64,
    pub dq: u64,
}

/// A gapless aligned interval, 0-based half-open on both sequences.
///
/// Query coordinates are on the strand given by the owning chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub q_start: u64,
    pub q_end: u64,
    pub t_start: u64,
    pub t_end: u64,
    pub score: f64,
}

impl Block {
    pub fn new(q_start: u64, q_end: u64, t_start: u64, t_end: u64) -> Self {
        Block {
            q_start,
            q_end,
            t_start,
            t_end,
            score: 0.0,
        }
    }

    pub fn q_size(&self) -> u64 {
        self.q_end.saturating_sub(self.q_start)
    }

    pub fn t_size(&self) -> u64 {
        self.t_end.saturating_sub(self.t_start)
    }

    /// Diagonal, used for deduplicating blocks of several passes.
    pub fn diagonal(&self) -> i64 {
        self.t_start as i64 - self.q_start as i64
    }

    pub fn is_dead(&self) -> bool {
        self.q_start >= self.q_end || self.t_start >= self.t_end
    }

    pub fn shift(&mut self, dq: u64, dt: u64) {
        self.q_start += dq;
        self.q_end += dq;
        self.t_start += dt;
        self.t_end += dt;
    }
}

/// An ordered list of blocks plus the chain-file header.
///
/// The header's ranges always mirror the first and last block; call
/// [`Chain::calc_bounds`] after editing `blocks`.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    pub header: ChainHeader,
    pub blocks: Vec<Block>,
}

impl Chain {
    pub fn new(mut header: ChainHeader, blocks: Vec<Block>) -> Self {
        if let (Some(first), Some(last)) = (blocks.first(), blocks.last()) {
            header.t_start = first.t_start;
            header.t_end = last.t_end;
            header.q_start = first.q_start;
            header.q_end = last.q_end;
        }
        Chain { header, blocks }
    }

    /// Recomputes the header ranges from the first and last block.
    pub fn calc_bounds(&mut self) {
        if let (Some(first), Some(last)) = (self.blocks.first(), self.blocks.last()) {
            self.header.t_start = first.t_start;
            self.header.t_end = last.t_end;
            self.header.q_start = first.q_start;
            self.header.q_end = last.q_end;
        }
    }

    /// Convert chain data (relative coordinates) to blocks (absolute coordinates).
    pub fn blocks_from_data(header: &ChainHeader, data: &[ChainData]) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(data.len());
        let mut t_curr = header.t_start;
        let mut q_curr = header.q_start;

        for d in data {
            blocks.push(Block::new(q_curr, q_curr + d.size, t_curr, t_curr + d.size));

            t_curr += d.size + d.dt;
            q_curr += d.size + d.dq;
        }

        blocks
    }

    /// Reconstruct chain data from blocks.
    pub fn to_data(&self) -> Vec<ChainData> {
        let mut data = Vec::with_capacity(self.blocks.len());
        for (i, curr) in self.blocks.iter().enumerate() {
            let (dt, dq) = match self.blocks.get(i + 1) {
                Some(next) => (next.t_start - curr.t_end, next.q_start - curr.q_end),
                None => (0, 0),
            };
            data.push(ChainData {
                size: curr.t_size(),
                dt,
                dq,
            });
        }
        data
    }

    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let score = if self.header.score.fract() == 0.0 {
            format!("{}", self.header.score as i64)
        } else {
            format!("{:.1}", self.header.score)
        };
        writeln!(
            writer,
            "chain {} {} {} {} {} {} {} {} {} {} {} {}",
            score,
            self.header.t_name,
            self.header.t_size,
            self.header.t_strand,
            self.header.t_start,
            self.header.t_end,
            self.header.q_name,
            self.header.q_size,
            self.header.q_strand,
            self.header.q_start,
            self.header.q_end,
            self.header.id
        )?;

        let data = self.to_data();
        let len = data.len();
        for (i, d) in data.iter().enumerate() {
            if i == len - 1 {
                writeln!(writer, "{}", d.size)?;
            } else {
                writeln!(writer, "{} {} {}", d.size, d.dt, d.dq)?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }

    /// Number of aligned bases (target side).
    pub fn aligned_bases(&self) -> u64 {
        self.blocks.iter().map(|b| b.t_size()).sum()
    }

    /// Projects the chain onto the target range `[t_start, t_end)`.
    ///
    /// Blocks straddling the range are clipped along their diagonal.
    /// Returns `None` if no aligned base falls in the range.
    pub fn subset_on_t(&self, t_start: u64, t_end: u64) -> Option<Chain> {
        let mut new_blocks = Vec::new();

        for b in &self.blocks {
            let start = std::cmp::max(b.t_start, t_start);
            let end = std::cmp::min(b.t_end, t_end);

            if start < end {
                let offset = start - b.t_start;
                let len = end - start;
                new_blocks.push(Block {
                    t_start: start,
                    t_end: end,
                    q_start: b.q_start + offset,
                    q_end: b.q_start + offset + len,
                    score: 0.0,
                });
            }
        }

        if new_blocks.is_empty() {
            None
        } else {
            Some(Chain::new(self.header.clone(), new_blocks))
        }
    }

    /// Splices out every block between the last block starting before `t_start`
    /// and the first block starting at or after `t_end`.
    ///
    /// Fails if that would remove the first or the last block of the chain.
    /// Returns how many blocks went; 0 when a kept block straddles the range.
    pub fn remove_blocks_on_t(&mut self, t_start: u64, t_end: u64) -> Result<usize> {
        let terminal = |which| ChainError::RemovesTerminalBlock {
            chain_id: self.header.id,
            start: t_start,
            end: t_end,
            which,
        };

        let first_kept = self
            .blocks
            .iter()
            .rposition(|b| b.t_start < t_start)
            .ok_or_else(|| terminal("first"))?;
        let last_kept = self
            .blocks
            .iter()
            .skip(first_kept + 1)
            .position(|b| b.t_start >= t_end)
            .map(|i| i + first_kept + 1)
            .ok_or_else(|| terminal("last"))?;

        let removed = self.blocks.drain(first_kept + 1..last_kept).count();
        if removed > 0 {
            self.calc_bounds();
        }
        Ok(removed)
    }
}

/// Sorts chains by score, highest first; ties keep their id order.
pub fn sort_chains(chains: &mut [Chain]) {
    chains.sort_by(|a, b| {
        b.header
            .score
            .total_cmp(&a.header.score)
            .then(a.header.id.cmp(&b.header.id))
    });
}

impl FromStr for ChainHeader {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() < 13 || parts[0] != "chain" {
            return Err("invalid chain header line".to_string());
        }

        fn num<T: FromStr>(s: &str) -> std::result::Result<T, String> {
            s.parse::<T>().map_err(|_| format!("bad number '{}'", s))
        }
        fn strand(s: &str) -> std::result::Result<char, String> {
            match s {
                "+" => Ok('+'),
                "-" => Ok('-'),
                _ => Err(format!("bad strand '{}'", s)),
            }
        }

        Ok(ChainHeader {
            score: num(parts[1])?,
            t_name: parts[2].to_string(),
            t_size: num(parts[3])?,
            t_strand: strand(parts[4])?,
            t_start: num(parts[5])?,
            t_end: num(parts[6])?,
            q_name: parts[7].to_string(),
            q_size: num(parts[8])?,
            q_strand: strand(parts[9])?,
            q_start: num(parts[10])?,
            q_end: num(parts[11])?,
            id: num(parts[12])?,
        })
    }
}

pub struct ChainReader<R> {
    reader: R,
    next_line: Option<String>,
    line_no: usize,
}

impl<R: BufRead> ChainReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            next_line: None,
            line_no: 0,
        }
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        if let Some(line) = self.next_line.take() {
            return Ok(Some(line));
        }
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)?;
        if n == 0 {
            Ok(None)
        } else {
            self.line_no += 1;
            Ok(Some(buf))
        }
    }

    fn push_back(&mut self, line: String) {
        self.next_line = Some(line);
    }

    fn malformed(&self, message: String) -> ChainError {
        ChainError::MalformedChain {
            line: self.line_no,
            message,
        }
    }

    fn next_chain(&mut self) -> Result<Option<Chain>> {
        // Find next chain header
        let header_line = loop {
            match self.read_line()? {
                Some(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    if trimmed.starts_with("chain") {
                        break trimmed.to_string();
                    }
                    return Err(self.malformed(format!("expected chain header, got '{}'", trimmed)));
                }
                None => return Ok(None),
            }
        };

        let header = ChainHeader::from_str(&header_line).map_err(|e| self.malformed(e))?;

        let mut data = Vec::new();
        while let Some(line) = self.read_line()? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if trimmed.starts_with("chain") {
                self.push_back(line);
                break;
            }

            let parts: Vec<u64> = trimmed
                .split_whitespace()
                .map(|s| s.parse::<u64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| self.malformed(format!("bad data line '{}'", trimmed)))?;
            match parts.as_slice() {
                [size] => data.push(ChainData {
                    size: *size,
                    dt: 0,
                    dq: 0,
                }),
                [size, dt, dq] => data.push(ChainData {
                    size: *size,
                    dt: *dt,
                    dq: *dq,
                }),
                _ => return Err(self.malformed(format!("bad data line '{}'", trimmed))),
            }
        }

        if data.is_empty() {
            return Err(self.malformed(format!("chain {} has no blocks", header.id)));
        }

        let (t_end, q_end) = (header.t_end, header.q_end);
        let blocks = Chain::blocks_from_data(&header, &data);
        let chain = Chain::new(header, blocks);
        if chain.header.t_end != t_end
            || chain.header.q_end != q_end
            || t_end > chain.header.t_size
            || q_end > chain.header.q_size
        {
            return Err(self.malformed(format!(
                "chain {} blocks do not fit its header",
                chain.header.id
            )));
        }
        Ok(Some(chain))
    }
}

impl<R: BufRead> Iterator for ChainReader<R> {
    type Item = Result<Chain>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chain().transpose()
    }
}

pub fn read_chains<R: BufRead>(reader: R) -> Result<Vec<Chain>> {
    ChainReader::new(reader).collect()
}
