use crate::libs::error::{ChainError, Result};
use std::io::BufRead;

/// A DNA substitution matrix for sequence alignment scoring.
///
/// Stores scores for all pairs of bytes (256x256), though typically only ACGTN are used.
/// Also stores gap open and gap extend penalties used by banded alignment.
#[derive(Clone, Debug)]
pub struct SubMatrix {
    matrix: Vec<i32>,
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for SubMatrix {
    fn default() -> Self {
        Self::uniform(100, -100)
    }
}

impl SubMatrix {
    /// `matched` on identical bases (case-insensitive), `mismatched` otherwise;
    /// N and every other byte score -100.
    pub fn uniform(matched: i32, mismatched: i32) -> Self {
        let mut scores = [[0; 4]; 4];
        for (i, row) in scores.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = if i == j { matched } else { mismatched };
            }
        }
        Self::from_acgt(&scores)
    }

    /// HoxD55 matrix (Lastz default).
    pub fn hoxd55() -> Self {
        //     A    C    G    T
        // A  91 -114  -31 -123
        // C -114 100 -125  -31
        // G  -31 -125 100 -114
        // T -123  -31 -114  91
        Self::from_acgt(&[
            [91, -114, -31, -123],
            [-114, 100, -125, -31],
            [-31, -125, 100, -114],
            [-123, -31, -114, 91],
        ])
    }

    fn from_acgt(scores: &[[i32; 4]; 4]) -> Self {
        let mut m = SubMatrix {
            matrix: vec![-100; 256 * 256],
            gap_open: 400,
            gap_extend: 30,
        };
        let bases = b"ACGT";
        for (i, &b1) in bases.iter().enumerate() {
            for (j, &b2) in bases.iter().enumerate() {
                m.set_all_cases(b1, b2, scores[i][j]);
            }
        }
        m
    }

    fn set_all_cases(&mut self, r: u8, c: u8, score: i32) {
        for r in [r.to_ascii_uppercase(), r.to_ascii_lowercase()] {
            for c in [c.to_ascii_uppercase(), c.to_ascii_lowercase()] {
                self.matrix[(r as usize) * 256 + (c as usize)] = score;
            }
        }
    }

    /// Get the substitution score for two bases.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.matrix[(a as usize) * 256 + (b as usize)]
    }

    /// Sum of substitution scores over two equal-length stretches.
    pub fn score_ungapped(&self, q: &[u8], t: &[u8]) -> i32 {
        q.iter().zip(t).map(|(&a, &b)| self.score(a, b)).sum()
    }

    /// Load from name (preset) or file.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "default" => Ok(Self::default()),
            "hoxd55" => Ok(Self::hoxd55()),
            _ => Self::from_reader(crate::libs::io::reader(name)?),
        }
    }

    /// Load a substitution matrix in BLAST/lastz layout.
    ///
    /// A header line names the columns (e.g. "A C G T"), followed by one row per base,
    /// optionally prefixed by the row base. Lines starting with '#' are comments.
    /// Optional gap costs can be specified with "O=..." and "E=..." tokens.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let invalid = |message: String| ChainError::InvalidMatrix { message };

        let mut m = SubMatrix {
            matrix: vec![-100; 256 * 256],
            gap_open: 400,
            gap_extend: 30,
        };
        let mut header: Option<Vec<u8>> = None;
        let mut rows: Vec<u8> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.contains('=') {
                let tokens: Vec<&str> = line
                    .split(|c: char| c == ',' || c == '=' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .collect();
                for pair in tokens.windows(2) {
                    let value = || {
                        pair[1]
                            .parse::<i32>()
                            .map_err(|_| invalid(format!("bad gap cost '{}'", pair[1])))
                    };
                    match pair[0] {
                        "O" => m.gap_open = value()?,
                        "E" => m.gap_extend = value()?,
                        _ => {}
                    }
                }
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let Some(columns) = &header else {
                if parts.iter().any(|s| s.len() != 1) {
                    return Err(invalid(format!("bad header line '{}'", line)));
                }
                header = Some(parts.iter().map(|s| s.as_bytes()[0]).collect());
                continue;
            };

            let (row_base, values) = if parts.len() == columns.len() + 1 {
                (parts[0].as_bytes()[0], &parts[1..])
            } else if parts.len() == columns.len() && rows.len() < columns.len() {
                (columns[rows.len()], &parts[..])
            } else {
                return Err(invalid(format!("bad matrix row '{}'", line)));
            };

            for (&col_base, value) in columns.iter().zip(values) {
                let score = value
                    .parse::<i32>()
                    .map_err(|_| invalid(format!("bad score '{}'", value)))?;
                m.set_all_cases(row_base, col_base, score);
            }
            rows.push(row_base);
        }

        let columns = header.ok_or_else(|| invalid("missing header line".into()))?;
        if rows.len() != columns.len() {
            return Err(invalid(format!(
                "{} rows for {} columns",
                rows.len(),
                columns.len()
            )));
        }
        for &a in &columns {
            for &b in &columns {
                if m.score(a, b) != m.score(b, a) {
                    return Err(invalid(format!(
                        "not symmetric at {}/{}",
                        a as char, b as char
                    )));
                }
            }
        }

        Ok(m)
    }
}
