use crate::libs::error::{ChainError, Result};
use std::collections::HashMap;

/// Reads all records of a (possibly gzipped) FASTA file, in file order.
pub fn read_fasta(input: &str) -> Result<Vec<(String, Vec<u8>)>> {
    let reader = bio::io::fasta::Reader::new(crate::libs::io::reader(input)?);

    let mut seqs = Vec::new();
    for result in reader.records() {
        let record = result?;
        seqs.push((record.id().to_string(), record.seq().to_vec()));
    }

    Ok(seqs)
}

/// Reverse complement, keeping soft-masked case.
pub fn rev_comp(seq: &[u8]) -> Vec<u8> {
    bio::alphabets::dna::revcomp(seq)
}

/// Target and query sequences by name, with minus-strand queries materialised on demand.
///
/// Chain coordinates on a `-` query strand refer to the reverse complement,
/// so those are cached once per name.
#[derive(Default)]
pub struct SeqStore {
    targets: HashMap<String, Vec<u8>>,
    queries: HashMap<String, Vec<u8>>,
    queries_rc: HashMap<String, Vec<u8>>,
}

impl SeqStore {
    pub fn new(targets: Vec<(String, Vec<u8>)>, queries: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            queries: queries.into_iter().collect(),
            queries_rc: HashMap::new(),
        }
    }

    /// Makes `query(name, strand)` available; a no-op for `+`.
    pub fn prepare_query(&mut self, name: &str, strand: char) -> Result<()> {
        if strand != '-' || self.queries_rc.contains_key(name) {
            return Ok(());
        }
        let seq = self
            .queries
            .get(name)
            .ok_or_else(|| ChainError::MissingSequence {
                name: name.to_string(),
            })?;
        let rc = rev_comp(seq);
        self.queries_rc.insert(name.to_string(), rc);
        Ok(())
    }

    pub fn target(&self, name: &str) -> Result<&[u8]> {
        self.targets
            .get(name)
            .map(|s| s.as_slice())
            .ok_or_else(|| ChainError::MissingSequence {
                name: name.to_string(),
            })
    }

    pub fn query(&self, name: &str, strand: char) -> Result<&[u8]> {
        let map = if strand == '-' {
            &self.queries_rc
        } else {
            &self.queries
        };
        map.get(name)
            .map(|s| s.as_slice())
            .ok_or_else(|| ChainError::MissingSequence {
                name: format!("{}({})", name, strand),
            })
    }
}
