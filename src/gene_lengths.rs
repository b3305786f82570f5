use ahash::AHashMap;
use std::path::Path;

use crate::error::{ExprError, Result};
use crate::seqio::{read_fasta_lengths, SeqRecord};

/// Gene identifier -> length in bases. Immutable once built.
#[derive(Debug, Default, Clone)]
pub struct GeneLengthIndex {
    lengths: AHashMap<String, u64>,
}

impl GeneLengthIndex {
    /// Build the index from one pass over reference records.
    /// Identifiers must be unique across all genomes.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = SeqRecord>,
    {
        let mut lengths = AHashMap::new();
        for rec in records {
            if lengths.insert(rec.id.clone(), rec.length).is_some() {
                return Err(ExprError::DuplicateGene { gene: rec.id });
            }
        }
        Ok(Self { lengths })
    }

    /// Scan every FASTA file (plain or gzipped) and index all of their records.
    pub fn from_fasta_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut records = Vec::new();
        for path in paths {
            let recs = read_fasta_lengths(path)?;
            log::debug!("{}: {} sequences", path.as_ref().display(), recs.len());
            records.extend(recs);
        }
        let index = Self::from_records(records)?;
        log::info!("Indexed lengths of {} genes", index.len());
        Ok(index)
    }

    pub fn get(&self, gene: &str) -> Option<u64> {
        self.lengths.get(gene).copied()
    }

    /// Length of `gene` in kilobases, the 'K' of RPKM.
    ///
    /// A gene missing from the index, or indexed with length 0, is a fatal
    /// reference-data fault.
    pub fn kilobases(&self, gene: &str) -> Result<f64> {
        match self.lengths.get(gene) {
            None => Err(ExprError::MissingGeneLength {
                gene: gene.to_string(),
            }),
            Some(0) => Err(ExprError::ZeroLengthGene {
                gene: gene.to_string(),
            }),
            Some(&len) => Ok(len as f64 / 1000.0),
        }
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}
