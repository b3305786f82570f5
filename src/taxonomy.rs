//src/taxonomy.rs

use std::path::Path;

use crate::error::{ExprError, Result};
use crate::seqio::open_reader;

/// Placement of one reference genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeTaxon {
    pub genome: String,
    pub clade: String,
    /// Genome set (concatenated reference) the genome was mapped against.
    pub lineage: String,
}

/// Genome -> (clade, lineage), in file order.
#[derive(Debug, Default, Clone)]
pub struct Taxonomy {
    rows: Vec<GenomeTaxon>,
}

impl Taxonomy {
    pub fn new(rows: Vec<GenomeTaxon>) -> Self {
        Self { rows }
    }

    /// Parses a taxonomy table in the format:
    /// ```text
    /// Genome,Phylum,Class,Order,Lineage,Clade,Tribe
    /// 2236876028,Actinobacteria,...,acI,acI-A,acI-A1
    /// ```
    /// The first column is the genome; `Clade` and `Lineage` are found by header name.
    /// Rows with any empty field are skipped.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(open_reader(path)?);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ExprError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: 1,
                    reason: format!("no '{name}' column"),
                })
        };
        let clade_col = column("Clade")?;
        let lineage_col = column("Lineage")?;

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for record in rdr.records() {
            let record = record?;
            if record.iter().any(str::is_empty) {
                skipped += 1;
                continue;
            }
            rows.push(GenomeTaxon {
                genome: record[0].to_string(),
                clade: record[clade_col].to_string(),
                lineage: record[lineage_col].to_string(),
            });
        }
        if skipped > 0 {
            log::debug!("{}: skipped {} incomplete rows", path.display(), skipped);
        }
        Ok(Self { rows })
    }

    /// Genomes assigned to `clade`, in table order.
    pub fn genomes_in_clade<'a>(&'a self, clade: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.clade == clade)
            .map(|r| r.genome.as_str())
    }

    /// Genomes mapped against the `lineage` genome set, in table order.
    pub fn genomes_in_lineage<'a>(&'a self, lineage: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.lineage == lineage)
            .map(|r| r.genome.as_str())
    }

    pub fn rows(&self) -> &[GenomeTaxon] {
        &self.rows
    }
}
