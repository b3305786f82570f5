//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every fatal condition the normalization pipeline can hit.
///
/// Zero mapped-read denominators, COGs without annotation votes and clades
/// without a defined median are not errors: they are absorbed where they occur.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("error processing table data (CSV)")]
    Csv(#[from] csv::Error),

    #[error("no gene length for '{gene}': reference sequences and count tables disagree")]
    MissingGeneLength { gene: String },

    #[error("gene '{gene}' has length 0")]
    ZeroLengthGene { gene: String },

    #[error("gene '{gene}' appears more than once in the reference sequences")]
    DuplicateGene { gene: String },

    #[error("malformed annotation cell for COG '{cog}', genome '{genome}': {cell:?}")]
    MalformedAnnotationCell {
        cog: String,
        genome: String,
        cell: String,
    },

    #[error("{}:{line}: {reason}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("sample '{sample}' is not a column of the mapped-read table")]
    MissingSample { sample: String },

    #[error("nothing to process: {0}")]
    NoInputs(String),
}

pub type Result<T> = std::result::Result<T, ExprError>;
