//src/types.rs

/// Composite key for one (clade, COG) pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CladeCog {
    pub clade: String,
    pub cog: String,
}

impl CladeCog {
    pub fn new(clade: impl Into<String>, cog: impl Into<String>) -> Self {
        Self {
            clade: clade.into(),
            cog: cog.into(),
        }
    }
}

/// Summed RPKM for one (clade, COG) in a single sample (or in the pooled run).
#[derive(Debug, Clone, PartialEq)]
pub struct CogRpkm {
    pub key: CladeCog,
    pub rpkm: f64,
}

/// RPKM of a single counted gene, kept for the per-gene table.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRpkm {
    pub gene: String,
    pub count: u64,
    pub rpkm: f64,
}

/// A single row in the final per-clade table.
///   Clade  COG  RPKM  Log2 RPKM  Median  Rel to Med  Annotation  Confidence  [Percentile]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCogRecord {
    pub key: CladeCog,
    pub rpkm: f64,
    pub log2_rpkm: f64,
    /// Median over the clade's positive-RPKM COGs; NaN when the clade has none.
    pub median: f64,
    pub relative_to_median: f64,
    pub annotation: String,
    /// Fraction of pooled labels agreeing with `annotation`, in [0, 1].
    pub confidence: f64,
    pub percentile: Option<f64>,
}
