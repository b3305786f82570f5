use std::fmt;
use std::path::{Path, PathBuf};

/// How the 'M' of RPKM is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Per-genome totals summed from each sample's htseq counts; RPKM averaged over samples.
    Averaged,
    /// One filtered count table and a single dataset-wide total.
    #[default]
    Pooled,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Averaged => write!(f, "averaged"),
            Variant::Pooled => write!(f, "pooled"),
        }
    }
}

/// Input/output layout of one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `<genome>.ffn` gene sequences, one file per genome.
    pub ffn_dir: PathBuf,
    /// `<lineage>.fna` concatenated genome sets reads were mapped against.
    pub concat_dir: PathBuf,
    /// `<sample>.fastq` metatranscriptomes; only their names are used.
    pub sample_dir: PathBuf,
    /// htseq count tables and the filtered pooled counts.
    pub count_dir: PathBuf,
    /// Mapped-read totals tables.
    pub map_dir: PathBuf,
    pub taxonomy: PathBuf,
    pub membership: PathBuf,
    pub annotations: PathBuf,
    pub output_dir: PathBuf,
    pub variant: Variant,
    /// Append the strict percentile rank of each COG within its clade.
    pub percentile: bool,
    /// Worker threads; 0 leaves rayon's default.
    pub threads: usize,
}

impl PipelineConfig {
    /// The standard project layout below `root`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let map_dir = root.join("data/mapping");
        Self {
            ffn_dir: root.join("data/refGenomes/ffn"),
            concat_dir: root.join("data/refGenomes/concat"),
            sample_dir: root.join("data/sequences"),
            count_dir: map_dir.join("htseq"),
            membership: map_dir.join("cladesCogsToCDS.csv"),
            map_dir,
            taxonomy: root.join("data/externalData/taxonomy.csv"),
            annotations: root.join("data/orthoMCL/annotTable.csv"),
            output_dir: root.join("results/expression"),
            variant: Variant::default(),
            percentile: false,
            threads: 0,
        }
    }

    /// `<count_dir>/<sample>-<lineage>.CDS.out`
    pub fn sample_counts(&self, sample: &str, lineage: &str) -> PathBuf {
        self.count_dir.join(format!("{sample}-{lineage}.CDS.out"))
    }

    /// `<count_dir>/<name>.COG.norm`
    pub fn cog_norm(&self, name: &str) -> PathBuf {
        self.count_dir.join(format!("{name}.COG.norm"))
    }

    pub fn pooled_counts(&self) -> PathBuf {
        self.count_dir.join("filteredReadCounts.csv")
    }

    pub fn pooled_gene_rpkm(&self) -> PathBuf {
        self.count_dir.join("filteredRPKMCounts.csv")
    }

    pub fn pooled_mapped_reads(&self) -> PathBuf {
        self.map_dir.join("concatMappedReads.csv")
    }

    pub fn genome_mapped_reads(&self) -> PathBuf {
        self.map_dir.join("genomeMappedReads.csv")
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_root(".")
    }
}
