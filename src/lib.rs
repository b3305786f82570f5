// src/lib.rs
pub mod types;
pub mod error;
pub mod config;
pub mod seqio;
pub mod gene_lengths;
pub mod counts;
pub mod membership;
pub mod taxonomy;
pub mod annotation;
pub mod normalize;
pub mod report;

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::AnnotationTable;
use crate::config::{PipelineConfig, Variant};
use crate::counts::{pooled_total_from_table, MappedReadTotals, ReadCountTable};
use crate::error::{ExprError, Result};
use crate::gene_lengths::GeneLengthIndex;
use crate::membership::CogMembership;
use crate::normalize::build_clade_table;
use crate::normalize::clade_stats::group_by_clade;
use crate::normalize::rpkm::{average_samples, normalize_cogs, Denominator};
use crate::report::{clade_table_text, write_clade_table, write_cog_rpkm, write_gene_rpkm, write_mapped_read_totals};
use crate::taxonomy::Taxonomy;
use crate::types::{CogRpkm, NormalizedCogRecord};

/// One clade's final table and where it was written.
#[derive(Debug, Clone)]
pub struct CladeTable {
    pub clade: String,
    pub records: Vec<NormalizedCogRecord>,
    pub path: PathBuf,
}

/// Everything a run produced, kept structured; text is generated on demand.
#[derive(Debug, Clone)]
pub struct ExpressionResults {
    pub variant: Variant,
    pub samples: Vec<String>,
    pub genomes: Vec<String>,
    /// RPKM per (clade, COG) after averaging or pooling, zero rows included.
    pub cog_rpkm: Vec<CogRpkm>,
    pub clade_tables: Vec<CladeTable>,
    pub percentile: bool,
}

impl ExpressionResults {
    /// Generate the CSV text of one clade's table on demand.
    pub fn get_clade_table(&self, clade: &str) -> Option<Result<String>> {
        self.clade_tables
            .iter()
            .find(|t| t.clade == clade)
            .map(|t| clade_table_text(&t.records, self.percentile))
    }

    /// Rows written across all clades.
    pub fn total_rows(&self) -> usize {
        self.clade_tables.iter().map(|t| t.records.len()).sum()
    }
}

/// Names of files in `dir` ending in `.ext` (or `.ext.gz`), extension stripped, sorted.
pub fn list_stems(dir: &Path, ext: &str) -> Result<Vec<(String, PathBuf)>> {
    let plain = format!(".{ext}");
    let gz = format!(".{ext}.gz");
    let mut found: Vec<(String, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_str()?.to_string();
            let stem = name
                .strip_suffix(&gz)
                .or_else(|| name.strip_suffix(&plain))?
                .to_string();
            Some((stem, path))
        })
        .collect();
    found.sort();
    Ok(found)
}

/// Run the whole normalization: RPKM per (clade, COG), clade statistics,
/// majority annotations, and one `<clade>.norm` table per clade.
pub fn run_pipeline(cfg: &PipelineConfig) -> Result<ExpressionResults> {
    // 1. Reference genomes and gene lengths
    let ffn = list_stems(&cfg.ffn_dir, "ffn")?;
    if ffn.is_empty() {
        return Err(ExprError::NoInputs(format!(
            "no .ffn files in {}",
            cfg.ffn_dir.display()
        )));
    }
    let genomes: Vec<String> = ffn.iter().map(|(g, _)| g.clone()).collect();
    let paths: Vec<&PathBuf> = ffn.iter().map(|(_, p)| p).collect();
    let lengths = GeneLengthIndex::from_fasta_files(&paths)?;

    // 2. Tables shared by every stage
    let taxonomy = Taxonomy::from_path(&cfg.taxonomy)?;
    let membership = CogMembership::from_path(&cfg.membership)?;
    let annotations = AnnotationTable::from_path(&cfg.annotations)?;
    log::info!(
        "{} genomes, {} (clade, COG) pairs, {} annotated COGs",
        genomes.len(),
        membership.len(),
        annotations.cogs().len()
    );

    // 3. RPKM per (clade, COG)
    let (samples, cog_rpkm) = match cfg.variant {
        Variant::Averaged => averaged_rpkm(cfg, &genomes, &taxonomy, &membership, &lengths)?,
        Variant::Pooled => (Vec::new(), pooled_rpkm(cfg, &membership, &lengths)?),
    };

    // 4. Statistics, annotation and output, one clade at a time
    fs::create_dir_all(&cfg.output_dir)?;
    let clade_tables = group_by_clade(cog_rpkm.clone())
        .par_iter()
        .map(|(clade, rows)| -> Result<CladeTable> {
            let records = build_clade_table(clade, rows, &annotations, &taxonomy, cfg.percentile);
            let path = write_clade_table(&cfg.output_dir, clade, &records, cfg.percentile)?;
            Ok(CladeTable {
                clade: clade.clone(),
                records,
                path,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExpressionResults {
        variant: cfg.variant,
        samples,
        genomes,
        cog_rpkm,
        clade_tables,
        percentile: cfg.percentile,
    })
}

/// Per-sample RPKM with per-genome totals, averaged over samples.
fn averaged_rpkm(
    cfg: &PipelineConfig,
    genomes: &[String],
    taxonomy: &Taxonomy,
    membership: &CogMembership,
    lengths: &GeneLengthIndex,
) -> Result<(Vec<String>, Vec<CogRpkm>)> {
    let samples: Vec<String> = list_stems(&cfg.sample_dir, "fastq")?
        .into_iter()
        .map(|(s, _)| s)
        .collect();
    let lineages: Vec<String> = list_stems(&cfg.concat_dir, "fna")?
        .into_iter()
        .map(|(l, _)| l)
        .collect();
    if samples.is_empty() || lineages.is_empty() {
        return Err(ExprError::NoInputs(format!(
            "{} samples and {} genome sets found",
            samples.len(),
            lineages.len()
        )));
    }
    log::info!("Averaging {} samples over {} genome sets", samples.len(), lineages.len());

    let per_sample = samples
        .par_iter()
        .map(|sample| -> Result<(MappedReadTotals, Vec<CogRpkm>)> {
            let mut counts = ReadCountTable::new();
            let mut totals = MappedReadTotals::default();
            for lineage in &lineages {
                let lineage_counts = ReadCountTable::from_path(cfg.sample_counts(sample, lineage))?;
                // a genome's M covers only reads mapped against its own genome set
                totals.merge(MappedReadTotals::from_counts(
                    &lineage_counts,
                    taxonomy.genomes_in_lineage(lineage),
                ));
                counts.merge(&lineage_counts);
            }
            let run = normalize_cogs(membership, &counts, lengths, Denominator::PerGenome(&totals))?;
            write_cog_rpkm(&cfg.cog_norm(sample), run.expressed())?;
            log::debug!("Sample {sample}: {} expressed (clade, COG) pairs", run.expressed().count());
            Ok((totals, run.cogs))
        })
        .collect::<Result<Vec<_>>>()?;

    let (totals, runs): (Vec<MappedReadTotals>, Vec<Vec<CogRpkm>>) = per_sample.into_iter().unzip();
    write_mapped_read_totals(&cfg.genome_mapped_reads(), genomes, &samples, &totals)?;

    Ok((samples, average_samples(&runs)))
}

/// RPKM from one filtered count table and one dataset-wide total.
fn pooled_rpkm(
    cfg: &PipelineConfig,
    membership: &CogMembership,
    lengths: &GeneLengthIndex,
) -> Result<Vec<CogRpkm>> {
    let counts = ReadCountTable::from_path(cfg.pooled_counts())?;
    let total = pooled_total_from_table(cfg.pooled_mapped_reads())?;
    if total == 0 {
        log::warn!("Pooled mapped-read total is 0; every RPKM will be 0");
    }
    log::info!("{} counted genes, {} mapped reads", counts.len(), total);

    let run = normalize_cogs(membership, &counts, lengths, Denominator::Pooled(total))?;
    write_gene_rpkm(&cfg.pooled_gene_rpkm(), &run.gene_table(&counts))?;
    write_cog_rpkm(&cfg.cog_norm("pooled"), &run.cogs)?;
    Ok(run.cogs)
}
