use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::counts::MappedReadTotals;
use crate::error::Result;
use crate::types::{CogRpkm, GeneRpkm, NormalizedCogRecord};

pub const CLADE_TABLE_HEADER: [&str; 8] = [
    "Clade",
    "COG",
    "RPKM",
    "Log2 RPKM",
    "Median",
    "Rel to Med",
    "Annotation",
    "Confidence",
];

/// Write one clade's table as CSV:
/// ```text
/// Clade,COG,RPKM,Log2 RPKM,Median,Rel to Med,Annotation,Confidence[,Percentile]
/// ```
pub fn write_clade_records<W: Write>(
    out: W,
    records: &[NormalizedCogRecord],
    with_percentile: bool,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = CLADE_TABLE_HEADER.to_vec();
    if with_percentile {
        header.push("Percentile");
    }
    wtr.write_record(&header)?;

    for r in records {
        let mut fields = vec![
            r.key.clade.clone(),
            r.key.cog.clone(),
            r.rpkm.to_string(),
            r.log2_rpkm.to_string(),
            r.median.to_string(),
            r.relative_to_median.to_string(),
            r.annotation.clone(),
            r.confidence.to_string(),
        ];
        if with_percentile {
            fields.push(r.percentile.unwrap_or(0.0).to_string());
        }
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Generate the clade table text on demand.
pub fn clade_table_text(records: &[NormalizedCogRecord], with_percentile: bool) -> Result<String> {
    let mut buf = Vec::new();
    write_clade_records(&mut buf, records, with_percentile)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write `<dir>/<clade>.norm`, creating `dir` if needed.
pub fn write_clade_table(
    dir: &Path,
    clade: &str,
    records: &[NormalizedCogRecord],
    with_percentile: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{clade}.norm"));
    write_clade_records(File::create(&path)?, records, with_percentile)?;
    log::info!("Wrote {} COGs to {}", records.len(), path.display());
    Ok(path)
}

/// Per-(clade, COG) RPKM of one sample: `Clade,COG,RPKM`.
pub fn write_cog_rpkm<'a, I>(path: &Path, rows: I) -> Result<()>
where
    I: IntoIterator<Item = &'a CogRpkm>,
{
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Clade", "COG", "RPKM"])?;
    for row in rows {
        wtr.write_record([row.key.clade.as_str(), row.key.cog.as_str(), row.rpkm.to_string().as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Per-gene table: `Gene,Count,RPKM`.
pub fn write_gene_rpkm(path: &Path, genes: &[GeneRpkm]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Gene", "Count", "RPKM"])?;
    for g in genes {
        wtr.write_record([g.gene.as_str(), g.count.to_string().as_str(), g.rpkm.to_string().as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Genome x sample table of mapped-read totals, readable by
/// [`MappedReadTotals::from_table`].
pub fn write_mapped_read_totals(
    path: &Path,
    genomes: &[String],
    samples: &[String],
    totals: &[MappedReadTotals],
) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec![String::new()];
    header.extend(samples.iter().cloned());
    wtr.write_record(&header)?;

    for genome in genomes {
        let mut row = vec![genome.clone()];
        row.extend(totals.iter().map(|t| t.get(genome).to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
