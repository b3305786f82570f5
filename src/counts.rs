use ahash::AHashMap;
use std::io::BufRead;
use std::path::Path;

use crate::error::{ExprError, Result};
use crate::seqio::open_reader;

/// Genome a CDS belongs to: the identifier text before the first '.'.
pub fn genome_of(cds: &str) -> &str {
    cds.split('.').next().unwrap_or(cds)
}

/// Gene identifier -> raw mapped-read count, in file order.
#[derive(Debug, Default, Clone)]
pub struct ReadCountTable {
    genes: Vec<String>,
    counts: AHashMap<String, u64>,
}

impl ReadCountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` reads for `gene`. Repeated genes accumulate.
    pub fn add(&mut self, gene: &str, count: u64) {
        match self.counts.get_mut(gene) {
            Some(c) => *c += count,
            None => {
                self.genes.push(gene.to_string());
                self.counts.insert(gene.to_string(), count);
            }
        }
    }

    /// Reads a headerless two-column count table:
    /// ```text
    /// <gene>\t<count>      (htseq-count output)
    /// <gene>,<count>       (filtered read counts)
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_reader(path)?;
        Self::parse(reader, path)
    }

    pub(crate) fn parse<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut table = Self::new();
        for (i, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let delim = if line.contains('\t') { '\t' } else { ',' };
            let fields: Vec<&str> = line.split(delim).collect();
            if fields.len() < 2 {
                return Err(malformed(path, i, "expected <gene> and <count>"));
            }
            let gene = fields[0].trim();
            let count: u64 = fields[1]
                .trim()
                .parse()
                .map_err(|_| malformed(path, i, &format!("bad read count '{}'", fields[1].trim())))?;
            table.add(gene, count);
        }
        Ok(table)
    }

    /// Fold another table into this one (e.g. several genome sets of one sample).
    pub fn merge(&mut self, other: &ReadCountTable) {
        for (gene, count) in other.iter() {
            self.add(gene, count);
        }
    }

    pub fn get(&self, gene: &str) -> Option<u64> {
        self.counts.get(gene).copied()
    }

    /// Iterate `(gene, count)` in the order genes were first seen.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.genes.iter().map(|g| (g.as_str(), self.counts[g]))
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// Reads mapped to each genome, the per-genome 'M' of RPKM.
#[derive(Debug, Default, Clone)]
pub struct MappedReadTotals {
    per_genome: AHashMap<String, u64>,
}

impl MappedReadTotals {
    /// Sum the counts of every CDS belonging to each of `genomes`.
    /// Genomes without any counted CDS get a total of 0.
    pub fn from_counts<I, S>(counts: &ReadCountTable, genomes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut per_genome: AHashMap<String, u64> = genomes
            .into_iter()
            .map(|g| (g.as_ref().to_string(), 0))
            .collect();
        for (gene, count) in counts.iter() {
            if let Some(total) = per_genome.get_mut(genome_of(gene)) {
                *total += count;
            }
        }
        Self { per_genome }
    }

    /// Load one sample's column from a precomputed genome x sample table:
    /// ```text
    /// ,sampleA,sampleB
    /// genome1,1200.0,0.0
    /// ```
    pub fn from_table<P: AsRef<Path>>(path: P, sample: &str) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(open_reader(path)?);

        let col = rdr
            .headers()?
            .iter()
            .skip(1)
            .position(|h| h == sample)
            .map(|p| p + 1)
            .ok_or_else(|| ExprError::MissingSample {
                sample: sample.to_string(),
            })?;

        let mut per_genome = AHashMap::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let genome = record.get(0).unwrap_or_default();
            let raw = record.get(col).unwrap_or_default();
            let value = parse_read_total(raw).ok_or_else(|| {
                malformed(path, i + 1, &format!("bad mapped-read total '{raw}'"))
            })?;
            per_genome.insert(genome.to_string(), value);
        }
        Ok(Self { per_genome })
    }

    /// Total for `genome`; unknown genomes mapped no reads.
    pub fn get(&self, genome: &str) -> u64 {
        self.per_genome.get(genome).copied().unwrap_or(0)
    }

    /// Fold in the totals of genomes mapped against another genome set.
    pub fn merge(&mut self, other: MappedReadTotals) {
        for (genome, count) in other.per_genome {
            *self.per_genome.entry(genome).or_insert(0) += count;
        }
    }
}

/// Dataset-wide 'M' for the pooled variant: the sum of the numeric cells of
/// the first data row of a table with a header row and an index column:
/// ```text
/// ,acI,acII
/// mapped,4000000,1000000
/// ```
/// Rows after the first are ignored.
pub fn pooled_total_from_table<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(open_reader(path)?);

    let mut records = rdr.records();
    let Some(first) = records.next() else {
        return Err(malformed(path, 0, "no data row after the header"));
    };
    let first = first?;

    let mut total = 0u64;
    for raw in first.iter().skip(1) {
        if raw.is_empty() {
            continue;
        }
        total += parse_read_total(raw)
            .ok_or_else(|| malformed(path, 1, &format!("bad mapped-read total '{raw}'")))?;
    }

    let extra = records.count();
    if extra > 0 {
        log::warn!("{}: using the first row only, {} more ignored", path.display(), extra);
    }
    Ok(total)
}

/// Totals may be written as floats ("1200.0"); they must still be whole and non-negative.
fn parse_read_total(raw: &str) -> Option<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    let v: f64 = raw.parse().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
        Some(v as u64)
    } else {
        None
    }
}

fn malformed(path: &Path, line: usize, reason: &str) -> ExprError {
    ExprError::MalformedRecord {
        path: path.to_path_buf(),
        line: line + 1,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_tab_and_comma_tables() {
        let htseq = "AAA.g1\t10\nAAA.g2\t0\n__no_feature\t55\n";
        let t = ReadCountTable::parse(htseq.as_bytes(), Path::new("x.CDS.out")).unwrap();
        assert_eq!(t.get("AAA.g1"), Some(10));
        assert_eq!(t.get("__no_feature"), Some(55));

        let csv = "BBB.g1,3\n\nBBB.g2,4\n";
        let t = ReadCountTable::parse(csv.as_bytes(), Path::new("x.csv")).unwrap();
        assert_eq!(t.iter().collect::<Vec<_>>(), vec![("BBB.g1", 3), ("BBB.g2", 4)]);
    }

    #[test]
    fn bad_count_reports_line() {
        let err = ReadCountTable::parse("A.1\t4\nA.2\tmany\n".as_bytes(), Path::new("c.out"))
            .unwrap_err();
        assert!(matches!(err, ExprError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn totals_sum_genes_of_each_genome() {
        let mut t = ReadCountTable::new();
        t.add("AAA.g1", 10);
        t.add("AAA.g2", 5);
        t.add("BBB.g1", 7);
        t.add("__ambiguous", 100);
        let totals = MappedReadTotals::from_counts(&t, ["AAA", "BBB", "CCC"]);
        assert_eq!(totals.get("AAA"), 15);
        assert_eq!(totals.get("BBB"), 7);
        assert_eq!(totals.get("CCC"), 0);
        assert_eq!(totals.get("never_seen"), 0);
    }

    #[test]
    fn totals_from_precomputed_table() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, ",s1,s2\nAAA,1200.0,3\nBBB,0.0,8").unwrap();

        let s2 = MappedReadTotals::from_table(f.path(), "s2").unwrap();
        assert_eq!(s2.get("AAA"), 3);
        assert_eq!(s2.get("BBB"), 8);
        let s1 = MappedReadTotals::from_table(f.path(), "s1").unwrap();
        assert_eq!(s1.get("AAA"), 1200);

        assert!(matches!(
            MappedReadTotals::from_table(f.path(), "s3"),
            Err(ExprError::MissingSample { .. })
        ));
    }

    #[test]
    fn pooled_total_sums_first_row_only() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, ",acI,acII\nmapped,4000000,1000000\nunmapped,7,7").unwrap();
        assert_eq!(pooled_total_from_table(f.path()).unwrap(), 5_000_000);

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        writeln!(empty, ",acI").unwrap();
        assert!(matches!(
            pooled_total_from_table(empty.path()),
            Err(ExprError::MalformedRecord { line: 1, .. })
        ));
    }

    #[test]
    fn totals_merge_across_genome_sets() {
        let mut t1 = ReadCountTable::new();
        t1.add("AAA.g1", 4);
        let mut t2 = ReadCountTable::new();
        t2.add("BBB.g1", 6);
        t2.add("AAA.g9", 100);

        let mut totals = MappedReadTotals::from_counts(&t1, ["AAA"]);
        totals.merge(MappedReadTotals::from_counts(&t2, ["BBB"]));
        assert_eq!(totals.get("AAA"), 4);
        assert_eq!(totals.get("BBB"), 6);
    }

    #[test]
    fn genome_prefix() {
        assert_eq!(genome_of("2236876028.peg.3"), "2236876028");
        assert_eq!(genome_of("nodots"), "nodots");
    }
}
