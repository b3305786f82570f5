// src/normalize/clade_stats.rs

use ahash::AHashMap;

use crate::types::CogRpkm;

/// Per-(clade, COG) statistics relative to the rest of the clade.
#[derive(Debug, Clone, PartialEq)]
pub struct CogStats {
    pub rpkm: f64,
    pub log2_rpkm: f64,
    pub median: f64,
    pub relative_to_median: f64,
    pub percentile: Option<f64>,
}

/// log2 of `rpkm`, with the -inf of log2(0) replaced by 0.
#[inline]
pub fn log2_rpkm(rpkm: f64) -> f64 {
    let v = rpkm.log2();
    if v == f64::NEG_INFINITY {
        0.0
    } else {
        v
    }
}

/// Strictly positive values in ascending order.
fn sorted_positive(values: &[f64]) -> Vec<f64> {
    let mut pos: Vec<f64> = values.iter().copied().filter(|&v| v > 0.0).collect();
    pos.sort_by(f64::total_cmp);
    pos
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median of the strictly positive values, NaN if there are none.
pub fn positive_median(values: &[f64]) -> f64 {
    median_of_sorted(&sorted_positive(values))
}

/// Percentage of `sorted_positive` strictly below `score`.
/// `sorted_positive` must be ascending and hold only positive values.
pub fn strict_percentile(sorted_positive: &[f64], score: f64) -> f64 {
    if sorted_positive.is_empty() {
        return 0.0;
    }
    let below = sorted_positive.partition_point(|&v| v < score);
    100.0 * below as f64 / sorted_positive.len() as f64
}

/// Statistics for every row of one clade, in input order.
///
/// The median covers only positive-RPKM rows and is shared by all rows; a clade
/// with no expressed COG gets a NaN median and NaN ratios.
pub fn clade_statistics(rows: &[CogRpkm], with_percentile: bool) -> Vec<CogStats> {
    let values: Vec<f64> = rows.iter().map(|r| r.rpkm).collect();
    let positive = sorted_positive(&values);
    let median = median_of_sorted(&positive);

    rows.iter()
        .map(|r| CogStats {
            rpkm: r.rpkm,
            log2_rpkm: log2_rpkm(r.rpkm),
            median,
            relative_to_median: r.rpkm / median,
            percentile: with_percentile.then(|| strict_percentile(&positive, r.rpkm)),
        })
        .collect()
}

/// Split rows by clade, keeping first-seen order of clades and of rows.
pub fn group_by_clade(rows: Vec<CogRpkm>) -> Vec<(String, Vec<CogRpkm>)> {
    let mut groups: Vec<(String, Vec<CogRpkm>)> = Vec::new();
    let mut slot: AHashMap<String, usize> = AHashMap::new();
    for row in rows {
        let i = *slot.entry(row.key.clade.clone()).or_insert_with(|| {
            groups.push((row.key.clade.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[i].1.push(row);
    }
    groups
}
