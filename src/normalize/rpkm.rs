// src/normalize/rpkm.rs

use ahash::AHashMap;

use crate::counts::{genome_of, MappedReadTotals, ReadCountTable};
use crate::error::Result;
use crate::gene_lengths::GeneLengthIndex;
use crate::membership::CogMembership;
use crate::types::{CladeCog, CogRpkm, GeneRpkm};

/// Where the 'M' of RPKM comes from.
#[derive(Debug, Clone, Copy)]
pub enum Denominator<'a> {
    /// Reads mapped to the genome owning each gene (one sample).
    PerGenome(&'a MappedReadTotals),
    /// A single dataset-wide total.
    Pooled(u64),
}

impl Denominator<'_> {
    /// Mapped reads to divide `gene`'s count by.
    pub fn mapped_reads(&self, gene: &str) -> u64 {
        match self {
            Denominator::PerGenome(totals) => totals.get(genome_of(gene)),
            Denominator::Pooled(total) => *total,
        }
    }
}

/// `count / ((length / 1e3) * (mapped / 1e6))`, or 0 when nothing was mapped.
#[inline]
pub fn rpkm(count: u64, kilobases: f64, mapped_reads: u64) -> f64 {
    if mapped_reads == 0 {
        return 0.0;
    }
    count as f64 / (kilobases * (mapped_reads as f64 / 1_000_000.0))
}

/// Output of one normalization pass.
#[derive(Debug, Default, Clone)]
pub struct RpkmRun {
    /// One entry per membership row, zero RPKM included, in membership order.
    pub cogs: Vec<CogRpkm>,
    /// RPKM of every counted member gene.
    pub genes: AHashMap<String, f64>,
}

impl RpkmRun {
    /// Rows with strictly positive RPKM.
    pub fn expressed(&self) -> impl Iterator<Item = &CogRpkm> + '_ {
        self.cogs.iter().filter(|c| c.rpkm > 0.0)
    }

    /// Per-gene table over the whole count table; genes outside every COG get 0.
    pub fn gene_table(&self, counts: &ReadCountTable) -> Vec<GeneRpkm> {
        counts
            .iter()
            .map(|(gene, count)| GeneRpkm {
                gene: gene.to_string(),
                count,
                rpkm: self.genes.get(gene).copied().unwrap_or(0.0),
            })
            .collect()
    }
}

/// Sum per-gene RPKM into every (clade, COG) of `membership`.
///
/// Members absent from `counts` contribute nothing. Members that were counted
/// must have a positive length in `lengths`.
pub fn normalize_cogs(
    membership: &CogMembership,
    counts: &ReadCountTable,
    lengths: &GeneLengthIndex,
    denominator: Denominator<'_>,
) -> Result<RpkmRun> {
    let mut run = RpkmRun {
        cogs: Vec::with_capacity(membership.len()),
        genes: AHashMap::new(),
    };
    let mut zero_denominator = 0usize;

    for (key, members) in membership.iter() {
        let mut total = 0.0;
        for cds in members {
            let Some(count) = counts.get(cds) else {
                continue;
            };
            let cached = run.genes.get(cds.as_str()).copied();
            let value = match cached {
                Some(v) => v,
                None => {
                    let kb = lengths.kilobases(cds)?;
                    let mapped = denominator.mapped_reads(cds);
                    if mapped == 0 {
                        zero_denominator += 1;
                    }
                    let v = rpkm(count, kb, mapped);
                    run.genes.insert(cds.clone(), v);
                    v
                }
            };
            total += value;
        }
        run.cogs.push(CogRpkm {
            key: key.clone(),
            rpkm: total,
        });
    }

    if zero_denominator > 0 {
        log::debug!("{} counted genes belong to genomes with no mapped reads", zero_denominator);
    }
    Ok(run)
}

/// Mean RPKM per (clade, COG) across samples. A pair missing from a sample
/// counts as 0 for that sample. Keys keep their first-seen order.
pub fn average_samples(samples: &[Vec<CogRpkm>]) -> Vec<CogRpkm> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<CladeCog> = Vec::new();
    let mut sums: AHashMap<CladeCog, f64> = AHashMap::new();
    for sample in samples {
        for row in sample {
            match sums.get_mut(&row.key) {
                Some(s) => *s += row.rpkm,
                None => {
                    order.push(row.key.clone());
                    sums.insert(row.key.clone(), row.rpkm);
                }
            }
        }
    }
    let n = samples.len() as f64;
    order
        .into_iter()
        .map(|key| {
            let rpkm = sums[&key] / n;
            CogRpkm { key, rpkm }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprError;
    use crate::seqio::SeqRecord;

    fn lengths(entries: &[(&str, u64)]) -> GeneLengthIndex {
        GeneLengthIndex::from_records(entries.iter().map(|&(id, length)| SeqRecord {
            id: id.to_string(),
            length,
        }))
        .unwrap()
    }

    fn counts(entries: &[(&str, u64)]) -> ReadCountTable {
        let mut t = ReadCountTable::new();
        for &(g, c) in entries {
            t.add(g, c);
        }
        t
    }

    #[test]
    fn worked_example() {
        // 100 reads, 2 kb, 5M mapped
        assert_eq!(rpkm(100, 2.0, 5_000_000), 10.0);
        assert_eq!(rpkm(100, 2.0, 0), 0.0);
        assert_eq!(rpkm(0, 2.0, 5_000_000), 0.0);
    }

    #[test]
    fn cog_sums_member_genes_with_per_genome_totals() {
        let mut membership = CogMembership::default();
        membership.insert(CladeCog::new("acI", "cogA"), vec!["G1.a".into(), "G2.a".into(), "G1.missing".into()]);
        membership.insert(CladeCog::new("acI", "cogB"), vec!["G3.b".into()]);
        membership.insert(CladeCog::new("acI", "cogC"), vec![]);

        let lens = lengths(&[("G1.a", 2000), ("G2.a", 1000), ("G3.b", 1000)]);
        let cts = counts(&[("G1.a", 100), ("G2.a", 20), ("G3.b", 50)]);
        let totals = MappedReadTotals::from_counts(
            &counts(&[("G1.x", 5_000_000), ("G2.x", 1_000_000)]),
            ["G1", "G2", "G3"],
        );

        let run = normalize_cogs(&membership, &cts, &lens, Denominator::PerGenome(&totals)).unwrap();
        let by_cog: Vec<f64> = run.cogs.iter().map(|c| c.rpkm).collect();
        // 10 + 20; G3 mapped nothing; empty member list
        assert_eq!(by_cog, vec![30.0, 0.0, 0.0]);
        assert_eq!(run.expressed().count(), 1);
        assert_eq!(run.genes["G3.b"], 0.0);
    }

    #[test]
    fn pooled_denominator_applies_to_every_gene() {
        let mut membership = CogMembership::default();
        membership.insert(CladeCog::new("acI", "cogA"), vec!["G1.a".into(), "G2.a".into()]);
        let lens = lengths(&[("G1.a", 1000), ("G2.a", 500)]);
        let cts = counts(&[("G1.a", 4), ("G2.a", 2), ("other", 9)]);

        let run = normalize_cogs(&membership, &cts, &lens, Denominator::Pooled(2_000_000)).unwrap();
        assert_eq!(run.cogs[0].rpkm, 2.0 + 2.0);

        let table = run.gene_table(&cts);
        assert_eq!(table.len(), 3);
        assert_eq!(table[2].gene, "other");
        assert_eq!(table[2].rpkm, 0.0);
    }

    #[test]
    fn counted_gene_without_length_is_fatal() {
        let mut membership = CogMembership::default();
        membership.insert(CladeCog::new("acI", "cogA"), vec!["G9.z".into()]);
        let err = normalize_cogs(
            &membership,
            &counts(&[("G9.z", 1)]),
            &lengths(&[]),
            Denominator::Pooled(0),
        )
        .unwrap_err();
        assert!(matches!(err, ExprError::MissingGeneLength { gene } if gene == "G9.z"));
    }

    #[test]
    fn averaging_fills_missing_samples_with_zero() {
        let a = CladeCog::new("acI", "cogA");
        let b = CladeCog::new("acI", "cogB");
        let s1 = vec![CogRpkm { key: a.clone(), rpkm: 4.0 }, CogRpkm { key: b.clone(), rpkm: 2.0 }];
        let s2 = vec![CogRpkm { key: a.clone(), rpkm: 6.0 }];

        let avg = average_samples(&[s1, s2]);
        assert_eq!(avg, vec![CogRpkm { key: a, rpkm: 5.0 }, CogRpkm { key: b, rpkm: 1.0 }]);
        assert!(average_samples(&[]).is_empty());
    }
}
