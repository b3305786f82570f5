pub mod clade_stats;
pub mod consensus;
pub mod rpkm;

use clade_stats::clade_statistics;
use consensus::majority_label;
use super::annotation::AnnotationTable;
use super::taxonomy::Taxonomy;
use crate::types::{CogRpkm, NormalizedCogRecord};

/// Final table for one clade: statistics for every row, then only the rows
/// that are expressed and carry a majority annotation, sorted by COG.
pub fn build_clade_table(
    clade: &str,
    rows: &[CogRpkm],
    annotations: &AnnotationTable,
    taxonomy: &Taxonomy,
    with_percentile: bool,
) -> Vec<NormalizedCogRecord> {
    let stats = clade_statistics(rows, with_percentile);
    if rows.iter().all(|r| r.rpkm <= 0.0) {
        log::warn!("Clade {clade}: no expressed COGs, median undefined");
    }

    let mut unannotated = 0usize;
    let mut table: Vec<NormalizedCogRecord> = rows
        .iter()
        .zip(stats)
        .filter(|(row, _)| row.rpkm > 0.0)
        .filter_map(|(row, s)| {
            let votes = annotations.vote_set(&row.key.cog, taxonomy.genomes_in_clade(clade));
            let Some(consensus) = majority_label(&votes) else {
                unannotated += 1;
                return None;
            };
            Some(NormalizedCogRecord {
                key: row.key.clone(),
                rpkm: s.rpkm,
                log2_rpkm: s.log2_rpkm,
                median: s.median,
                relative_to_median: s.relative_to_median,
                confidence: consensus.confidence(),
                annotation: consensus.label,
                percentile: s.percentile,
            })
        })
        .collect();

    if unannotated > 0 {
        log::debug!("Clade {clade}: dropped {unannotated} expressed COGs without annotation");
    }
    table.sort_by(|a, b| a.key.cog.cmp(&b.key.cog));
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::GenomeTaxon;
    use crate::types::CladeCog;

    fn taxonomy() -> Taxonomy {
        let row = |genome: &str, clade: &str| GenomeTaxon {
            genome: genome.into(),
            clade: clade.into(),
            lineage: "acI".into(),
        };
        Taxonomy::new(vec![row("G1", "acI"), row("G2", "acI"), row("G3", "acI"), row("H1", "acII")])
    }

    fn annotations() -> AnnotationTable {
        let mut t = AnnotationTable::default();
        t.insert("K00001", "G1", vec!["kinase".into()]);
        t.insert("K00001", "G2", vec!["kinase".into(), "transferase".into()]);
        t.insert("K00001", "G3", vec!["kinase".into()]);
        t.insert("K00002", "G2", vec!["permease".into()]);
        // only a genome of another clade annotates K00003
        t.insert("K00003", "H1", vec!["oxidase".into()]);
        t
    }

    fn row(cog: &str, rpkm: f64) -> CogRpkm {
        CogRpkm { key: CladeCog::new("acI", cog), rpkm }
    }

    #[test]
    fn expressed_annotated_rows_only() {
        let rows = vec![
            row("K00002", 30.0),
            row("K00001", 10.0),
            row("K00003", 50.0),
            row("K00004", 0.0),
        ];
        let table = build_clade_table("acI", &rows, &annotations(), &taxonomy(), false);

        assert_eq!(table.len(), 2);
        assert_eq!(table[0].key.cog, "K00001");
        assert_eq!(table[0].annotation, "kinase");
        assert_eq!(table[0].confidence, 0.75);
        // median over 10, 30, 50 regardless of which rows are later dropped
        assert_eq!(table[0].median, 30.0);
        assert_eq!(table[1].key.cog, "K00002");
        assert_eq!(table[1].relative_to_median, 1.0);
        assert_eq!(table[1].confidence, 1.0);
        assert!(table.iter().all(|r| r.percentile.is_none()));
    }

    #[test]
    fn removing_sole_annotating_genome_drops_row() {
        let rows = vec![row("K00002", 30.0)];
        let tax = Taxonomy::new(
            taxonomy()
                .rows()
                .iter()
                .filter(|t| t.genome != "G2")
                .cloned()
                .collect(),
        );
        assert!(build_clade_table("acI", &rows, &annotations(), &tax, false).is_empty());
    }
}
