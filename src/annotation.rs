use ahash::AHashMap;
use std::path::Path;

use crate::error::{ExprError, Result};
use crate::seqio::open_reader;

/// Split one persisted annotation cell into its labels.
///
/// Accepted forms:
/// ```text
/// ['kinase', 'transferase']
/// ["5'-nucleotidase", "kinase"]
/// ['[4Fe-4S] ferredoxin', 'kinase']
/// ferredoxin [2Fe-2S]
/// []
/// ```
/// Only the enclosing list brackets are removed; brackets inside a label are
/// kept as part of it. Elements are separated by `', '` or `", "`, and every
/// quote character is removed from each element. A list mixing quote styles
/// between neighbours (`["5'-nucleotidase", 'kinase']`) has no such separator
/// and comes back as a single label.
///
/// Returns `None` when the cell is not well formed: unbalanced brackets, or an
/// element that is empty once quotes are removed.
pub fn parse_annotation_cell(cell: &str) -> Option<Vec<String>> {
    let cell = cell.trim();
    let inner = match enclosing_list(cell)? {
        Some(inner) => inner,
        None => cell,
    };
    if inner.trim().is_empty() {
        // "[]" carries no labels; a bare empty cell never reaches here
        return Some(Vec::new());
    }

    let normalized = inner.replace("\", \"", "', '");
    let mut labels = Vec::new();
    for piece in normalized.split("', '") {
        let label: String = piece.chars().filter(|&c| c != '\'' && c != '"').collect();
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        labels.push(label.to_string());
    }
    Some(labels)
}

/// `None` if the brackets of `cell` do not balance, otherwise the list body
/// when the first '[' closes on the last character.
fn enclosing_list(cell: &str) -> Option<Option<&str>> {
    let mut depth = 0usize;
    let mut outer_closes_at = None;
    for (i, c) in cell.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 && outer_closes_at.is_none() {
                    outer_closes_at = Some(i);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    let is_list = cell.starts_with('[') && outer_closes_at == Some(cell.len() - 1);
    Some(is_list.then(|| &cell[1..cell.len() - 1]))
}

/// The pooled labels for one (clade, COG): every label from every contributing
/// genome, in genome order then cell order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnnotationVoteSet {
    pub labels: Vec<String>,
}

impl AnnotationVoteSet {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// COG x genome annotation cells, parsed once at load.
#[derive(Debug, Default, Clone)]
pub struct AnnotationTable {
    cogs: Vec<String>,
    cells: AHashMap<String, AHashMap<String, Vec<String>>>,
}

impl AnnotationTable {
    /// Record the parsed labels of one (COG, genome) cell.
    pub fn insert(&mut self, cog: &str, genome: &str, labels: Vec<String>) {
        if !self.cells.contains_key(cog) {
            self.cogs.push(cog.to_string());
        }
        self.cells
            .entry(cog.to_string())
            .or_default()
            .insert(genome.to_string(), labels);
    }

    /// Parses an annotation table: COG in the first column, one column per genome.
    /// ```text
    /// COG,G1,G2
    /// cogA,['kinase'],"['kinase', 'transferase']"
    /// cogB,,['permease']
    /// ```
    /// Empty cells are absent annotations. A cell that does not parse is fatal.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(open_reader(path)?);

        let genomes: Vec<String> = rdr.headers()?.iter().skip(1).map(|h| h.trim().to_string()).collect();

        let mut table = Self::default();
        for record in rdr.records() {
            let record = record?;
            let cog = record.get(0).unwrap_or_default().trim();
            if cog.is_empty() {
                continue;
            }
            for (genome, cell) in genomes.iter().zip(record.iter().skip(1)) {
                if cell.trim().is_empty() {
                    continue;
                }
                let labels = parse_annotation_cell(cell).ok_or_else(|| {
                    ExprError::MalformedAnnotationCell {
                        cog: cog.to_string(),
                        genome: genome.clone(),
                        cell: cell.to_string(),
                    }
                })?;
                table.insert(cog, genome, labels);
            }
        }
        log::debug!("{}: annotations for {} COGs", path.display(), table.cogs.len());
        Ok(table)
    }

    pub fn labels(&self, cog: &str, genome: &str) -> Option<&[String]> {
        self.cells
            .get(cog)
            .and_then(|by_genome| by_genome.get(genome))
            .map(Vec::as_slice)
    }

    /// Pool the labels that `genomes` carry for `cog`.
    pub fn vote_set<'a, I>(&self, cog: &str, genomes: I) -> AnnotationVoteSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut votes = AnnotationVoteSet::default();
        for genome in genomes {
            if let Some(labels) = self.labels(cog, genome) {
                votes.labels.extend(labels.iter().cloned());
            }
        }
        votes
    }

    pub fn cogs(&self) -> &[String] {
        &self.cogs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels(cell: &str) -> Option<Vec<String>> {
        parse_annotation_cell(cell)
    }

    #[test]
    fn single_and_double_quoted_lists() {
        assert_eq!(labels("['kinase']").unwrap(), ["kinase"]);
        assert_eq!(
            labels("['kinase', 'transferase']").unwrap(),
            ["kinase", "transferase"]
        );
        assert_eq!(
            labels("[\"5'-nucleotidase\", \"kinase, putative\"]").unwrap(),
            ["5-nucleotidase", "kinase, putative"]
        );
        assert_eq!(labels("  sugar permease ").unwrap(), ["sugar permease"]);
        assert!(labels("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_cells() {
        assert!(labels("['kinase'").is_none());
        assert!(labels("'kinase']").is_none());
        assert!(labels("['kinase']]").is_none());
        assert!(labels("ferredoxin ]2Fe-2S[").is_none());
        assert!(labels("['kinase', '']").is_none());
    }

    #[test]
    fn brackets_inside_labels_are_kept() {
        assert_eq!(
            labels("['[4Fe-4S] ferredoxin', 'kinase']").unwrap(),
            ["[4Fe-4S] ferredoxin", "kinase"]
        );
        assert_eq!(
            labels("['[Acyl-carrier-protein] S-malonyltransferase']").unwrap(),
            ["[Acyl-carrier-protein] S-malonyltransferase"]
        );
        assert_eq!(labels("ferredoxin [2Fe-2S]").unwrap(), ["ferredoxin [2Fe-2S]"]);
        assert_eq!(labels("[2Fe-2S] ferredoxin").unwrap(), ["[2Fe-2S] ferredoxin"]);
        assert_eq!(labels("[['kinase']]").unwrap(), ["[kinase]"]);
    }

    #[test]
    fn mixed_quote_styles_stay_one_label() {
        assert_eq!(
            labels("[\"5'-nucleotidase\", 'kinase']").unwrap(),
            ["5-nucleotidase, kinase"]
        );
    }

    #[test]
    fn table_pools_votes_in_genome_order() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "COG,G1,G2,G3,G4\nK00001,['kinase'],\"['kinase', 'transferase']\",['kinase'],\nK00002,,,,['permease']\n"
        )
        .unwrap();

        let table = AnnotationTable::from_path(f.path()).unwrap();
        assert_eq!(table.cogs(), ["K00001", "K00002"]);

        let votes = table.vote_set("K00001", ["G1", "G2", "G3", "G4"]);
        assert_eq!(votes.labels, ["kinase", "kinase", "transferase", "kinase"]);

        assert!(table.vote_set("K00002", ["G1", "G2"]).is_empty());
        assert!(table.vote_set("K99999", ["G1"]).is_empty());
    }

    #[test]
    fn bracketed_labels_load_from_table() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "COG,G1,G2\nK1,\"['ferredoxin [2Fe-2S]']\",\"['ferredoxin [2Fe-2S]', 'kinase']\"\n"
        )
        .unwrap();

        let table = AnnotationTable::from_path(f.path()).unwrap();
        assert_eq!(table.labels("K1", "G1").unwrap(), ["ferredoxin [2Fe-2S]"]);
        let votes = table.vote_set("K1", ["G1", "G2"]);
        assert_eq!(votes.labels, ["ferredoxin [2Fe-2S]", "ferredoxin [2Fe-2S]", "kinase"]);
    }

    #[test]
    fn malformed_cell_in_table_is_fatal() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "COG,G1\nK1,['kinase'\n").unwrap();
        let err = AnnotationTable::from_path(f.path()).unwrap_err();
        assert!(matches!(
            err,
            ExprError::MalformedAnnotationCell { cog, genome, .. } if cog == "K1" && genome == "G1"
        ));
    }
}
