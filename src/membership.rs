use ahash::AHashMap;
use std::path::Path;

use crate::error::{ExprError, Result};
use crate::seqio::open_reader;
use crate::types::CladeCog;

/// (clade, COG) -> member CDS identifiers, in table order.
#[derive(Debug, Default, Clone)]
pub struct CogMembership {
    keys: Vec<CladeCog>,
    members: AHashMap<CladeCog, Vec<String>>,
}

impl CogMembership {
    /// Insert one (clade, COG) row. A repeated key replaces the earlier member list.
    pub fn insert(&mut self, key: CladeCog, cds: Vec<String>) {
        if !self.members.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.members.insert(key, cds);
    }

    /// Parses the membership table:
    /// ```text
    /// Clade,COG,CDS
    /// acI,cogA,"AAA.g1,BBB.g4"
    /// acI,cogB,
    /// ```
    /// An empty CDS cell is a COG with no observed members in that clade.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(open_reader(path)?);

        let mut table = Self::default();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let (clade, cog) = match (record.get(0), record.get(1)) {
                (Some(c), Some(g)) if !c.is_empty() && !g.is_empty() => (c, g),
                _ => {
                    return Err(ExprError::MalformedRecord {
                        path: path.to_path_buf(),
                        line: i + 2,
                        reason: "expected Clade,COG,CDS".to_string(),
                    })
                }
            };
            table.insert(CladeCog::new(clade, cog), split_cds(record.get(2).unwrap_or("")));
        }
        log::debug!("{}: {} (clade, COG) pairs", path.display(), table.len());
        Ok(table)
    }

    pub fn members(&self, key: &CladeCog) -> &[String] {
        self.members.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate `(key, members)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&CladeCog, &[String])> + '_ {
        self.keys.iter().map(|k| (k, self.members[k].as_slice()))
    }

    /// Distinct clades, in order of first appearance.
    pub fn clades(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for k in &self.keys {
            if !seen.contains(&k.clade) {
                seen.push(k.clade.clone());
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn split_cds(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_lists_and_empty_cells() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "Clade,COG,CDS\nacI,cogA,\"AAA.g1,BBB.g4\"\nacI,cogB,\nacII,cogA,CCC.g2\n"
        )
        .unwrap();

        let m = CogMembership::from_path(f.path()).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.members(&CladeCog::new("acI", "cogA")), ["AAA.g1", "BBB.g4"]);
        assert!(m.members(&CladeCog::new("acI", "cogB")).is_empty());
        assert!(m.members(&CladeCog::new("acIII", "cogZ")).is_empty());
        assert_eq!(m.clades(), vec!["acI".to_string(), "acII".to_string()]);
    }

    #[test]
    fn missing_key_fields_are_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "Clade,COG,CDS\n,cogA,AAA.g1\n").unwrap();
        assert!(matches!(
            CogMembership::from_path(f.path()),
            Err(ExprError::MalformedRecord { line: 2, .. })
        ));
    }
}
