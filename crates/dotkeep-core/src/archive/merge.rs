//! Name-indexed record groups for partial archive updates.

use super::ArchiveWriter;
use super::Record;
use super::RecordSink;
use crate::error::Result;
use std::collections::HashMap;

/// Ordered mapping from top-level entry name to its records.
///
/// Records carried over from an old archive are grouped by name through
/// [`RecordSink`]; freshly generated groups then [`replace`](Self::replace)
/// whatever was carried. Each name maps to exactly one group, so a refreshed
/// entry can never appear twice in the rebuilt archive.
#[derive(Debug, Default)]
pub struct MergeSet {
    groups: Vec<(String, Vec<Record>)>,
    index: HashMap<String, usize>,
}

impl MergeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns whether the set holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns whether a group named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Group names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    /// Installs `records` as the group for `name`, dropping any previous
    /// group of that name.
    pub fn replace(&mut self, name: &str, records: Vec<Record>) {
        if let Some(&slot) = self.index.get(name) {
            self.groups[slot].1 = records;
        } else {
            self.index.insert(name.to_string(), self.groups.len());
            self.groups.push((name.to_string(), records));
        }
    }

    /// Serializes the groups into `writer`: first the names in `order`, then
    /// every remaining group in insertion order. Returns the number of
    /// records written.
    pub fn write_to<S: AsRef<str>>(self, writer: &mut ArchiveWriter, order: &[S]) -> Result<usize> {
        let mut slots: Vec<Option<Vec<Record>>> =
            self.groups.into_iter().map(|(_, records)| Some(records)).collect();
        let mut written = 0;

        let ordered = order.iter().filter_map(|name| self.index.get(name.as_ref()).copied());
        let positions: Vec<usize> = ordered.chain(0..slots.len()).collect();

        for slot in positions {
            let Some(records) = slots[slot].take() else {
                continue;
            };
            for record in records {
                writer.add_payload(&record.path, &record.payload)?;
                written += 1;
            }
        }

        Ok(written)
    }
}

impl RecordSink for MergeSet {
    fn push_record(&mut self, record: Record) -> Result<()> {
        let name = record.top_level().to_string();
        if let Some(&slot) = self.index.get(&name) {
            self.groups[slot].1.push(record);
        } else {
            self.index.insert(name.clone(), self.groups.len());
            self.groups.push((name, vec![record]));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::archive::ArchiveReader;

    fn paths(data: &[u8]) -> Vec<String> {
        ArchiveReader::new(data)
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect()
    }

    #[test]
    fn test_groups_by_top_level() {
        let mut set = MergeSet::new();
        set.push_record(Record::new("fish/a", vec![])).unwrap();
        set.push_record(Record::new("brew", vec![])).unwrap();
        set.push_record(Record::new("fish/b", vec![])).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["fish", "brew"]);
    }

    #[test]
    fn test_replace_suppresses_duplicates() {
        let mut set = MergeSet::new();
        set.push_record(Record::new("fish", b"old".to_vec())).unwrap();
        set.replace("fish", vec![Record::new("fish", b"new".to_vec())]);
        set.replace("nvim", vec![Record::new("nvim", b"fresh".to_vec())]);
        assert!(set.contains("nvim"));

        let mut writer = ArchiveWriter::new();
        let written = set.write_to(&mut writer, &["fish", "nvim"]).unwrap();
        assert_eq!(written, 2);

        let data = writer.finish().unwrap();
        let reader = ArchiveReader::new(&data);
        assert_eq!(reader.read_payload("fish").unwrap().unwrap(), b"new");
        assert_eq!(paths(&data), vec!["fish", "nvim"]);
    }

    #[test]
    fn test_write_order_then_leftovers() {
        let mut set = MergeSet::new();
        set.push_record(Record::new("retired", vec![])).unwrap();
        set.push_record(Record::new("brew", vec![])).unwrap();
        set.push_record(Record::new("fish", vec![])).unwrap();
        set.push_record(Record::new("gone", vec![])).unwrap();

        let mut writer = ArchiveWriter::new();
        set.write_to(&mut writer, &["fish", "missing", "brew"]).unwrap();
        let data = writer.finish().unwrap();
        assert_eq!(paths(&data), vec!["fish", "brew", "retired", "gone"]);
    }
}
