//! In-memory row tables over schema-less attribute records.
//!
//! A `Record` is whatever attributes one XML element carried. Column access is
//! only ever done through named projection/rename steps; a value that is not
//! present in a record is "missing" and is filled in by the emitter.

use crate::config::SourceKind;
use crate::error::PipelineError;
use ahash::AHashMap;
use anyhow::Result;
use std::collections::BTreeSet;

/// One flat attribute mapping extracted from a single XML element.
pub type Record = AHashMap<String, String>;

/// Ordered records from one source file.
#[derive(Clone, Debug)]
pub struct Table {
    kind: SourceKind,
    records: Vec<Record>,
}

/// Records sharing one key value, in source order.
#[derive(Debug)]
pub struct Group<'a> {
    pub key: &'a str,
    pub records: Vec<&'a Record>,
}

impl Table {
    pub fn new(kind: SourceKind, records: Vec<Record>) -> Self {
        Self { kind, records }
    }

    pub fn empty(kind: SourceKind) -> Self {
        Self { kind, records: Vec::new() }
    }

    pub fn kind(&self) -> SourceKind { self.kind }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn records(&self) -> &[Record] { &self.records }
    pub fn into_records(self) -> Vec<Record> { self.records }

    /// True when at least one record carries `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.records.iter().any(|r| r.contains_key(column))
    }

    /// Union of attribute names over all records, sorted.
    pub fn columns(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.records.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Keep only `columns` in every record.
    ///
    /// For the mandatory table each column must be carried by at least one
    /// record (an empty table has nothing to violate). Optional tables project
    /// leniently: columns nobody carries just stay missing.
    pub fn select(mut self, columns: &[&str]) -> Result<Self> {
        if self.kind.is_mandatory() && !self.records.is_empty() {
            if let Some(col) = columns.iter().find(|c| !self.has_column(c)) {
                return Err(PipelineError::MissingColumn { table: self.kind.label(), column: col.to_string() }.into());
            }
        }
        for r in &mut self.records {
            r.retain(|k, _| columns.contains(&k.as_str()));
        }
        Ok(self)
    }

    /// Relabel `old → new` for every pair at once, so swaps and chains behave.
    pub fn rename(mut self, pairs: &[(&str, &str)]) -> Self {
        for r in &mut self.records {
            let moved: Vec<(&str, String)> = pairs
                .iter()
                .filter_map(|(old, new)| r.remove(*old).map(|v| (*new, v)))
                .collect();
            for (new, v) in moved {
                r.insert(new.to_string(), v);
            }
        }
        self
    }

    /// Group records by the value of `key`, groups ordered by first appearance.
    /// Records without `key` belong to no group.
    pub fn group_by<'a>(&'a self, key: &str) -> Vec<Group<'a>> {
        let mut slots: AHashMap<&'a str, usize> = AHashMap::new();
        let mut groups: Vec<Group<'a>> = Vec::new();
        for r in &self.records {
            let Some(k) = r.get(key) else { continue };
            let idx = *slots.entry(k.as_str()).or_insert_with(|| {
                groups.push(Group { key: k.as_str(), records: Vec::new() });
                groups.len() - 1
            });
            groups[idx].records.push(r);
        }
        groups
    }
}

/// Build a record from `(name, value)` pairs.
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
