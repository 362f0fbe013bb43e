//! Group-and-count reducers over record tables.
//! Implement `Aggregator` for the per-group state and call `aggregate_by_key`.

use crate::table::{Record, Table};
use ahash::AHashMap;

pub trait Aggregator: Default {
    /// Column whose value keys the aggregate.
    const KEY: &'static str;
    /// Output columns, in the order `values()` reports them.
    const COLUMNS: &'static [&'static str];

    fn ingest(&mut self, record: &Record);
    fn values(&self) -> Vec<u64>;
}

/// One row per distinct key. Keys that never appeared are absent, not zero.
#[derive(Clone, Debug)]
pub struct KeyedAggregate {
    key_column: &'static str,
    columns: &'static [&'static str],
    rows: Vec<(String, Vec<u64>)>,
    index: AHashMap<String, usize>,
}

impl KeyedAggregate {
    pub fn key_column(&self) -> &'static str { self.key_column }
    pub fn columns(&self) -> &'static [&'static str] { self.columns }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn get(&self, key: &str) -> Option<&[u64]> {
        self.index.get(key).map(|&i| self.rows[i].1.as_slice())
    }

    /// Rows in order of the key's first appearance in the source table.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

pub fn aggregate_by_key<A: Aggregator>(table: &Table) -> KeyedAggregate {
    let groups = table.group_by(A::KEY);
    let mut rows = Vec::with_capacity(groups.len());
    let mut index = AHashMap::with_capacity(groups.len());
    for group in groups {
        let mut state = A::default();
        for r in &group.records {
            state.ingest(r);
        }
        index.insert(group.key.to_string(), rows.len());
        rows.push((group.key.to_string(), state.values()));
    }
    KeyedAggregate { key_column: A::KEY, columns: A::COLUMNS, rows, index }
}

/// Acceptance / up / down votes per post. Each category is counted on its
/// own; votes of any other type only make the post appear with zeros.
#[derive(Default, Debug)]
pub struct VoteCounts {
    acceptance: u64,
    upvotes: u64,
    downvotes: u64,
}

impl Aggregator for VoteCounts {
    const KEY: &'static str = "PostId";
    const COLUMNS: &'static [&'static str] = &["Acceptance", "Upvotes", "Downvotes"];

    fn ingest(&mut self, record: &Record) {
        let vote_type = record.get("VoteTypeId").map(String::as_str);
        self.acceptance += u64::from(vote_type == Some("1"));
        self.upvotes += u64::from(vote_type == Some("2"));
        self.downvotes += u64::from(vote_type == Some("3"));
    }

    fn values(&self) -> Vec<u64> {
        vec![self.acceptance, self.upvotes, self.downvotes]
    }
}

#[derive(Default, Debug)]
pub struct CommentCounts {
    comments: u64,
}

impl Aggregator for CommentCounts {
    const KEY: &'static str = "PostId";
    const COLUMNS: &'static [&'static str] = &["Comments"];

    fn ingest(&mut self, _record: &Record) { self.comments += 1; }
    fn values(&self) -> Vec<u64> { vec![self.comments] }
}

#[derive(Default, Debug)]
pub struct BadgeCounts {
    badges: u64,
}

impl Aggregator for BadgeCounts {
    const KEY: &'static str = "UserId";
    const COLUMNS: &'static [&'static str] = &["Badges"];

    fn ingest(&mut self, _record: &Record) { self.badges += 1; }
    fn values(&self) -> Vec<u64> { vec![self.badges] }
}

pub fn vote_counts(votes: &Table) -> KeyedAggregate { aggregate_by_key::<VoteCounts>(votes) }
pub fn comment_counts(comments: &Table) -> KeyedAggregate { aggregate_by_key::<CommentCounts>(comments) }
pub fn badge_counts(badges: &Table) -> KeyedAggregate { aggregate_by_key::<BadgeCounts>(badges) }
