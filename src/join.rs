//! Posts ⋈ users ⋈ vote/comment/badge aggregates.
//!
//! Every join is a left-outer join that keeps the accumulated table's row
//! count and order: a post without votes, comments or a known owner is a
//! normal post. A right side only contributes its first row per key, and a
//! left row without the join key never matches.

use crate::aggregate::{badge_counts, comment_counts, vote_counts, KeyedAggregate};
use crate::config::SourceKind;
use crate::table::{Record, Table};
use ahash::AHashMap;
use anyhow::Result;

const POST_COLUMNS: &[&str] = &["Id", "PostTypeId", "ParentId", "CreationDate", "ViewCount", "OwnerUserId", "Tags"];
const POST_RENAMES: &[(&str, &str)] = &[("Id", "PostId"), ("OwnerUserId", "UserId")];
const USER_COLUMNS: &[&str] = &["Id", "Reputation", "CreationDate", "LastAccessDate"];
const USER_RENAMES: &[(&str, &str)] = &[("CreationDate", "UserDate"), ("LastAccessDate", "LastAccess")];

/// The five tables of one platform. Absent optional sources are empty tables.
#[derive(Clone, Debug)]
pub struct SourceTables {
    pub posts: Table,
    pub users: Table,
    pub votes: Table,
    pub comments: Table,
    pub badges: Table,
}

impl SourceTables {
    pub fn new(posts: Table) -> Self {
        Self {
            posts,
            users: Table::empty(SourceKind::Users),
            votes: Table::empty(SourceKind::Votes),
            comments: Table::empty(SourceKind::Comments),
            badges: Table::empty(SourceKind::Badges),
        }
    }

    pub fn with(mut self, table: Table) -> Self {
        match table.kind() {
            SourceKind::Posts => self.posts = table,
            SourceKind::Users => self.users = table,
            SourceKind::Votes => self.votes = table,
            SourceKind::Comments => self.comments = table,
            SourceKind::Badges => self.badges = table,
        }
        self
    }
}

/// One row per post, values still possibly missing.
#[derive(Clone, Debug)]
pub struct FinalTable {
    pub platform: String,
    pub rows: Vec<Record>,
}

impl FinalTable {
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }
}

/// Right-hand side of a left join: the columns a matching key brings in.
pub trait JoinSource {
    fn matched(&self, key: &str) -> Option<Vec<(String, String)>>;
}

impl JoinSource for KeyedAggregate {
    fn matched(&self, key: &str) -> Option<Vec<(String, String)>> {
        let values = self.get(key)?;
        Some(self.columns().iter().zip(values).map(|(c, v)| (c.to_string(), v.to_string())).collect())
    }
}

/// Users by `Id`, projected and relabelled for joining.
pub struct UserIndex {
    by_id: AHashMap<String, Record>,
}

impl UserIndex {
    pub fn build(users: Table) -> Result<Self> {
        let users = users.select(USER_COLUMNS)?.rename(USER_RENAMES);
        let mut by_id = AHashMap::with_capacity(users.len());
        for mut r in users.into_records() {
            if let Some(id) = r.remove("Id") {
                by_id.entry(id).or_insert(r);
            }
        }
        Ok(Self { by_id })
    }
}

impl JoinSource for UserIndex {
    fn matched(&self, key: &str) -> Option<Vec<(String, String)>> {
        self.by_id.get(key).map(|r| r.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// Left-join `rows` on `rows[left_key]` against `right`.
pub fn left_join(rows: &mut [Record], left_key: &str, right: &impl JoinSource) {
    for row in rows.iter_mut() {
        let Some(key) = row.get(left_key) else { continue };
        if let Some(cols) = right.matched(key) {
            row.extend(cols);
        }
    }
}

/// Posts projected to the base columns, `Id → PostId`, `OwnerUserId → UserId`.
pub fn base_posts(posts: Table) -> Result<Vec<Record>> {
    Ok(posts.select(POST_COLUMNS)?.rename(POST_RENAMES).into_records())
}

pub fn build_final_table(tables: SourceTables, platform: &str) -> Result<FinalTable> {
    let SourceTables { posts, users, votes, comments, badges } = tables;

    let mut rows = base_posts(posts)?;
    left_join(&mut rows, "UserId", &UserIndex::build(users)?);
    left_join(&mut rows, "PostId", &vote_counts(&votes));
    left_join(&mut rows, "PostId", &comment_counts(&comments));
    left_join(&mut rows, "UserId", &badge_counts(&badges));

    for row in &mut rows {
        row.insert("SourceId".to_string(), platform.to_string());
    }
    Ok(FinalTable { platform: platform.to_string(), rows })
}
