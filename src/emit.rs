//! CSV emitter: fixed column order, missing values filled by one policy.

use crate::join::FinalTable;
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const OUTPUT_COLUMNS: [&str; 16] = [
    "PostId", "PostTypeId", "CreationDate", "UserId", "Tags", "Comments",
    "ParentId", "Acceptance", "Upvotes", "Downvotes", "UserDate", "LastAccess",
    "Reputation", "Badges", "ViewCount", "SourceId",
];

/// What a missing value becomes in the output.
///
/// The dumps' consumers have always received a literal `0` in every column,
/// dates and tags included; that stays the default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FillPolicy {
    Constant(String),
    Blank,
}

impl Default for FillPolicy {
    fn default() -> Self {
        FillPolicy::Constant("0".to_string())
    }
}

impl FillPolicy {
    pub fn value(&self) -> &str {
        match self {
            FillPolicy::Constant(v) => v,
            FillPolicy::Blank => "",
        }
    }
}

/// Serialize `table` as CSV into `w`. Returns the number of data rows.
pub fn write_csv_to<W: Write>(table: &FinalTable, fill: &FillPolicy, w: W) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(w);
    wtr.write_record(OUTPUT_COLUMNS)?;
    let fill = fill.value();
    for row in &table.rows {
        wtr.write_record(OUTPUT_COLUMNS.iter().map(|c| row.get(*c).map(String::as_str).unwrap_or(fill)))?;
    }
    wtr.flush()?;
    Ok(table.rows.len())
}

fn inprogress_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".inprogress");
    path.with_file_name(name)
}

/// Write the CSV next to `path` and promote it once complete.
pub fn write_csv(table: &FinalTable, path: &Path, fill: &FillPolicy, write_buf_bytes: usize) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let tmp = inprogress_path(path);
    let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
    let mut w = BufWriter::with_capacity(write_buf_bytes.max(8 * 1024), f);
    let n = write_csv_to(table, fill, &mut w).with_context(|| format!("write {}", tmp.display()))?;
    w.flush().with_context(|| format!("flush {}", tmp.display()))?;
    drop(w);
    replace_file_atomic_backoff(&tmp, path)?;
    Ok(n)
}
