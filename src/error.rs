//! Typed failures a caller may want to match on. Everything else travels as `anyhow::Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal for one platform's run; other platforms are unaffected.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `Posts.xml` is the only mandatory source.
    #[error("posts file not found in {}", dir.display())]
    MissingPosts { dir: PathBuf },

    /// A projected column that no record of a mandatory table carries.
    #[error("column `{column}` not present in {table} table")]
    MissingColumn { table: &'static str, column: String },
}

/// Syntax failure from the XML reader. Triggers line-level recovery; never surfaced as a run error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("malformed XML at byte {position}: {message}")]
pub struct MalformedXml {
    pub position: u64,
    pub message: String,
}

impl MalformedXml {
    pub(crate) fn new(position: u64, message: impl Into<String>) -> Self {
        Self { position, message: message.into() }
    }
}
