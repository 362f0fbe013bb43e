mod config;
mod error;
mod util;
mod progress;
mod concurrency;

mod xml_records;
mod table;
mod aggregate;
mod join;
mod emit;

mod platforms;
mod pipeline;

pub use crate::config::{ETLOptions, SourceKind};
pub use crate::error::{MalformedXml, PipelineError};
pub use crate::pipeline::{PlatformOutcome, PlatformReport, RunReport, StackETL};

// Record parsing, usable without the filesystem.
pub use crate::xml_records::{parse_document, parse_element, parse_records_str, read_records_file, recover_lines, ParsedRecords};

// Tables and the reducers built on them.
pub use crate::table::{record, Group, Record, Table};
pub use crate::aggregate::{aggregate_by_key, badge_counts, comment_counts, vote_counts, Aggregator, BadgeCounts, CommentCounts, KeyedAggregate, VoteCounts};

// Join + emit stages.
pub use crate::join::{base_posts, build_final_table, left_join, FinalTable, JoinSource, SourceTables, UserIndex};
pub use crate::emit::{write_csv, write_csv_to, FillPolicy, OUTPUT_COLUMNS};

// Driver helpers.
pub use crate::platforms::{discover_platforms, platform_name_from_url, read_platform_list};
pub use crate::util::{init_tracing_once, split_list};
