use crate::emit::FillPolicy;
use std::fmt;
use std::path::{Path, PathBuf};

/// The five record files of one platform dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Posts,
    Users,
    Votes,
    Comments,
    Badges,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Posts,
        SourceKind::Users,
        SourceKind::Votes,
        SourceKind::Comments,
        SourceKind::Badges,
    ];

    /// File name used by the public dumps.
    pub fn default_file_name(self) -> &'static str {
        match self {
            SourceKind::Posts => "Posts.xml",
            SourceKind::Users => "Users.xml",
            SourceKind::Votes => "Votes.xml",
            SourceKind::Comments => "Comments.xml",
            SourceKind::Badges => "Badges.xml",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Posts => "posts",
            SourceKind::Users => "users",
            SourceKind::Votes => "votes",
            SourceKind::Comments => "comments",
            SourceKind::Badges => "badges",
        }
    }

    /// Only posts are required; every other source may be absent.
    pub fn is_mandatory(self) -> bool {
        matches!(self, SourceKind::Posts)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ETLOptions {
    pub data_dir: PathBuf,            // holds one extracted directory per platform
    pub out_dir: PathBuf,             // receives <platform>.csv
    pub file_names: [String; 5],      // indexed by SourceKind
    pub fill: FillPolicy,             // written wherever a joined value is missing
    pub parallelism: Option<usize>,   // Some(N) to set rayon threads, None to use default
    pub platform_concurrency: usize,  // platforms processed at the same time
    pub skip_platforms: Vec<String>,  // normalized lowercase
    pub progress: bool,
    pub progress_label: Option<String>,
    pub write_run_report: bool,       // run_report.json in out_dir after run_platforms

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for ETLOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("../UnzippedFiles"),
            out_dir: PathBuf::from("../csv_files"),
            file_names: SourceKind::ALL.map(|k| k.default_file_name().to_string()),
            fill: FillPolicy::default(),
            parallelism: None,
            platform_concurrency: 1, // whole dumps are held in memory
            skip_platforms: Vec::new(),
            progress: true,
            progress_label: None,
            write_run_report: true,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl ETLOptions {
    pub fn file_name(&self, kind: SourceKind) -> &str {
        &self.file_names[kind.index()]
    }

    /// Directory holding the five XML files of `platform`.
    pub fn platform_dir(&self, platform: &str) -> PathBuf {
        self.data_dir.join(platform)
    }

    pub fn output_path(&self, platform: &str) -> PathBuf {
        self.out_dir.join(format!("{platform}.csv"))
    }

    pub fn is_skipped(&self, platform: &str) -> bool {
        let p = platform.trim().to_lowercase();
        self.skip_platforms.iter().any(|s| *s == p)
    }

    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.out_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_file_name(mut self, kind: SourceKind, name: impl Into<String>) -> Self {
        self.file_names[kind.index()] = name.into();
        self
    }
    pub fn with_fill_value(mut self, fill: impl Into<String>) -> Self {
        self.fill = FillPolicy::Constant(fill.into());
        self
    }
    pub fn with_fill_policy(mut self, fill: FillPolicy) -> Self {
        self.fill = fill;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_platform_concurrency(mut self, n: usize) -> Self {
        self.platform_concurrency = n.max(1);
        self
    }
    pub fn with_skip_platforms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut v: Vec<String> = names
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        v.sort();
        v.dedup();
        self.skip_platforms = v;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_run_report(mut self, yes: bool) -> Self {
        self.write_run_report = yes;
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}
