use crate::concurrency::map_limited;
use crate::config::{ETLOptions, SourceKind};
use crate::emit::{write_csv, FillPolicy};
use crate::error::PipelineError;
use crate::join::{build_final_table, SourceTables};
use crate::platforms::{discover_platforms, read_platform_list};
use crate::progress::make_count_progress;
use crate::table::Table;
use crate::util::{create_with_backoff, init_tracing_once};
use crate::xml_records::read_records_file;
use ahash::AHashSet;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One parameterized pipeline for every platform: XML dumps in, one CSV out.
#[derive(Clone, Default)]
pub struct StackETL {
    pub(crate) opts: ETLOptions,
}

/// What one platform's run read and wrote.
#[derive(Clone, Debug, Serialize)]
pub struct PlatformReport {
    pub platform: String,
    pub source_dir: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
    /// Records per source table, keyed by table label.
    pub records: BTreeMap<String, usize>,
    /// Optional sources whose file was absent.
    pub missing_sources: Vec<String>,
    /// Sources that were malformed and read line by line.
    pub recovered_sources: Vec<String>,
    pub skipped_lines: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PlatformOutcome {
    Written(PlatformReport),
    Skipped { platform: String },
    Failed { platform: String, error: String },
}

impl PlatformOutcome {
    pub fn platform(&self) -> &str {
        match self {
            PlatformOutcome::Written(r) => &r.platform,
            PlatformOutcome::Skipped { platform } | PlatformOutcome::Failed { platform, .. } => platform,
        }
    }
    pub fn is_written(&self) -> bool { matches!(self, PlatformOutcome::Written(_)) }
    pub fn is_failed(&self) -> bool { matches!(self, PlatformOutcome::Failed { .. }) }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub platforms: Vec<PlatformOutcome>,
}

impl RunReport {
    fn from_outcomes(platforms: Vec<PlatformOutcome>) -> Self {
        let mut r = RunReport::default();
        for o in &platforms {
            match o {
                PlatformOutcome::Written(_) => r.written += 1,
                PlatformOutcome::Skipped { .. } => r.skipped += 1,
                PlatformOutcome::Failed { .. } => r.failed += 1,
            }
        }
        r.platforms = platforms;
        r
    }

    pub fn outcome(&self, platform: &str) -> Option<&PlatformOutcome> {
        self.platforms.iter().find(|o| o.platform() == platform)
    }
}

impl StackETL {
    pub fn new() -> Self {
        Self { opts: ETLOptions::default() }
    }

    pub fn from_options(opts: ETLOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ETLOptions { &self.opts }

    // -------- Builder methods --------
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_dir(dir); self }
    pub fn out_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_out_dir(dir); self }
    pub fn file_name(mut self, kind: SourceKind, name: impl Into<String>) -> Self { self.opts = self.opts.with_file_name(kind, name); self }
    pub fn fill_value(mut self, fill: impl Into<String>) -> Self { self.opts = self.opts.with_fill_value(fill); self }
    pub fn fill_policy(mut self, fill: FillPolicy) -> Self { self.opts = self.opts.with_fill_policy(fill); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn platform_concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_platform_concurrency(n); self }
    pub fn skip_platforms<I, S>(mut self, names: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> { self.opts = self.opts.with_skip_platforms(names); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn run_report(mut self, yes: bool) -> Self { self.opts = self.opts.with_run_report(yes); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    // -------- Single platform --------

    /// Read the five sources from `dir`. Fails only when the posts file is absent.
    pub fn load_sources(&self, dir: &Path) -> Result<(SourceTables, PlatformReport)> {
        let mut report = PlatformReport {
            platform: String::new(),
            source_dir: dir.to_path_buf(),
            output: PathBuf::new(),
            rows: 0,
            records: BTreeMap::new(),
            missing_sources: Vec::new(),
            recovered_sources: Vec::new(),
            skipped_lines: 0,
        };
        let mut tables = SourceTables::new(Table::empty(SourceKind::Posts));

        for kind in SourceKind::ALL {
            let path = dir.join(self.opts.file_name(kind));
            let parsed = read_records_file(&path, self.opts.read_buffer_bytes)
                .with_context(|| format!("reading {} table", kind))?;
            let table = match parsed {
                Some(p) => {
                    if p.recovered {
                        report.recovered_sources.push(kind.label().to_string());
                    }
                    report.skipped_lines += p.skipped_lines.len();
                    Table::new(kind, p.records)
                }
                None if kind.is_mandatory() => {
                    return Err(PipelineError::MissingPosts { dir: dir.to_path_buf() }.into());
                }
                None => {
                    tracing::debug!(path = %path.display(), "optional source absent; treating as empty");
                    report.missing_sources.push(kind.label().to_string());
                    Table::empty(kind)
                }
            };
            report.records.insert(kind.label().to_string(), table.len());
            tables = tables.with(table);
        }
        Ok((tables, report))
    }

    /// Process the dump in `dir` as `platform` and write the CSV to `out`.
    pub fn run_dir(&self, dir: &Path, platform: &str, out: &Path) -> Result<PlatformReport> {
        let (tables, mut report) = self.load_sources(dir)?;
        let table = build_final_table(tables, platform)
            .with_context(|| format!("joining tables for {}", platform))?;
        report.rows = write_csv(&table, out, &self.opts.fill, self.opts.write_buffer_bytes)?;
        report.platform = platform.to_string();
        report.output = out.to_path_buf();
        tracing::info!(platform, rows = report.rows, "CSV file saved: {}", out.display());
        Ok(report)
    }

    /// `<data_dir>/<platform>/` → `<out_dir>/<platform>.csv`.
    pub fn run_platform(&self, platform: &str) -> Result<PlatformReport> {
        init_tracing_once();
        self.run_dir(&self.opts.platform_dir(platform), platform, &self.opts.output_path(platform))
    }

    // -------- Many platforms --------

    /// Run every platform; a failing platform is reported and the rest continue.
    /// Errors only when the output directory or the run report cannot be written.
    pub fn run_platforms<I, S>(&self, platforms: I) -> Result<RunReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        init_tracing_once();
        if let Some(n) = self.opts.parallelism { if n > 0 { rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok(); } }
        fs::create_dir_all(&self.opts.out_dir)
            .with_context(|| format!("create {}", self.opts.out_dir.display()))?;

        // Duplicates would race on the same `.inprogress` file.
        let mut seen = AHashSet::new();
        let names: Vec<String> = platforms
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
        if names.is_empty() {
            tracing::warn!("No platforms to process. Check the platform list and data dir.");
        } else {
            tracing::info!("Planned {} platforms for processing.", names.len());
        }

        let pb = if self.opts.progress {
            Some(make_count_progress(names.len() as u64, self.opts.progress_label.as_deref().unwrap_or("Platforms")))
        } else {
            None
        };

        let outcomes = map_limited(&names, self.opts.platform_concurrency, |name| {
            let outcome = if self.opts.is_skipped(name) {
                tracing::info!(platform = %name, "skipped by configuration");
                PlatformOutcome::Skipped { platform: name.clone() }
            } else {
                tracing::info!("{} start", name);
                match self.run_platform(name) {
                    Ok(report) => {
                        tracing::info!("{} finish", name);
                        PlatformOutcome::Written(report)
                    }
                    Err(e) => {
                        tracing::warn!(platform = %name, error = %format!("{e:#}"), "platform failed; continuing with the rest");
                        PlatformOutcome::Failed { platform: name.clone(), error: format!("{e:#}") }
                    }
                }
            };
            if let Some(pb) = &pb { pb.inc(1); }
            outcome
        });

        if let Some(pb) = pb { pb.finish_with_message("done"); }

        let report = RunReport::from_outcomes(outcomes);
        tracing::info!(written = report.written, skipped = report.skipped, failed = report.failed, "run complete");
        if self.opts.write_run_report {
            self.write_run_report(&report)?;
        }
        Ok(report)
    }

    /// Run the platforms named in a link-list CSV.
    pub fn run_platform_list(&self, list_csv: &Path) -> Result<RunReport> {
        let names = read_platform_list(list_csv)?;
        self.run_platforms(names)
    }

    /// Run every extracted dump found under the data dir.
    pub fn run_discovered(&self) -> Result<RunReport> {
        let names = discover_platforms(&self.opts.data_dir, self.opts.file_name(SourceKind::Posts));
        self.run_platforms(names)
    }

    fn write_run_report(&self, report: &RunReport) -> Result<()> {
        let path = self.opts.out_dir.join("run_report.json");
        let f = create_with_backoff(&path, 16, 50).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, report)?;
        w.flush()?;
        Ok(())
    }
}
