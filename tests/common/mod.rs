#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Fresh temp directory that outlives the test (inspect it on failure).
pub fn tmp_base() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

pub fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A well-formed dump file: declaration, `<root>`, one `<row .../>` per line.
pub fn rows_xml(root: &str, rows: &[&str]) -> String {
    let mut s = String::from("\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    s.push_str(&format!("<{root}>\n"));
    for r in rows {
        s.push_str(&format!("  <row {r} />\n"));
    }
    s.push_str(&format!("</{root}>\n"));
    s
}

/// Build `<base>/<platform>/` with the given `(file name, contents)` pairs.
pub fn make_platform(base: &Path, platform: &str, files: &[(&str, String)]) -> PathBuf {
    let dir = base.join(platform);
    fs::create_dir_all(&dir).unwrap();
    for (name, contents) in files {
        write_file(&dir.join(name), contents);
    }
    dir
}

/// Three posts, two users, a few votes/comments/badges:
/// - post 10 by user 5 (rep 100, no badges): two upvotes, one downvote, no comments
/// - post 11, an answer to 10, by user 6 (rep 20, two badges): one acceptance, two comments
/// - post 12 without an owner: no votes, no comments
/// - one vote on post 99, which does not exist
pub fn scenario_files() -> Vec<(&'static str, String)> {
    vec![
        ("Posts.xml", rows_xml("posts", &[
            r#"Id="10" PostTypeId="1" CreationDate="2024-01-01T10:00:00.000" ViewCount="42" OwnerUserId="5" Tags="&lt;rust&gt;&lt;xml&gt;" Title="How?""#,
            r#"Id="11" PostTypeId="2" ParentId="10" CreationDate="2024-01-02T10:00:00.000" OwnerUserId="6""#,
            r#"Id="12" PostTypeId="1" CreationDate="2024-01-03T10:00:00.000" ViewCount="7" Tags="&lt;csv&gt;""#,
        ])),
        ("Users.xml", rows_xml("users", &[
            r#"Id="5" Reputation="100" CreationDate="2023-01-01T00:00:00.000" LastAccessDate="2024-06-01T00:00:00.000" DisplayName="five""#,
            r#"Id="6" Reputation="20" CreationDate="2023-02-01T00:00:00.000" LastAccessDate="2024-06-02T00:00:00.000""#,
        ])),
        ("Votes.xml", rows_xml("votes", &[
            r#"Id="1" PostId="10" VoteTypeId="2""#,
            r#"Id="2" PostId="10" VoteTypeId="2""#,
            r#"Id="3" PostId="10" VoteTypeId="3""#,
            r#"Id="4" PostId="11" VoteTypeId="1""#,
            r#"Id="5" PostId="99" VoteTypeId="2""#,
        ])),
        ("Comments.xml", rows_xml("comments", &[
            r#"Id="1" PostId="11" Text="nice" UserId="5""#,
            r#"Id="2" PostId="11" Text="thanks, really" UserId="6""#,
        ])),
        ("Badges.xml", rows_xml("badges", &[
            r#"Id="1" UserId="6" Name="Editor""#,
            r#"Id="2" UserId="6" Name="Student""#,
        ])),
    ]
}

/// Read a CSV written by the emitter into its header and rows keyed by column.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
    let rows = rdr
        .records()
        .map(|r| {
            let r = r.unwrap();
            headers.iter().cloned().zip(r.iter().map(str::to_string)).collect()
        })
        .collect();
    (headers, rows)
}

pub fn row_for<'a>(rows: &'a [HashMap<String, String>], post_id: &str) -> &'a HashMap<String, String> {
    rows.iter().find(|r| r["PostId"] == post_id).unwrap()
}

/// Shared buffer a `tracing_subscriber::fmt` subscriber writes into.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with warnings and above captured on this thread; returns its value and the log text.
pub fn with_captured_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let cap = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(cap.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, cap.text())
}
