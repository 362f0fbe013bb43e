//! Attribute-record XML reader.
//!
//! Dumps look like
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <votes>
//!   <row Id="1" PostId="10" VoteTypeId="2" CreationDate="2024-01-01T00:00:00.000" />
//!   ...
//! </votes>
//! ```
//!
//! Every direct child of the root becomes one `Record` holding exactly that
//! element's attributes. If the document is not well formed, the file is
//! re-read line by line and each line is parsed as a standalone element.
//! This relies on the dumps writing one record per line; a record wrapped
//! over several lines is dropped (and warned about), not reassembled.

use crate::error::MalformedXml;
use crate::table::Record;
use anyhow::{Context, Result};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

/// Records read from one document, plus how they were obtained.
#[derive(Clone, Debug, Default)]
pub struct ParsedRecords {
    pub records: Vec<Record>,
    /// The document was malformed and line-level recovery produced `records`.
    pub recovered: bool,
    /// 1-based numbers of lines dropped during recovery.
    pub skipped_lines: Vec<usize>,
}

#[derive(Clone, Copy)]
enum RecordLevel {
    /// Children of the root element (a whole document).
    Children,
    /// The root element itself (a single recovered line).
    Root,
}

/// XML 1.0 `Char`: tab, newline, carriage return and everything from U+0020
/// except the two noncharacters U+FFFE and U+FFFF.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= '\u{20}' && c != '\u{fffe}' && c != '\u{ffff}')
}

/// Attribute-value normalization: literal line breaks and tabs become spaces
/// before entities are expanded, so `&#xA;` still yields a newline.
fn normalize_attr(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace(['\t', '\n', '\r'], " ")
}

fn attributes_of(e: &BytesStart<'_>, pos: u64) -> Result<Record, MalformedXml> {
    let mut rec = Record::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| MalformedXml::new(pos, err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|err| MalformedXml::new(pos, err.to_string()))?;
        let raw = std::str::from_utf8(&attr.value).map_err(|err| MalformedXml::new(pos, err.to_string()))?;
        if raw.contains('<') {
            return Err(MalformedXml::new(pos, format!("`<` in value of attribute `{key}`")));
        }
        let value = unescape(&normalize_attr(raw))
            .map_err(|err| MalformedXml::new(pos, err.to_string()))?
            .into_owned();
        if let Some(c) = value.chars().find(|c| !is_xml_char(*c)) {
            return Err(MalformedXml::new(pos, format!("invalid character U+{:04X} in attribute `{key}`", c as u32)));
        }
        rec.insert(key.to_string(), value);
    }
    Ok(rec)
}

fn walk(xml: &str, level: RecordLevel) -> Result<Vec<Record>, MalformedXml> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let record_depth = match level {
        RecordLevel::Children => 1,
        RecordLevel::Root => 0,
    };
    let mut depth = 0usize;
    let mut roots = 0usize;
    let mut records = Vec::new();

    loop {
        let pos = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    roots += 1;
                    if roots > 1 { return Err(MalformedXml::new(pos, "junk after document element")); }
                }
                if depth == record_depth { records.push(attributes_of(&e, pos)?); }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    roots += 1;
                    if roots > 1 { return Err(MalformedXml::new(pos, "junk after document element")); }
                }
                if depth == record_depth { records.push(attributes_of(&e, pos)?); }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) => {
                if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(MalformedXml::new(pos, "text outside the document element"));
                }
            }
            Ok(Event::CData(_)) if depth == 0 => {
                return Err(MalformedXml::new(pos, "CDATA outside the document element"));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(MalformedXml::new(reader.error_position() as u64, e.to_string())),
            Ok(_) => {}
        }
    }

    if roots == 0 {
        return Err(MalformedXml::new(xml.len() as u64, "no element found"));
    }
    if depth != 0 {
        return Err(MalformedXml::new(xml.len() as u64, "unclosed element"));
    }
    Ok(records)
}

/// Parse a whole well-formed document: one record per direct child of the root.
pub fn parse_document(xml: &str) -> Result<Vec<Record>, MalformedXml> {
    walk(strip_bom(xml), RecordLevel::Children)
}

/// Parse one line holding exactly one element; its attributes are the record.
pub fn parse_element(line: &str) -> Result<Record, MalformedXml> {
    let mut recs = walk(strip_bom(line), RecordLevel::Root)?;
    recs.pop().ok_or_else(|| MalformedXml::new(0, "no element found"))
}

fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}

/// Blank lines, the XML declaration and a bare open/close tag of the root
/// carry no record; recovery passes over them without a warning.
fn is_structural_line(line: &str) -> bool {
    static BARE_TAG: OnceLock<Regex> = OnceLock::new();
    let re = BARE_TAG.get_or_init(|| Regex::new(r"^</?[A-Za-z_][\w.:-]*\s*>$").unwrap());
    let t = strip_bom(line).trim();
    t.is_empty() || t.starts_with("<?") || re.is_match(t)
}

/// Line-granularity recovery; each line that parses contributes one record.
///
/// Every line that fails to parse is warned about by number and listed in
/// `skipped_lines`. Structural lines (blank, declaration, bare root tag) are
/// the exception: they are expected to fail standalone, so they are logged at
/// debug level only and are not counted as skipped.
pub fn recover_lines(text: &str, source: &str) -> ParsedRecords {
    let mut out = ParsedRecords { recovered: true, ..Default::default() };
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if is_structural_line(line) {
            tracing::debug!(source, line = line_no, "skipping structural line");
            continue;
        }
        match parse_element(line) {
            Ok(rec) => out.records.push(rec),
            Err(e) => {
                tracing::warn!(source, line = line_no, error = %e, "Skipping line {} due to XML parse error", line_no);
                out.skipped_lines.push(line_no);
            }
        }
    }
    out
}

fn parse_with_source(xml: &str, source: &str) -> ParsedRecords {
    if strip_bom(xml).trim().is_empty() {
        return ParsedRecords::default();
    }
    match parse_document(xml) {
        Ok(records) => ParsedRecords { records, ..Default::default() },
        Err(e) => {
            tracing::warn!(source, error = %e, "XML parse failed; attempting to skip problematic lines");
            recover_lines(xml, source)
        }
    }
}

/// Parse an in-memory document, falling back to line recovery when malformed.
pub fn parse_records_str(xml: &str) -> ParsedRecords {
    parse_with_source(xml, "<memory>")
}

/// Read and parse one record file. `Ok(None)` when the file does not exist.
/// An empty file yields no records.
///
/// A file that is not valid UTF-8 goes straight to line recovery with each
/// invalid sequence replaced by U+FFFD rather than dropped, so a damaged value
/// stays visibly damaged in the output.
pub fn read_records_file(path: &Path, read_buf_bytes: usize) -> Result<Option<ParsedRecords>> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("open {}", path.display())),
    };
    let mut bytes = Vec::new();
    BufReader::with_capacity(read_buf_bytes.max(8 * 1024), f)
        .read_to_end(&mut bytes)
        .with_context(|| format!("read {}", path.display()))?;

    let source = path.display().to_string();
    tracing::info!("Extracting {}", source);
    let parsed = match String::from_utf8(bytes) {
        Ok(text) => parse_with_source(&text, &source),
        Err(e) => {
            tracing::warn!(source = %source, "file is not valid UTF-8; attempting to skip problematic lines");
            let text = String::from_utf8_lossy(e.as_bytes()).into_owned();
            recover_lines(&text, &source)
        }
    };
    Ok(Some(parsed))
}
