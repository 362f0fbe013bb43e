//! Which platforms to process: a link-list CSV, or every extracted dump under the data dir.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct PlatformRow {
    #[serde(rename = "Platform Name")]
    platform_name: Option<String>,
    #[serde(rename = "Download Links")]
    download_link: Option<String>,
}

/// `https://archive.org/.../aviation.meta.stackexchange.com.7z` → `aviation.meta.stackexchange`.
pub fn platform_name_from_url(url: &str) -> Option<String> {
    static ARCHIVE: OnceLock<Regex> = OnceLock::new();
    let re = ARCHIVE.get_or_init(|| Regex::new(r"^(.+?)(?:\.com)?\.7z$").unwrap());
    let file = url.trim().rsplit('/').next()?;
    let name = re.captures(file).map(|c| c[1].to_string()).unwrap_or_else(|| file.to_string());
    if name.is_empty() { None } else { Some(name) }
}

/// Read the platform list CSV. Prefers the `Platform Name` column and falls
/// back to deriving names from `Download Links`. Blank rows are skipped and
/// duplicates dropped, first occurrence wins.
pub fn read_platform_list(path: &Path) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let mut names: Vec<String> = Vec::new();
    for (i, row) in rdr.deserialize::<PlatformRow>().enumerate() {
        let row = row.with_context(|| format!("{}: row {}", path.display(), i + 1))?;
        let name = row
            .platform_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| row.download_link.as_deref().and_then(platform_name_from_url));
        if let Some(name) = name {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Every direct subdirectory of `data_dir` holding `posts_file_name`, sorted by name.
pub fn discover_platforms(data_dir: &Path, posts_file_name: &str) -> Vec<String> {
    if !data_dir.exists() {
        return Vec::new();
    }
    let mut found: Vec<String> = WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && e.path().join(posts_file_name).is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    found.sort();
    found
}

