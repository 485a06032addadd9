use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use picklist_sort::{METADATA_NAMESPACE, ROOT_ELEMENT, XML_DECLARATION};
use serde::Serialize;
use tracing::info;

/// File name suffix of Custom Object metadata files.
pub const OBJECT_SUFFIX: &str = ".object";

/// Outcome for one input path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not a Custom Object file; not inspected.
    Skipped,
    /// All dependent picklists are in canonical order.
    Sorted,
    /// At least one dependent picklist is out of order.
    Unsorted,
    /// The file was rewritten in canonical order.
    Rewritten,
    /// The file could not be parsed.
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsorted_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorted_text: Option<String>,
}

impl FileReport {
    pub fn new(path: &Path, status: Status) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            unsorted_fields: Vec::new(),
            error: None,
            sorted_text: None,
        }
    }

    pub fn failed(path: &Path, err: impl std::fmt::Display) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::new(path, Status::Error)
        }
    }
}

/// Header line identifying the root of a Custom Object file.
pub fn root_header() -> String {
    format!(r#"<{ROOT_ELEMENT} xmlns="{METADATA_NAMESPACE}">"#)
}

/// Heuristic used to decide whether a file is a Custom Object definition:
/// the `.object` suffix plus the fixed declaration and root header lines.
pub fn is_custom_object_file(path: &Path, text: &str) -> bool {
    let named = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(OBJECT_SUFFIX));
    if !named {
        return false;
    }
    let mut lines = text.lines().map(|line| line.trim_end_matches('\r'));
    lines.next() == Some(XML_DECLARATION) && lines.next() == Some(root_header().as_str())
}

/// Read `path` and decide whether it should be processed.
///
/// Returns `None` for files failing the eligibility heuristic unless `all`
/// is set.
pub fn load_source(path: &Path, all: bool) -> Result<Option<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if !all && !is_custom_object_file(path, &text) {
        info!(path = %path.display(), "not a custom object file, skipping");
        return Ok(None);
    }
    Ok(Some(text))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

pub fn print_reports(reports: &[FileReport]) {
    for report in reports {
        let status = match report.status {
            Status::Skipped => "skipped",
            Status::Sorted => "sorted",
            Status::Unsorted => "unsorted",
            Status::Rewritten => "rewritten",
            Status::Error => "error",
        };
        print!("{:<10} {}", status, report.path.display());
        if !report.unsorted_fields.is_empty() {
            print!(" ({})", report.unsorted_fields.join(", "));
        }
        if let Some(err) = &report.error {
            print!(": {err}");
        }
        println!();
    }
}
