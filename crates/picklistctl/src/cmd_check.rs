use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use picklist_sort::{CustomObject, PicklistField};
use tracing::{error, info, warn};

use crate::common::{self, FileReport, Status};

/// Inspect one file without modifying it.
pub fn check_file(path: &Path, all: bool) -> Result<FileReport> {
    let Some(text) = common::load_source(path, all)? else {
        return Ok(FileReport::new(path, Status::Skipped));
    };
    let object = match CustomObject::parse(&text) {
        Ok(object) => object,
        Err(err) => {
            error!(path = %path.display(), %err, "failed to parse custom object");
            return Ok(FileReport::failed(path, err));
        }
    };

    let unsorted: Vec<String> = object
        .unsorted_fields()
        .map(PicklistField::display_name)
        .map(str::to_owned)
        .collect();
    let mut report = if unsorted.is_empty() {
        FileReport::new(path, Status::Sorted)
    } else {
        warn!(
            path = %path.display(),
            fields = %unsorted.join(","),
            "dependent picklists have unsorted valueSettings"
        );
        FileReport::new(path, Status::Unsorted)
    };
    report.unsorted_fields = unsorted;
    Ok(report)
}

pub fn run(paths: Vec<PathBuf>, all: bool, json: bool) -> Result<()> {
    let reports = paths
        .iter()
        .map(|path| check_file(path, all))
        .collect::<Result<Vec<_>>>()?;

    let unsorted = count(&reports, Status::Unsorted);
    let failed = count(&reports, Status::Error);
    info!(files = reports.len(), unsorted, failed, "check finished");

    if json {
        common::print_json(&reports)?;
    } else {
        common::print_reports(&reports);
    }

    if failed > 0 {
        bail!("{failed} file(s) could not be parsed");
    }
    if unsorted > 0 {
        bail!("{unsorted} file(s) have unsorted dependent picklists; run `picklistctl sort --write`");
    }
    Ok(())
}

pub(crate) fn count(reports: &[FileReport], status: Status) -> usize {
    reports
        .iter()
        .filter(|report| report.status == status)
        .count()
}
