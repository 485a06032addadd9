use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use picklist_sort::{CustomObject, PicklistField};
use tracing::{debug, error, info, warn};

use crate::cmd_check::count;
use crate::common::{self, FileReport, Status};

/// Sort one file. With `write` the file is replaced in place, otherwise the
/// sorted text is returned in the report. An already canonical file keeps
/// its loaded text in the report when not writing.
pub fn sort_file(path: &Path, all: bool, write: bool) -> Result<FileReport> {
    let Some(text) = common::load_source(path, all)? else {
        return Ok(FileReport::new(path, Status::Skipped));
    };
    let mut object = match CustomObject::parse(&text) {
        Ok(object) => object,
        Err(err) => {
            error!(path = %path.display(), %err, "failed to parse custom object");
            return Ok(FileReport::failed(path, err));
        }
    };
    if object.is_canonical() {
        debug!(path = %path.display(), "already sorted");
        let sorted_text = (!write).then_some(text);
        return Ok(FileReport {
            sorted_text,
            ..FileReport::new(path, Status::Sorted)
        });
    }

    let fields: Vec<String> = object
        .unsorted_fields()
        .map(PicklistField::display_name)
        .map(str::to_owned)
        .collect();
    let sorted = object.sort_in_place().to_xml_string();

    let mut report = if write {
        fs::write(path, &sorted).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), fields = %fields.join(","), "rewrote file");
        FileReport::new(path, Status::Rewritten)
    } else {
        FileReport {
            sorted_text: Some(sorted),
            ..FileReport::new(path, Status::Unsorted)
        }
    };
    report.unsorted_fields = fields;
    Ok(report)
}

pub fn run(paths: Vec<PathBuf>, all: bool, write: bool, json: bool) -> Result<()> {
    if !write && !json && paths.len() > 1 {
        bail!("printing sorted text supports a single file; pass --write to sort several");
    }
    let reports = paths
        .iter()
        .map(|path| sort_file(path, all, write))
        .collect::<Result<Vec<_>>>()?;
    let failed = count(&reports, Status::Error);
    info!(
        files = reports.len(),
        rewritten = count(&reports, Status::Rewritten),
        failed,
        "sort finished"
    );

    if json {
        common::print_json(&reports)?;
    } else if write {
        common::print_reports(&reports);
    } else {
        write_dry_run(
            &reports,
            &mut std::io::stdout().lock(),
            &mut std::io::stderr().lock(),
        )?;
    }

    if failed > 0 {
        bail!("{failed} file(s) could not be parsed");
    }
    Ok(())
}

/// Print sorted text to `out`; files that produced none get a status line on
/// `status`.
fn write_dry_run(
    reports: &[FileReport],
    out: &mut impl Write,
    status: &mut impl Write,
) -> Result<()> {
    for report in reports {
        match &report.sorted_text {
            Some(text) => out
                .write_all(text.as_bytes())
                .context("write sorted text to stdout")?,
            None => {
                if report.status == Status::Skipped {
                    warn!(
                        path = %report.path.display(),
                        "not a custom object file; pass --all to sort it anyway"
                    );
                }
                writeln!(status, "{:?}: {}", report.status, report.path.display())
                    .context("write status to stderr")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSORTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CustomObject xmlns="http://soap.sforce.com/2006/04/metadata">
    <fields>
        <fullName>City__c</fullName>
        <type>Picklist</type>
        <valueSet>
            <controllingField>Country__c</controllingField>
            <valueSettings>
                <controllingFieldValue>US</controllingFieldValue>
                <valueName>Boston</valueName>
            </valueSettings>
            <valueSettings>
                <controllingFieldValue>US</controllingFieldValue>
                <controllingFieldValue>CA</controllingFieldValue>
                <valueName>Austin</valueName>
            </valueSettings>
        </valueSet>
    </fields>
</CustomObject>
"#;

    const SORTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CustomObject xmlns="http://soap.sforce.com/2006/04/metadata">
    <fields>
        <fullName>City__c</fullName>
        <type>Picklist</type>
        <valueSet>
            <controllingField>Country__c</controllingField>
            <valueSettings>
                <controllingFieldValue>US</controllingFieldValue>
                <controllingFieldValue>CA</controllingFieldValue>
                <valueName>Austin</valueName>
            </valueSettings>
            <valueSettings>
                <controllingFieldValue>US</controllingFieldValue>
                <valueName>Boston</valueName>
            </valueSettings>
        </valueSet>
    </fields>
</CustomObject>
"#;

    #[test]
    fn write_replaces_file_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Address__c.object");
        fs::write(&path, UNSORTED).expect("write fixture");

        let report = sort_file(&path, false, true).expect("sort");
        assert_eq!(report.status, Status::Rewritten);
        assert_eq!(report.unsorted_fields, vec!["City__c"]);
        assert_eq!(fs::read_to_string(&path).expect("read back"), SORTED);

        let again = sort_file(&path, false, true).expect("sort again");
        assert_eq!(again.status, Status::Sorted);
    }

    #[test]
    fn dry_run_keeps_file_and_returns_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Address__c.object");
        fs::write(&path, UNSORTED).expect("write fixture");

        let report = sort_file(&path, false, false).expect("sort");
        assert_eq!(report.status, Status::Unsorted);
        assert_eq!(report.sorted_text.as_deref(), Some(SORTED));
        assert_eq!(fs::read_to_string(&path).expect("read back"), UNSORTED);
    }

    #[test]
    fn broken_file_is_not_touched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Broken__c.object");
        let truncated = &UNSORTED[..UNSORTED.find("</fields>").expect("marker")];
        fs::write(&path, truncated).expect("write fixture");

        let report = sort_file(&path, false, true).expect("sort");
        assert_eq!(report.status, Status::Error);
        assert_eq!(fs::read_to_string(&path).expect("read back"), truncated);
    }

    #[test]
    fn dry_run_echoes_canonical_file_as_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Address__c.object");
        fs::write(&path, SORTED).expect("write fixture");

        let report = sort_file(&path, false, false).expect("sort");
        assert_eq!(report.status, Status::Sorted);
        assert_eq!(report.sorted_text.as_deref(), Some(SORTED));

        let (mut out, mut status) = (Vec::new(), Vec::new());
        write_dry_run(&[report], &mut out, &mut status).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), SORTED);
        assert!(status.is_empty());
    }

    #[test]
    fn dry_run_reports_skipped_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.xml");
        fs::write(&path, UNSORTED).expect("write fixture");

        let report = sort_file(&path, false, false).expect("sort");
        assert_eq!(report.status, Status::Skipped);

        let (mut out, mut status) = (Vec::new(), Vec::new());
        write_dry_run(&[report], &mut out, &mut status).expect("render");
        assert!(out.is_empty());
        let status = String::from_utf8(status).expect("utf8");
        assert!(status.starts_with("Skipped: "));
        assert!(status.contains("notes.xml"));
    }
}
