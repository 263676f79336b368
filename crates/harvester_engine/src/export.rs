use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use harvester_core::HarvestedRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::HarvestOutcome;

const CSV_HEADER: [&str; 4] = ["identity", "link", "title", "organization"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Context recorded alongside the records in JSON exports.
#[derive(Debug, Clone, Copy)]
pub struct ExportMeta<'a> {
    pub source_url: &'a str,
    pub generated_utc: &'a str,
}

pub fn render(
    format: ExportFormat,
    outcome: &HarvestOutcome,
    meta: ExportMeta<'_>,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => Ok(render_csv(&outcome.records)),
        ExportFormat::Json => render_json(outcome, meta),
    }
}

/// RFC 4180 CSV with a header row; fields are quoted only when needed.
pub fn render_csv(records: &[HarvestedRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, &CSV_HEADER);
    for record in records {
        let identity = record.identity.to_string();
        push_row(
            &mut out,
            &[
                identity.as_str(),
                record.link.as_str(),
                record.title.as_str(),
                record.organization.as_str(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(field) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

pub fn render_json(outcome: &HarvestOutcome, meta: ExportMeta<'_>) -> Result<String, ExportError> {
    let document = json!({
        "source_url": meta.source_url,
        "generated_utc": meta.generated_utc,
        "completion": outcome.completion.to_string(),
        "error_kind": outcome.error_kind().map(|kind| kind.as_str()),
        "iterations": outcome.iterations,
        "skipped_rows": outcome.skipped_rows,
        "record_count": outcome.records.len(),
        "records": outcome.records,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(ExportError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes `content` to `{dir}/{filename}` through a temp file in the same
/// directory, so a crash never leaves a half-written export behind.
pub fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<PathBuf, ExportError> {
    ensure_output_dir(dir)?;

    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;
    Ok(target)
}
