//! Result writers: CSV, JSON and a console listing.
//!
//! CSV has one row per result under the header `Query,Title,URL,Snippet`.
//! Queries with no results produce no rows; they still appear in JSON with
//! an empty list.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::error::OutputError;
use crate::ResultSet;

/// CSV header row.
pub const CSV_HEADER: [&str; 4] = ["Query", "Title", "URL", "Snippet"];

/// Snippet length shown in the console listing.
const CONSOLE_SNIPPET_CHARS: usize = 100;

/// Builds `{prefix}_{YYYYmmdd_HHMMSS}.{ext}` so runs never overwrite each
/// other.
pub fn timestamped_path(prefix: &str, ext: &str, at: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("{}_{}.{}", prefix, at.format("%Y%m%d_%H%M%S"), ext))
}

/// Writes one CSV row per result.
pub fn write_csv<W: Write>(results: &ResultSet, writer: W) -> Result<(), OutputError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for (query, items) in results.iter() {
        for item in items {
            csv.write_record([query, item.title(), item.url(), item.snippet()])?;
        }
    }
    csv.flush()?;
    Ok(())
}

/// Writes the result set as pretty-printed JSON keyed by query.
pub fn write_json<W: Write>(results: &ResultSet, mut writer: W) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads a result set previously written by [`write_json`].
pub fn read_json<R: Read>(reader: R) -> Result<ResultSet, OutputError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Writes [`write_csv`] output to a new file at `path`.
pub fn write_csv_file(results: &ResultSet, path: &Path) -> Result<(), OutputError> {
    write_csv(results, BufWriter::new(File::create(path)?))
}

/// Writes [`write_json`] output to a new file at `path`.
pub fn write_json_file(results: &ResultSet, path: &Path) -> Result<(), OutputError> {
    write_json(results, BufWriter::new(File::create(path)?))
}

/// Reads a result set from a JSON file written by [`write_json_file`].
pub fn read_json_file(path: &Path) -> Result<ResultSet, OutputError> {
    read_json(BufReader::new(File::open(path)?))
}

/// Renders a human-readable listing grouped by query.
pub fn render_console(results: &ResultSet) -> String {
    let mut out = String::new();
    for (query, items) in results.iter() {
        out.push_str(&format!("Query: {}\n", query));
        out.push_str(&format!("Results: {}\n", items.len()));
        for (i, item) in items.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, item.title()));
            out.push_str(&format!("     URL: {}\n", item.url()));
            out.push_str(&format!("     Snippet: {}\n", truncate(item.snippet())));
        }
        out.push('\n');
    }
    out
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= CONSOLE_SNIPPET_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(CONSOLE_SNIPPET_CHARS).collect();
    format!("{}...", cut)
}

/// Which files to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormats {
    pub csv: bool,
    pub json: bool,
}

impl Default for OutputFormats {
    fn default() -> Self {
        Self {
            csv: true,
            json: true,
        }
    }
}

/// What [`write_outputs`] produced.
#[derive(Debug, Default)]
pub struct OutputSummary {
    pub written: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, OutputError)>,
}

/// Writes every requested format. A failing format does not stop the
/// others; its error is collected in the summary.
pub fn write_outputs(
    results: &ResultSet,
    prefix: &str,
    formats: OutputFormats,
    at: DateTime<Local>,
) -> OutputSummary {
    let mut summary = OutputSummary::default();

    let mut record = |path: PathBuf, outcome: Result<(), OutputError>| match outcome {
        Ok(()) => {
            debug!("Wrote {}", path.display());
            summary.written.push(path);
        }
        Err(e) => {
            warn!("Failed to write {}: {}", path.display(), e);
            summary.errors.push((path, e));
        }
    };

    if formats.csv {
        let path = timestamped_path(prefix, "csv", at);
        let outcome = write_csv_file(results, &path);
        record(path, outcome);
    }
    if formats.json {
        let path = timestamped_path(prefix, "json", at);
        let outcome = write_json_file(results, &path);
        record(path, outcome);
    }

    summary
}
