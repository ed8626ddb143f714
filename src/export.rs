//! Metrics and trace export in JSON, CSV and fixed-width text.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::engine::{Metrics, TraceEntry};
use crate::error::{FfiError, Result};

pub const TRACE_COLUMNS: [&str; 11] = [
    "function_name",
    "source_language",
    "target_language",
    "start_time_ns",
    "end_time_ns",
    "execution_time_ns",
    "marshalling_time_ns",
    "arg_count",
    "cached",
    "batched",
    "sequence",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "text",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = FfiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(FfiError::invalid(format!(
                "unknown export format `{other}` (expected json, csv or text)"
            ))),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    metrics: &'a Metrics,
    traces: &'a [TraceEntry],
}

pub fn write_report<W: Write>(
    writer: &mut W,
    format: ExportFormat,
    metrics: &Metrics,
    traces: &[TraceEntry],
) -> Result<()> {
    match format {
        ExportFormat::Json => write_json(writer, metrics, traces)?,
        ExportFormat::Csv => write_csv(writer, metrics, traces)?,
        ExportFormat::Text => write_text(writer, metrics, traces)?,
    }
    writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(writer: &mut W, metrics: &Metrics, traces: &[TraceEntry]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &Report { metrics, traces })?;
    writeln!(writer)?;
    Ok(())
}

fn write_csv<W: Write>(writer: &mut W, metrics: &Metrics, traces: &[TraceEntry]) -> Result<()> {
    writeln!(writer, "Metric,Value")?;
    for (name, value) in metrics.fields() {
        writeln!(writer, "{name},{value}")?;
    }
    writeln!(writer)?;

    writeln!(writer, "{}", TRACE_COLUMNS.join(","))?;
    for entry in traces {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&entry.function_name),
            csv_field(&entry.source_language),
            csv_field(&entry.target_language),
            entry.start_ns,
            entry.end_ns,
            entry.execution_ns,
            entry.marshalling_ns,
            entry.arg_count,
            entry.cached,
            entry.batched,
            entry.sequence,
        )?;
    }
    Ok(())
}

/// Quote fields containing separators, quotes or line breaks.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_text<W: Write>(writer: &mut W, metrics: &Metrics, traces: &[TraceEntry]) -> Result<()> {
    writeln!(writer, "Performance Metrics")?;
    writeln!(writer, "{}", "=".repeat(48))?;
    for (name, value) in metrics.fields() {
        writeln!(writer, "{name:<30} {value:>17}")?;
    }
    writeln!(writer)?;

    writeln!(writer, "Call Traces ({})", traces.len())?;
    let header = format!(
        "{:<24} {:<10} {:<10} {:>16} {:>16} {:>12} {:>12} {:>5} {:<6} {:<7} {:>8}",
        "function", "source", "target", "start_ns", "end_ns", "exec_ns", "marshal_ns", "args",
        "cached", "batched", "seq",
    );
    writeln!(writer, "{}", "=".repeat(header.len()))?;
    writeln!(writer, "{header}")?;
    writeln!(writer, "{}", "-".repeat(header.len()))?;
    for entry in traces {
        writeln!(
            writer,
            "{:<24} {:<10} {:<10} {:>16} {:>16} {:>12} {:>12} {:>5} {:<6} {:<7} {:>8}",
            truncate(&entry.function_name, 24),
            truncate(&entry.source_language, 10),
            truncate(&entry.target_language, 10),
            entry.start_ns,
            entry.end_ns,
            entry.execution_ns,
            entry.marshalling_ns,
            entry.arg_count,
            if entry.cached { "yes" } else { "no" },
            if entry.batched { "yes" } else { "no" },
            entry.sequence,
        )?;
    }
    Ok(())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}
