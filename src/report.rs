//! Append-only CSV reports.
//!
//! Every tool streams one [`ReportRow`] per processed record into a
//! [`ReportSink`]. The header is fixed by the first row written.

use serde_json::{Map, Value};
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::error::ToolResult;

/// Ordered named cells of one report line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    cells: Vec<(String, String)>,
}

impl ReportRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: impl Display) -> Self {
        self.cells.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds a cell that renders empty when `value` is `None`.
    pub fn optional(self, name: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self.field(name, ""),
        }
    }

    /// Builds a row from a record object, skipping `omit`ted fields.
    pub fn from_object(object: &Map<String, Value>, omit: &[&str]) -> Self {
        let cells = object
            .iter()
            .filter(|(name, _)| !omit.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), render_value(value)))
            .collect();
        Self { cells }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }
}

pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

pub trait ReportSink {
    fn write_row(&mut self, row: &ReportRow) -> ToolResult<()>;

    fn finish(&mut self) -> ToolResult<()> {
        Ok(())
    }
}

/// Discards everything; used when no report was requested.
#[derive(Debug, Default)]
pub struct NullReport;

impl ReportSink for NullReport {
    fn write_row(&mut self, _row: &ReportRow) -> ToolResult<()> {
        Ok(())
    }
}

pub struct CsvReport<W: Write> {
    writer: csv::Writer<W>,
    header: Option<Vec<String>>,
}

impl<W: Write> CsvReport<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            header: None,
        }
    }
}

impl<W: Write> ReportSink for CsvReport<W> {
    fn write_row(&mut self, row: &ReportRow) -> ToolResult<()> {
        if self.header.is_none() {
            let header: Vec<String> = row.names().map(str::to_string).collect();
            self.writer.write_record(&header)?;
            self.header = Some(header);
        }
        let header = self.header.as_deref().unwrap_or_default();

        for name in row.names() {
            if !header.iter().any(|h| h == name) {
                warn!(column = %name, "Report column is not in the header and was dropped.");
            }
        }
        let record: Vec<&str> = header
            .iter()
            .map(|name| row.get(name).unwrap_or(""))
            .collect();
        self.writer.write_record(&record)?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> ToolResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Opens the report a tool was asked to write, or a sink that drops rows.
pub fn open_report(path: Option<&Path>) -> ToolResult<Box<dyn ReportSink>> {
    match path {
        Some(path) => {
            info!(path = ?path, "Writing report.");
            let file = File::create(path)?;
            Ok(Box::new(CsvReport::new(file)))
        }
        None => Ok(Box::new(NullReport)),
    }
}

pub fn stdout_report() -> CsvReport<io::Stdout> {
    CsvReport::new(io::stdout())
}
