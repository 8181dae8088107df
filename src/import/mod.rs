//! Delimited and spreadsheet file import for side-by-side viewing.
//!
//! Imported tables are display-only; nothing here feeds the model.

use calamine::{open_workbook_auto, Data, Reader};
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported file format '{extension}'. Use CSV, TSV or Excel files.")]
    Unsupported { extension: String },

    #[error("Error importing file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error importing file {path}: {source}")]
    Spreadsheet {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Error importing file {path}: line {line} has an unterminated quoted field")]
    UnterminatedQuote { path: String, line: usize },

    #[error("Error importing file {path}: no header row")]
    Empty { path: String },
}

/// A parsed header + rows grid. Short rows are padded with empty cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a `.csv` (comma), `.tsv`/`.txt` (tab) or Excel workbook into a `Table`.
pub fn import_file(path: &Path) -> Result<Table, ImportError> {
    let source = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let table = match extension.as_str() {
        "csv" => read_delimited(path, ',', &source)?,
        "tsv" | "txt" => read_delimited(path, '\t', &source)?,
        "xlsx" | "xlsm" | "xls" => read_spreadsheet(path, &source)?,
        _ => return Err(ImportError::Unsupported { extension }),
    };
    info!(
        "Imported {}: {} columns, {} rows",
        source,
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

fn read_delimited(path: &Path, delimiter: char, source: &str) -> Result<Table, ImportError> {
    let text = std::fs::read_to_string(path).map_err(|e| ImportError::Io {
        path: source.to_string(),
        source: e,
    })?;
    parse_delimited(&text, delimiter, source)
}

/// First worksheet only; its first row is the header.
fn read_spreadsheet(path: &Path, source: &str) -> Result<Table, ImportError> {
    let spreadsheet_error = |e: calamine::Error| ImportError::Spreadsheet {
        path: source.to_string(),
        source: e,
    };
    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(spreadsheet_error)?,
        None => {
            return Err(ImportError::Empty {
                path: source.to_string(),
            })
        }
    };

    let records = range
        .rows()
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    into_table(records, source)
}

/// Parse delimited text. Quoted fields may contain the delimiter, doubled
/// quotes, and line breaks.
pub fn parse_delimited(text: &str, delimiter: char, source: &str) -> Result<Table, ImportError> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut quote_opened_on = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_opened_on = line;
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(ImportError::UnterminatedQuote {
            path: source.to_string(),
            line: quote_opened_on,
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }
    into_table(records, source)
}

fn into_table(records: Vec<Vec<String>>, source: &str) -> Result<Table, ImportError> {
    let mut records = records.into_iter();
    let headers = records.next().ok_or_else(|| ImportError::Empty {
        path: source.to_string(),
    })?;
    let width = headers.len();
    let rows = records
        .map(|mut row| {
            if row.len() < width {
                row.resize(width, String::new());
            }
            row
        })
        .collect();

    Ok(Table {
        source: source.to_string(),
        headers,
        rows,
    })
}

/// Blank lines carry no record.
fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    if record.len() == 1 && record[0].trim().is_empty() {
        return;
    }
    records.push(record);
}

impl Table {
    /// Column-aligned text with a leading row index, for terminal display.
    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);
        fn cell(row: &[String], i: usize) -> &str {
            row.get(i).map(String::as_str).unwrap_or("")
        }

        let mut widths: Vec<usize> = (0..columns)
            .map(|i| cell(&self.headers, i).chars().count())
            .collect();
        for row in &self.rows {
            for (i, w) in widths.iter_mut().enumerate() {
                *w = (*w).max(cell(row, i).chars().count());
            }
        }
        let index_width = self.rows.len().saturating_sub(1).to_string().len();

        let mut out = String::new();
        let _ = writeln!(out, "File: {}", self.source);
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(out);

        let mut line = " ".repeat(index_width);
        for (i, w) in widths.iter().enumerate() {
            line.push_str("  ");
            line.push_str(&format!("{:>w$}", cell(&self.headers, i), w = w));
        }
        let _ = writeln!(out, "{}", line.trim_end());

        for (n, row) in self.rows.iter().enumerate() {
            let mut line = format!("{:<iw$}", n, iw = index_width);
            for (i, w) in widths.iter().enumerate() {
                line.push_str("  ");
                line.push_str(&format!("{:>w$}", cell(row, i), w = w));
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }
        out
    }
}
