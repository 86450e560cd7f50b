//! Table formatting for CLI list commands
//!
//! List commands build a [`RowSet`] and hand it to [`print_rows`]; single
//! results and nested views go through [`print_serialized`].

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use std::io::Write;

use crate::cli::OutputFormat;

/// Header plus string rows; the first column is the record ID
#[derive(Debug, Default)]
pub struct RowSet {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Print rows in a tabular format; `Auto` means TSV
///
/// Returns false for JSON/YAML so the caller serializes the typed values
/// instead of the flattened strings.
pub fn print_rows(format: OutputFormat, set: &RowSet) -> Result<bool> {
    match format {
        OutputFormat::Auto | OutputFormat::Tsv => {
            let header: Vec<String> = set
                .headers
                .iter()
                .map(|h| style(h.to_uppercase()).bold().to_string())
                .collect();
            println!("{}", header.join("\t"));
            for row in &set.rows {
                println!("{}", row.join("\t"));
            }
        }
        OutputFormat::Csv => write_csv(std::io::stdout().lock(), set)?,
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(set.headers.iter().map(|h| h.to_string()));
            for row in &set.rows {
                builder.push_record(row.iter().cloned());
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Id => {
            for row in &set.rows {
                if let Some(id) = row.first() {
                    println!("{}", id);
                }
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => return Ok(false),
    }
    Ok(true)
}

/// Write the header and rows as RFC 4180 CSV
pub fn write_csv<W: Write>(out: W, set: &RowSet) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&set.headers).into_diagnostic()?;
    for row in &set.rows {
        writer.write_record(row).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;
    Ok(())
}

/// Print a value as JSON or YAML (YAML for `Auto` and tabular formats)
pub fn print_serialized<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
        _ => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

/// Rows when the format is tabular, typed values otherwise
pub fn print_list<T: Serialize>(format: OutputFormat, set: &RowSet, values: &[T]) -> Result<()> {
    if !print_rows(format, set)? {
        print_serialized(format, values)?;
    }
    Ok(())
}
