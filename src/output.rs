//! Report rendering
//!
//! Text and CSV show sizes in thousands of storage units, the way the
//! report has always been read. JSON keeps the raw server values.

use crate::report::AccountReport;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}' (expected text, csv or json)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

/// Write `reports` in the given format.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_report<W: Write>(
    writer: W,
    format: OutputFormat,
    reports: &[AccountReport],
) -> io::Result<()> {
    match format {
        OutputFormat::Text => write_text(writer, reports),
        OutputFormat::Csv => write_csv(writer, reports),
        OutputFormat::Json => write_json(writer, reports),
    }
}

fn info(report: &AccountReport) -> &'static str {
    if report.is_warning() { "Warning" } else { "" }
}

fn write_text<W: Write>(mut writer: W, reports: &[AccountReport]) -> io::Result<()> {
    let title_width = reports.iter().map(|r| r.title.chars().count()).max().unwrap_or(0);
    let user_width = reports
        .iter()
        .map(|r| r.username.chars().count())
        .max()
        .unwrap_or(0);

    for report in reports {
        let line = match &report.outcome {
            Ok(usage) => format!(
                "{:<title_width$}  {:<user_width$}  {:>5} / {:<5}  {:>5.2}% {}",
                report.title,
                report.username,
                usage.used / 1000,
                usage.total / 1000,
                usage.percent_or_zero(),
                info(report),
            ),
            Err(e) => format!(
                "{:<title_width$}  {:<user_width$}  ERROR: {e}",
                report.title, report.username,
            ),
        };
        writeln!(writer, "{}", line.trim_end())?;
    }
    writer.flush()
}

fn write_csv<W: Write>(writer: W, reports: &[AccountReport]) -> io::Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(writer);

    csv.write_record([
        "Title",
        "Username",
        "Used space",
        "Total space",
        "User percent",
        "Info",
    ])?;

    for report in reports {
        match &report.outcome {
            Ok(usage) => {
                let used = (usage.used / 1000).to_string();
                let total = (usage.total / 1000).to_string();
                let percent = format!("{:.2}", usage.percent_or_zero());
                csv.write_record([
                    report.title.as_str(),
                    report.username.as_str(),
                    used.as_str(),
                    total.as_str(),
                    percent.as_str(),
                    info(report),
                ])?;
            }
            Err(e) => {
                let error = format!("Error: {e}");
                csv.write_record([
                    report.title.as_str(),
                    report.username.as_str(),
                    "",
                    "",
                    "",
                    error.as_str(),
                ])?;
            }
        }
    }
    csv.flush()
}

#[derive(Serialize)]
struct JsonRow<'a> {
    title: &'a str,
    username: &'a str,
    used: Option<u64>,
    total: Option<u64>,
    percent: Option<f64>,
    warning: bool,
    error: Option<String>,
}

impl<'a> From<&'a AccountReport> for JsonRow<'a> {
    fn from(report: &'a AccountReport) -> Self {
        let usage = report.outcome.as_ref().ok();
        Self {
            title: &report.title,
            username: &report.username,
            used: usage.map(|u| u.used),
            total: usage.map(|u| u.total),
            percent: report.percent(),
            warning: report.is_warning(),
            error: report.outcome.as_ref().err().map(ToString::to_string),
        }
    }
}

fn write_json<W: Write>(mut writer: W, reports: &[AccountReport]) -> io::Result<()> {
    let rows: Vec<JsonRow<'_>> = reports.iter().map(JsonRow::from).collect();
    serde_json::to_writer_pretty(&mut writer, &rows)?;
    writeln!(writer)?;
    writer.flush()
}
