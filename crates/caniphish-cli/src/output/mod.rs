//! Terminal rendering of scan results.
//!
//! [`Renderer`] writes three tables to whatever sink it is given: stdout in
//! the binary, a `Vec<u8>` in tests.

mod persist;

pub use persist::{persist, to_pretty_json};

use caniphish::ScanResult;
use colored::Colorize;
use std::io::{self, Write};
use tabled::{settings::Style, Table, Tabled};

/// Code shown when the scan reports no sender issues
pub const NO_ISSUES_CODE: &str = "0";
/// Title shown when the scan reports no sender issues
pub const NO_ISSUES_TITLE: &str = "No issues found!";
/// Separator between MX hosts in the raw records table
pub const MX_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct SenderRow {
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ReceiverRow {
    #[tabled(rename = "Technology")]
    pub technology: String,
    #[tabled(rename = "Service")]
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct RecordsRow {
    #[tabled(rename = "SPF", display_with = "display_record")]
    pub spf: Option<String>,
    #[tabled(rename = "DMARC", display_with = "display_record")]
    pub dmarc: Option<String>,
    #[tabled(rename = "MX")]
    pub mx: String,
}

fn display_record(record: &Option<String>) -> String {
    record
        .clone()
        .unwrap_or_else(|| "None".red().to_string())
}

/// Rows of the "Mail Sender Issues" table
pub fn sender_rows(result: &ScanResult) -> Vec<SenderRow> {
    let rows: Vec<SenderRow> = result
        .sender_issues()
        .into_iter()
        .map(|issue| SenderRow {
            code: issue.code,
            title: issue.title,
            severity: issue.severity,
        })
        .collect();

    if rows.is_empty() {
        vec![SenderRow {
            code: NO_ISSUES_CODE.to_string(),
            title: NO_ISSUES_TITLE.to_string(),
            severity: "N/A".to_string(),
        }]
    } else {
        rows
    }
}

/// Rows of the "Mail Receiver Stack" table
pub fn receiver_rows(result: &ScanResult) -> Vec<ReceiverRow> {
    result
        .receiver_stack()
        .into_iter()
        .map(|detail| ReceiverRow {
            technology: detail.technology,
            service: detail.technology_type,
        })
        .collect()
}

/// The single row of the "Raw Records" table
pub fn records_row(result: &ScanResult) -> RecordsRow {
    RecordsRow {
        spf: result.spf_record(),
        dmarc: result.dmarc_record(),
        mx: result.mx_records().join(MX_SEPARATOR),
    }
}

/// Writes scan results as tables to an output sink.
pub struct Renderer<W: Write> {
    out: W,
}

impl Renderer<io::Stdout> {
    /// Renderer writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Renderer<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Give back the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render all three tables for `domain`
    pub fn render(&mut self, result: &ScanResult, domain: &str) -> io::Result<()> {
        self.section(
            &format!("Mail Sender Issues - {domain}"),
            Table::new(sender_rows(result)),
        )?;
        writeln!(self.out)?;

        self.section(
            &format!("Mail Receiver Stack - {domain}"),
            Table::new(receiver_rows(result)),
        )?;
        writeln!(self.out)?;

        self.section("Raw Records", Table::new([records_row(result)]))?;
        self.out.flush()
    }

    fn section(&mut self, title: &str, mut table: Table) -> io::Result<()> {
        table.with(Style::rounded());
        writeln!(self.out, "{}", title.bold())?;
        writeln!(self.out, "{table}")
    }
}
