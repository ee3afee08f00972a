//! Renders projected ledgers, reports and invoices as tables, CSV or JSON.

use crate::api::ReportKind;
use crate::domain::{Invoice, InvoiceTotals, Party, ProjectedEntry, TransactionReport};
use crate::ledger::{
    BalanceSource, Ledger, MovementSummary, SignPolicy, StatementSummary,
};
use crate::normalize::Statement;
use crate::totals::{self, ReportTotals, round_currency};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV buffer: {0}")]
    Flush(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Tabular form shared by the table and CSV renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub summary: Vec<(String, String)>,
}

pub fn money(currency: &str, amount: Decimal) -> String {
    format!("{currency} {:.2}", round_currency(amount))
}

fn date_cell(entry_date: chrono::NaiveDateTime) -> String {
    entry_date.format("%Y-%m-%d").to_string()
}

fn or_dash(v: Option<&str>) -> String {
    v.unwrap_or("-").to_string()
}

#[derive(Debug, Serialize)]
pub struct StatementExport<'a> {
    pub party: &'a Party,
    pub source: BalanceSource,
    pub rows: Vec<ProjectedEntry<'a>>,
    pub summary: StatementSummary,
}

pub fn statement_export<'a, P>(
    statement: &'a Statement,
    policy: &P,
    source: BalanceSource,
) -> StatementExport<'a>
where
    P: SignPolicy + ?Sized,
{
    StatementExport {
        party: &statement.party,
        source,
        rows: statement.ledger.rows(policy, source),
        summary: statement.ledger.summary(policy),
    }
}

pub fn statement_sheet<P>(
    title: &str,
    statement: &Statement,
    policy: &P,
    source: BalanceSource,
    currency: &str,
) -> Sheet
where
    P: SignPolicy + ?Sized,
{
    let export = statement_export(statement, policy, source);
    let rows = export
        .rows
        .iter()
        .map(|r| {
            vec![
                date_cell(r.entry.date),
                r.entry.description.clone().unwrap_or_else(|| "N/A".to_string()),
                or_dash(r.entry.method.as_deref()),
                or_dash(r.entry.reference.as_deref()),
                money(currency, policy.delta(r.entry)),
                money(currency, r.balance_after),
            ]
        })
        .collect();

    let s = export.summary;
    let mut summary = vec![
        ("Transactions".to_string(), s.transactions.to_string()),
        ("Opening Balance".to_string(), money(currency, s.opening_balance)),
        ("Total Charged".to_string(), money(currency, s.total_charged)),
        ("Total Paid".to_string(), money(currency, s.total_paid)),
        ("Closing Balance".to_string(), money(currency, s.closing_balance)),
    ];
    if let Some(due) = statement.party.current_due {
        summary.push(("Current Due".to_string(), money(currency, due)));
    }

    let name = if statement.party.name.is_empty() {
        String::new()
    } else {
        format!(" - {}", statement.party.name)
    };
    Sheet {
        title: format!("{title}{name}"),
        headers: vec!["Date", "Description", "Method", "Cheque No.", "Amount", "Balance"],
        rows,
        summary,
    }
}

#[derive(Debug, Serialize)]
pub struct MovementExport<'a> {
    pub rows: Vec<ProjectedEntry<'a>>,
    pub summary: MovementSummary,
}

pub fn movement_export<'a, P>(ledger: &'a Ledger, policy: &P) -> MovementExport<'a>
where
    P: SignPolicy + ?Sized,
{
    MovementExport {
        rows: ledger.project(policy).collect(),
        summary: ledger.movement_summary(),
    }
}

pub fn movement_sheet<P>(title: &str, ledger: &Ledger, policy: &P) -> Sheet
where
    P: SignPolicy + ?Sized,
{
    let rows = ledger
        .project(policy)
        .map(|r| {
            vec![
                date_cell(r.entry.date),
                r.entry.label.clone(),
                or_dash(r.entry.description.as_deref()),
                r.entry.magnitude.normalize().to_string(),
                r.balance_after.normalize().to_string(),
            ]
        })
        .collect();
    let m = ledger.movement_summary();
    Sheet {
        title: title.to_string(),
        headers: vec!["Date", "Type", "Description", "Quantity", "Remaining"],
        rows,
        summary: vec![
            ("Opening".to_string(), m.opening.normalize().to_string()),
            ("Purchased".to_string(), m.purchased.normalize().to_string()),
            ("Sold".to_string(), m.sold.normalize().to_string()),
            ("Remaining".to_string(), m.remaining.normalize().to_string()),
        ],
    }
}

#[derive(Debug, Serialize)]
pub struct ReportExport<'a> {
    pub report: &'a TransactionReport,
    pub totals: ReportTotals,
}

pub fn report_export(report: &TransactionReport) -> ReportExport<'_> {
    ReportExport {
        report,
        totals: totals::report_totals(&report.rows, report.server_summary.as_ref()),
    }
}

pub fn report_sheet(kind: ReportKind, report: &TransactionReport, currency: &str) -> Sheet {
    let t = report_export(report).totals;
    let label = match kind {
        ReportKind::Purchase => "Purchase",
        ReportKind::Sales => "Sales",
    };
    Sheet {
        title: format!("{label} Report"),
        headers: vec!["Date", "Product", "Brand", "Quantity", "Unit Price", "Total Price"],
        rows: report
            .rows
            .iter()
            .map(|r| {
                vec![
                    date_cell(r.date),
                    r.product.clone(),
                    or_dash(r.brand.as_deref()),
                    r.quantity.normalize().to_string(),
                    money(currency, r.unit_price),
                    money(currency, r.total_price),
                ]
            })
            .collect(),
        summary: vec![
            (format!("Total {label}"), money(currency, t.amount)),
            ("Total Quantity".to_string(), t.quantity.normalize().to_string()),
            ("Total Transactions".to_string(), t.count.to_string()),
        ],
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceExport<'a> {
    pub invoice: &'a Invoice,
    pub totals: InvoiceTotals,
}

pub fn invoice_export(invoice: &Invoice) -> InvoiceExport<'_> {
    InvoiceExport {
        invoice,
        totals: totals::aggregate(&invoice.line_items, Some(invoice.discount), invoice.total_amount),
    }
}

pub fn invoice_sheet(invoice: &Invoice, currency: &str) -> Sheet {
    let t = invoice_export(invoice).totals;
    let mut title = format!("Receipt #{}", invoice.bill_no.as_deref().unwrap_or("N/A"));
    if let Some(name) = &invoice.enterprise.name {
        let _ = write!(title, " - {name}");
    }
    let _ = write!(title, " ({})", invoice.date.format("%d/%m/%Y %H:%M"));

    let mut summary = vec![
        ("Items".to_string(), t.item_count.to_string()),
        ("Subtotal".to_string(), money(currency, t.subtotal)),
    ];
    if t.discount > Decimal::ZERO {
        summary.push(("Discount".to_string(), money(currency, -t.discount)));
    }
    summary.push(("Total".to_string(), money(currency, t.total)));

    Sheet {
        title,
        headers: vec!["Item", "Qty", "Price", "Amount"],
        rows: invoice
            .line_items
            .iter()
            .map(|i| {
                vec![
                    i.name.clone(),
                    i.quantity.normalize().to_string(),
                    format!("{:.2}", round_currency(i.unit_price)),
                    format!("{:.2}", round_currency(i.line_total())),
                ]
            })
            .collect(),
        summary,
    }
}

/// Pipe-delimited table with a title line and a trailing summary block.
pub fn table(sheet: &Sheet) -> String {
    let mut out = String::new();
    if !sheet.title.is_empty() {
        let _ = writeln!(out, "{}", sheet.title);
    }
    if sheet.headers.is_empty() {
        out.push_str("(no columns)\n");
        return out;
    }

    let cols = sheet.headers.len();
    let mut widths: Vec<usize> = sheet.headers.iter().map(|h| h.chars().count()).collect();
    for row in &sheet.rows {
        for (i, cell) in row.iter().take(cols).enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
        out.push('|');
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(out, " {:width$} |", cell, width = *w);
        }
        out.push('\n');
    }

    let header_cells: Vec<String> = sheet.headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header_cells, &widths);
    out.push('|');
    for w in &widths {
        out.push_str(&"-".repeat(w + 2));
        out.push('|');
    }
    out.push('\n');
    if sheet.rows.is_empty() {
        out.push_str("(no transactions)\n");
    }
    for row in &sheet.rows {
        push_row(&mut out, row, &widths);
    }

    if !sheet.summary.is_empty() {
        out.push('\n');
        let width = sheet.summary.iter().map(|(l, _)| l.len()).max().unwrap_or(0) + 1;
        for (label, value) in &sheet.summary {
            let _ = writeln!(out, "{:width$}  {value}", format!("{label}:"));
        }
    }
    out
}

pub fn csv(sheet: &Sheet) -> Result<String, ExportError> {
    let mut w = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    w.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        w.write_record(row)?;
    }
    for (label, value) in &sheet.summary {
        w.write_record([label.as_str(), value.as_str()])?;
    }
    let bytes = w
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn json<T: Serialize>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}
