use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Accounting side of a movement. Which side raises the running balance is
/// decided by a [`crate::ledger::SignPolicy`], not by the kind itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Debit,
    Credit,
}

impl EntryKind {
    /// Maps the labels the API uses for stock movements.
    ///
    /// `purchase` brings stock in; everything else (`sales`, `sale`,
    /// `sales-return`, ...) takes it out.
    pub fn from_movement_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "purchase" | "purchases" => EntryKind::Debit,
            _ => EntryKind::Credit,
        }
    }

    /// Maps a signed statement amount: positive is a payment, zero or
    /// negative is a new charge.
    pub fn from_signed_due(amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            EntryKind::Credit
        } else {
            EntryKind::Debit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDateTime,
    pub kind: EntryKind,
    /// Domain label the kind was derived from (`purchase`, `payment`, ...).
    pub label: String,
    /// Always non-negative.
    pub magnitude: Decimal,
    pub description: Option<String>,
    pub method: Option<String>,
    /// Cheque number or bill number.
    pub reference: Option<String>,
    /// Balance the server already computed for this row, if it sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_balance: Option<Decimal>,
}

impl LedgerEntry {
    pub fn new(date: NaiveDateTime, kind: EntryKind, magnitude: Decimal) -> Self {
        Self {
            date,
            kind,
            label: match kind {
                EntryKind::Debit => "debit".to_string(),
                EntryKind::Credit => "credit".to_string(),
            },
            magnitude: magnitude.abs(),
            description: None,
            method: None,
            reference: None,
            reported_balance: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ledger entry together with the running balance after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedEntry<'a> {
    #[serde(flatten)]
    pub entry: &'a LedgerEntry,
    pub balance_after: Decimal,
}

/// Header data shown above a debtor, EMI debtor or vendor statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub phone: Option<String>,
    pub brand: Option<String>,
    pub current_due: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl InvoiceLineItem {
    pub fn new(name: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub item_count: usize,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enterprise {
    pub name: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

impl Enterprise {
    pub fn is_complete(&self) -> bool {
        self.address.is_some() && self.contact.is_some()
    }

    /// Fills fields missing here from `other`; present fields win.
    pub fn fill_from(&mut self, other: Enterprise) {
        if self.name.is_none() {
            self.name = other.name;
        }
        if self.address.is_none() {
            self.address = other.address;
        }
        if self.contact.is_none() {
            self.contact = other.contact;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub bill_no: Option<String>,
    pub date: NaiveDateTime,
    pub customer: Option<String>,
    pub line_items: Vec<InvoiceLineItem>,
    pub discount: Decimal,
    /// Grand total as billed by the server.
    pub total_amount: Option<Decimal>,
    pub enterprise: Enterprise,
}

/// One row of a purchase or sales report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub date: NaiveDateTime,
    pub product: String,
    pub brand: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Summary object the server appends after the report rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerReportSummary {
    pub total: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReport {
    pub rows: Vec<ReportRow>,
    pub server_summary: Option<ServerReportSummary>,
}
