//! Invoice and report totals.

use crate::domain::{InvoiceLineItem, InvoiceTotals, ReportRow, ServerReportSummary};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::warn;

/// Half-up rounding to cents.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sums line items into invoice totals.
///
/// A server-billed `grand_total` is passed through verbatim; otherwise the
/// total is `subtotal - discount`.
pub fn aggregate(
    items: &[InvoiceLineItem],
    discount: Option<Decimal>,
    grand_total: Option<Decimal>,
) -> InvoiceTotals {
    let subtotal = round_currency(items.iter().map(InvoiceLineItem::line_total).sum());
    let discount = round_currency(discount.unwrap_or(Decimal::ZERO));
    let total = grand_total.unwrap_or(subtotal - discount);

    InvoiceTotals {
        item_count: items.len(),
        subtotal,
        discount,
        total,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub count: usize,
    pub quantity: Decimal,
    pub amount: Decimal,
}

/// Totals of a purchase or sales report.
///
/// When the server appended its own summary and it disagrees, the mismatch
/// is logged and the locally computed figures are returned.
pub fn report_totals(rows: &[ReportRow], server: Option<&ServerReportSummary>) -> ReportTotals {
    let totals = ReportTotals {
        count: rows.len(),
        quantity: rows.iter().map(|r| r.quantity).sum(),
        amount: round_currency(rows.iter().map(|r| r.total_price).sum()),
    };

    if let Some(s) = server {
        if round_currency(s.total) != totals.amount || s.count != totals.count as u64 {
            warn!(
                server_total = %s.total,
                server_count = s.count,
                local_total = %totals.amount,
                local_count = totals.count,
                "report summary differs from rows"
            );
        }
    }
    totals
}
