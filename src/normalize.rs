//! Turns loosely shaped API responses into the typed records the ledger and
//! totals code work on.
//!
//! Numbers are read leniently: JSON numbers, numeric strings and `null` are
//! all accepted, and anything unreadable counts as zero. A readable number
//! larger than [`MAX_FIGURE`] is rejected, so sums and products of normalized
//! figures cannot overflow. Dates are strict, since ordering depends on them.

use crate::domain::{
    EntryKind, Enterprise, Invoice, InvoiceLineItem, LedgerEntry, Party, ReportRow,
    ServerReportSummary, TransactionReport,
};
use crate::ledger::{Anchor, Ledger, ProjectionError, SignPolicy};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const AMOUNT_KEYS: &[&str] = &["amount", "totalAmount", "total_amount"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty"];
const TYPE_KEYS: &[&str] = &["type", "transaction_type"];
const DESCRIPTION_KEYS: &[&str] = &["desc", "description", "note"];
const PRODUCT_KEYS: &[&str] = &["product_name", "phone_name", "product", "name"];

/// Largest magnitude accepted for an amount, quantity or line total.
pub const MAX_FIGURE: i64 = 1_000_000_000_000;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("record {index}: missing or unreadable date {raw:?}")]
    BadDate { index: usize, raw: String },

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("{key} {raw} is out of range")]
    OutOfRange { key: String, raw: String },

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub party: Party,
    pub ledger: Ledger,
}

fn parse_number(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

/// First non-null value under any of `keys`, with the key it was found under.
fn keyed_field<'a, 'k>(obj: &'a Value, keys: &[&'k str]) -> Option<(&'k str, &'a Value)> {
    keys.iter()
        .filter_map(|k| obj.get(*k).map(|v| (*k, v)))
        .find(|(_, v)| !v.is_null())
}

fn field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keyed_field(obj, keys).map(|(_, v)| v)
}

fn bounded(key: &str, value: Decimal) -> Result<Decimal, NormalizeError> {
    if value.abs() > Decimal::from(MAX_FIGURE) {
        return Err(NormalizeError::OutOfRange {
            key: key.to_string(),
            raw: value.to_string(),
        });
    }
    Ok(value)
}

/// Readable figure under any of `keys`. Numbers too large even for
/// `Decimal` are out of range rather than unreadable.
fn opt_decimal_field(obj: &Value, keys: &[&str]) -> Result<Option<Decimal>, NormalizeError> {
    let Some((key, value)) = keyed_field(obj, keys) else {
        return Ok(None);
    };
    match parse_number(value) {
        Some(d) => bounded(key, d).map(Some),
        None => {
            let raw = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.trim().to_string(),
                _ => return Ok(None),
            };
            match raw.parse::<f64>() {
                Ok(f) if !f.is_nan() => Err(NormalizeError::OutOfRange {
                    key: key.to_string(),
                    raw,
                }),
                _ => Ok(None),
            }
        }
    }
}

fn decimal_field(obj: &Value, keys: &[&str]) -> Result<Decimal, NormalizeError> {
    Ok(opt_decimal_field(obj, keys)?.unwrap_or(Decimal::ZERO))
}

fn text_field(obj: &Value, keys: &[&str]) -> Option<String> {
    let s = match field(obj, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Accepts `YYYY-MM-DD`, naive ISO timestamps and RFC 3339.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_local())
}

fn date_field(obj: &Value, index: usize) -> Result<NaiveDateTime, NormalizeError> {
    let raw = text_field(obj, &["date"]).unwrap_or_default();
    parse_date(&raw).ok_or(NormalizeError::BadDate { index, raw })
}

fn records<'a>(value: Option<&'a Value>, what: &str) -> Result<&'a [Value], NormalizeError> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(NormalizeError::Shape(format!(
            "{what} should be a list, got {}",
            kind_name(other)
        ))),
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Key of an object whose name ends with `suffix` (`debtor_transactions`).
fn suffixed<'a>(body: &'a Value, suffix: &str) -> Option<&'a Value> {
    body.as_object()?
        .iter()
        .find(|(k, _)| k.ends_with(suffix))
        .map(|(_, v)| v)
}

fn party(data: Option<&Value>) -> Result<Party, NormalizeError> {
    let Some(d) = data else {
        return Ok(Party::default());
    };
    Ok(Party {
        name: text_field(d, &["name"]).unwrap_or_default(),
        phone: text_field(d, &["phone_number", "phone"]),
        brand: text_field(d, &["brand_name", "brand"]),
        current_due: opt_decimal_field(d, &["due", "balance"])?,
    })
}

/// `detail` text of an error body the server sent with a success status.
fn detail_suffix(body: &Value) -> String {
    body.get("detail")
        .and_then(Value::as_str)
        .map(|d| format!(" (server said: {d})"))
        .unwrap_or_default()
}

fn statement_entry(record: &Value, index: usize) -> Result<LedgerEntry, NormalizeError> {
    let amount = decimal_field(record, AMOUNT_KEYS)?;
    let kind = EntryKind::from_signed_due(amount);
    Ok(LedgerEntry {
        date: date_field(record, index)?,
        kind,
        label: match kind {
            EntryKind::Credit => "payment".to_string(),
            EntryKind::Debit => "charge".to_string(),
        },
        magnitude: amount.abs(),
        description: text_field(record, DESCRIPTION_KEYS),
        method: text_field(record, &["method"]),
        reference: text_field(record, &["cheque_number", "bill_no"]),
        reported_balance: opt_decimal_field(record, &["due", "balance"])?,
    })
}

/// Debtor, EMI debtor or vendor statement.
///
/// The opening due is solved from the first record that carries a
/// `previous_due`, else taken from a top-level `opening_due`, else zero.
pub fn statement<P>(body: &Value, policy: &P) -> Result<Statement, NormalizeError>
where
    P: SignPolicy + ?Sized,
{
    let (party_data, rows) = match body {
        Value::Array(_) => (None, Some(body)),
        Value::Object(map) => (
            suffixed(body, "_data"),
            map.get("transactions")
                .or_else(|| suffixed(body, "_transactions")),
        ),
        other => {
            return Err(NormalizeError::Shape(format!(
                "statement should be an object or list, got {}",
                kind_name(other)
            )));
        }
    };

    let Some(rows) = rows else {
        return Err(NormalizeError::Shape(format!(
            "statement has no transactions list{}",
            detail_suffix(body)
        )));
    };
    let rows = records(Some(rows), "statement transactions")?;
    let entries = rows
        .iter()
        .enumerate()
        .map(|(i, r)| statement_entry(r, i))
        .collect::<Result<Vec<_>, _>>()?;

    let mut anchor = None;
    for (i, r) in rows.iter().enumerate() {
        if let Some(previous_due) = opt_decimal_field(r, &["previous_due"])? {
            anchor = Some((i, previous_due));
            break;
        }
    }
    let ledger = match anchor {
        Some((index, previous_due)) => {
            debug!(index, %previous_due, "anchoring statement on previous_due");
            let anchor = Anchor {
                index,
                ..Anchor::previous_due(previous_due)
            };
            Ledger::anchored(entries, anchor, policy)?
        }
        None => Ledger::new(
            decimal_field(body, &["opening_due", "opening_balance"])?,
            entries,
        ),
    };

    Ok(Statement {
        party: party(party_data)?,
        ledger,
    })
}

fn movement_entry(
    record: &Value,
    index: usize,
    forced_label: Option<&str>,
) -> Result<LedgerEntry, NormalizeError> {
    let label = forced_label
        .map(str::to_string)
        .or_else(|| text_field(record, TYPE_KEYS))
        .unwrap_or_else(|| "sales".to_string());
    Ok(LedgerEntry {
        date: date_field(record, index)?,
        kind: EntryKind::from_movement_label(&label),
        label,
        magnitude: decimal_field(record, QUANTITY_KEYS)?.abs(),
        description: text_field(record, DESCRIPTION_KEYS),
        method: None,
        reference: text_field(record, &["bill_no"]),
        reported_balance: None,
    })
}

/// Product movement report: either a combined `transactions` list tagged by
/// `type`, or separate `purchases` and `sales` lists.
pub fn product_movements(body: &Value) -> Result<Ledger, NormalizeError> {
    if !body.is_object() {
        return Err(NormalizeError::Shape(format!(
            "product report should be an object, got {}",
            kind_name(body)
        )));
    }
    if ["transactions", "purchases", "sales"]
        .iter()
        .all(|k| body.get(*k).is_none())
    {
        return Err(NormalizeError::Shape(format!(
            "product report has no transactions, purchases or sales list{}",
            detail_suffix(body)
        )));
    }
    let opening = decimal_field(body, &["opening_quantity"])?;

    let entries = if let Some(combined) = body.get("transactions") {
        records(Some(combined), "transactions")?
            .iter()
            .enumerate()
            .map(|(i, r)| movement_entry(r, i, None))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        let purchases = records(body.get("purchases"), "purchases")?;
        let sales = records(body.get("sales"), "sales")?;
        purchases
            .iter()
            .map(|r| (r, "purchase"))
            .chain(sales.iter().map(|r| (r, "sales")))
            .enumerate()
            .map(|(i, (r, label))| movement_entry(r, i, Some(label)))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Ledger::new(opening, entries))
}

/// Quantity of a record, or 1 when the record does not track quantity.
fn quantity_or_one(record: &Value) -> Result<Decimal, NormalizeError> {
    match field(record, QUANTITY_KEYS) {
        None => Ok(Decimal::ONE),
        Some(_) => decimal_field(record, QUANTITY_KEYS),
    }
}

/// `quantity * unit_price`, held to the same bound as its factors.
fn line_total(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, NormalizeError> {
    let total = quantity
        .checked_mul(unit_price)
        .ok_or_else(|| NormalizeError::OutOfRange {
            key: "line total".to_string(),
            raw: format!("{quantity} x {unit_price}"),
        })?;
    bounded("line total", total)
}

fn is_summary(record: &Value) -> bool {
    record.is_object()
        && record.get("date").is_none()
        && ["total_sales", "total_purchases", "count"]
            .iter()
            .any(|k| record.get(*k).is_some())
}

/// Purchase or sales report. The server appends a summary object after the
/// rows; it is split off into [`TransactionReport::server_summary`].
pub fn transaction_report(body: &Value) -> Result<TransactionReport, NormalizeError> {
    let all = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => records(body.get("results"), "report results")?,
        other => {
            return Err(NormalizeError::Shape(format!(
                "report should be a list, got {}",
                kind_name(other)
            )));
        }
    };

    let (rows, summary) = match all.split_last() {
        Some((last, rest)) if is_summary(last) => (rest, Some(last)),
        _ => (all, None),
    };

    let rows = rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let quantity = quantity_or_one(r)?;
            let unit_price = decimal_field(r, &["unit_price", "price"])?;
            let total_price = match opt_decimal_field(r, &["total_price"])? {
                Some(total) => total,
                None => line_total(quantity, unit_price)?,
            };
            Ok(ReportRow {
                date: date_field(r, i)?,
                product: text_field(r, PRODUCT_KEYS).unwrap_or_else(|| "Unknown".to_string()),
                brand: text_field(r, &["brand", "brand_name"]),
                quantity,
                unit_price,
                total_price,
            })
        })
        .collect::<Result<Vec<_>, NormalizeError>>()?;

    let server_summary = summary
        .map(|s| -> Result<_, NormalizeError> {
            Ok(ServerReportSummary {
                total: decimal_field(s, &["total_sales", "total_purchases", "total"])?,
                count: decimal_field(s, &["count"])?.to_u64().unwrap_or(0),
            })
        })
        .transpose()?;

    Ok(TransactionReport {
        rows,
        server_summary,
    })
}

pub fn enterprise(body: &Value) -> Enterprise {
    Enterprise {
        name: text_field(body, &["enterprise_name", "name"]),
        address: text_field(body, &["enterprise_address", "address"]),
        contact: text_field(body, &["enterprise_contact", "contact"]),
    }
}

/// Sales transaction rendered as an invoice.
pub fn invoice(body: &Value) -> Result<Invoice, NormalizeError> {
    if !body.is_object() {
        return Err(NormalizeError::Shape(format!(
            "invoice should be an object, got {}",
            kind_name(body)
        )));
    }

    let items = field(body, &["sales", "items", "purchase"]);
    let line_items = records(items, "invoice items")?
        .iter()
        .map(|r| {
            let quantity = quantity_or_one(r)?;
            let unit_price = decimal_field(r, &["unit_price", "price"])?;
            line_total(quantity, unit_price)?;
            Ok(InvoiceLineItem::new(
                text_field(r, PRODUCT_KEYS).unwrap_or_else(|| "Unknown Item".to_string()),
                quantity,
                unit_price,
            ))
        })
        .collect::<Result<Vec<_>, NormalizeError>>()?;

    Ok(Invoice {
        bill_no: text_field(body, &["bill_no"]),
        date: date_field(body, 0)?,
        customer: text_field(body, &["customer_name", "customer"]),
        line_items,
        discount: decimal_field(body, &["discount"])?,
        total_amount: opt_decimal_field(body, &["total_amount"])?,
        enterprise: Enterprise {
            name: text_field(body, &["enterprise_name"]),
            address: text_field(body, &["enterprise_address"]),
            contact: text_field(body, &["enterprise_contact"]),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DueLedger, InventoryMovement};
    use crate::totals::aggregate;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn numbers_are_read_leniently() {
        let read = |v: Value| decimal_field(&json!({ "v": v }), &["v"]).expect("in range");
        assert_eq!(read(json!(12)), dec!(12));
        assert_eq!(read(json!(12.5)), dec!(12.5));
        assert_eq!(read(json!("500.00")), dec!(500));
        assert_eq!(read(json!(" 7 ")), dec!(7));
        assert_eq!(read(json!("1.5e3")), dec!(1500));
        assert_eq!(read(json!("abc")), Decimal::ZERO);
        assert_eq!(read(json!("NaN")), Decimal::ZERO);
        assert_eq!(read(json!(null)), Decimal::ZERO);
        assert_eq!(read(json!(true)), Decimal::ZERO);
        assert_eq!(decimal_field(&json!({}), &["v"]).expect("missing"), Decimal::ZERO);
    }

    #[test]
    fn dates_in_every_api_shape() {
        let midnight = NaiveDate::from_ymd_opt(2025, 2, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        assert_eq!(parse_date("2025-02-01"), Some(midnight));
        assert_eq!(parse_date("2025-02-01T00:00:00"), Some(midnight));
        assert_eq!(parse_date("2025-02-01T00:00:00.000"), Some(midnight));
        assert_eq!(parse_date("2025-02-01T00:00:00+05:45"), Some(midnight));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn debtor_statement_with_previous_due() {
        let body = json!({
            "debtor_data": {"name": "Ram", "phone_number": "9800000000", "due": 120},
            "debtor_transactions": [
                {"id": 1, "date": "2025-01-01", "amount": -50, "desc": "Phone on credit",
                 "method": "credit", "previous_due": 100},
                {"id": 2, "date": "2025-01-05", "amount": "30", "method": "cheque",
                 "cheque_number": "CHQ-9"}
            ]
        });
        let s = statement(&body, &DueLedger).expect("statement");
        assert_eq!(s.party.name, "Ram");
        assert_eq!(s.party.current_due, Some(dec!(120)));
        let due: Vec<_> = s.ledger.project(&DueLedger).map(|r| r.balance_after).collect();
        assert_eq!(due, vec![dec!(150), dec!(120)]);
        assert_eq!(s.ledger.entries()[1].reference.as_deref(), Some("CHQ-9"));
        assert_eq!(s.ledger.entries()[0].label, "charge");
    }

    #[test]
    fn previous_due_on_a_later_listed_record_still_anchors() {
        let body = json!({"vendor_transactions": [
            {"date": "2025-01-09", "amount": 25},
            {"date": "2025-01-02", "amount": -40, "previous_due": 60}
        ]});
        let s = statement(&body, &DueLedger).expect("statement");
        assert_eq!(s.ledger.opening_balance(), dec!(60));
        assert_eq!(s.ledger.closing_balance(&DueLedger), dec!(75));
    }

    #[test]
    fn statement_accepts_total_amount_alias_and_bare_list() {
        let body = json!([
            {"date": "2025-01-01", "totalAmount": -10},
            {"date": "2025-01-02", "totalAmount": 4}
        ]);
        let s = statement(&body, &DueLedger).expect("statement");
        assert_eq!(s.ledger.closing_balance(&DueLedger), dec!(6));
    }

    #[test]
    fn statement_missing_date_is_an_error() {
        let body = json!({"transactions": [{"amount": 5}]});
        match statement(&body, &DueLedger) {
            Err(NormalizeError::BadDate { index: 0, .. }) => {}
            other => panic!("expected BadDate, got {other:?}"),
        }
    }

    #[test]
    fn product_report_combined_list() {
        let body = json!({
            "opening_quantity": 10,
            "transactions": [
                {"date": "2025-01-02", "type": "sales", "quantity": 3},
                {"date": "2025-01-01", "transaction_type": "purchase", "qty": "5"}
            ]
        });
        let ledger = product_movements(&body).expect("report");
        let remaining: Vec<_> = ledger
            .project(&InventoryMovement)
            .map(|r| r.balance_after)
            .collect();
        assert_eq!(remaining, vec![dec!(15), dec!(12)]);
    }

    #[test]
    fn product_report_split_lists() {
        let body = json!({
            "purchases": [{"date": "2025-01-01", "quantity": 4}],
            "sales": [{"date": "2025-01-03", "quantity": 1}]
        });
        let ledger = product_movements(&body).expect("report");
        assert_eq!(ledger.movement_summary().remaining, dec!(3));
        assert_eq!(ledger.entries()[0].label, "purchase");
    }

    #[test]
    fn purchase_report_trailing_summary_is_split_off() {
        let body = json!([
            {"date": "2025-01-01", "product": "A15", "brand": "Samsung",
             "quantity": 2, "unit_price": "100.00", "total_price": "200.00"},
            {"date": "2025-01-02", "product_name": "Redmi 13", "unit_price": 90},
            {"total_sales": 290, "count": 2}
        ]);
        let report = transaction_report(&body).expect("report");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].quantity, dec!(1));
        assert_eq!(report.rows[1].total_price, dec!(90));
        assert_eq!(
            report.server_summary,
            Some(ServerReportSummary {
                total: dec!(290),
                count: 2
            })
        );
    }

    #[test]
    fn invoice_missing_unit_price_is_zero() {
        let body = json!({
            "bill_no": 42,
            "date": "2025-03-01",
            "discount": null,
            "sales": [
                {"product_name": "A15", "quantity": 2, "unit_price": 500},
                {"product_name": "Case", "quantity": 1}
            ]
        });
        let inv = invoice(&body).expect("invoice");
        assert_eq!(inv.bill_no.as_deref(), Some("42"));
        assert_eq!(inv.line_items[1].unit_price, Decimal::ZERO);
        let t = aggregate(&inv.line_items, Some(inv.discount), inv.total_amount);
        assert_eq!(t.subtotal, dec!(1000));
        assert_eq!(t.total, dec!(1000));
    }

    #[test]
    fn imei_items_default_to_one_unit() {
        let body = json!({
            "date": "2025-03-01T12:30:00Z",
            "total_amount": "999.00",
            "sales": [{"phone_name": "Galaxy S24", "imei_number": "3519", "unit_price": "1000"}]
        });
        let inv = invoice(&body).expect("invoice");
        assert_eq!(inv.line_items[0].name, "Galaxy S24");
        assert_eq!(inv.line_items[0].quantity, dec!(1));
        assert_eq!(inv.total_amount, Some(dec!(999)));
    }

    #[test]
    fn enterprise_info_fields() {
        let e = enterprise(&json!({"name": "Digitech", "address": "Basundhara", "contact": ""}));
        assert_eq!(e.name.as_deref(), Some("Digitech"));
        assert_eq!(e.contact, None);
    }

    fn assert_out_of_range<T: std::fmt::Debug>(result: Result<T, NormalizeError>) {
        match result {
            Err(NormalizeError::OutOfRange { .. }) => {}
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn oversized_invoice_line_is_rejected() {
        assert_out_of_range(invoice(&json!({
            "date": "2025-01-01",
            "sales": [{"quantity": "1e20", "unit_price": "1e20"}]
        })));
        // Each factor fits, the product does not.
        assert_out_of_range(invoice(&json!({
            "date": "2025-01-01",
            "sales": [{"quantity": 2_000_000, "unit_price": 1_000_000}]
        })));
        assert_out_of_range(invoice(&json!({
            "date": "2025-01-01",
            "discount": "1e30",
            "sales": []
        })));
    }

    #[test]
    fn oversized_report_row_is_rejected() {
        assert_out_of_range(transaction_report(&json!([
            {"date": "2025-01-01", "quantity": "1e20", "unit_price": "1e20"}
        ])));
        assert_out_of_range(transaction_report(&json!([
            {"date": "2025-01-01", "quantity": 1, "unit_price": 1, "total_price": 1e40}
        ])));
    }

    #[test]
    fn oversized_statement_and_movement_figures_are_rejected() {
        assert_out_of_range(statement(
            &json!({"transactions": [{"date": "2025-01-01", "amount": "-1e25"}]}),
            &DueLedger,
        ));
        assert_out_of_range(statement(
            &json!({"transactions": [
                {"date": "2025-01-01", "amount": 5, "previous_due": "9e99"}
            ]}),
            &DueLedger,
        ));
        assert_out_of_range(product_movements(&json!({
            "opening_quantity": 1,
            "transactions": [{"date": "2025-01-01", "type": "purchase", "qty": "1e13"}]
        })));
    }

    #[test]
    fn figures_at_the_bound_are_accepted() {
        let inv = invoice(&json!({
            "date": "2025-01-01",
            "sales": [{"quantity": 1, "unit_price": MAX_FIGURE}]
        }))
        .expect("invoice");
        let t = aggregate(&inv.line_items, Some(inv.discount), inv.total_amount);
        assert_eq!(t.total, Decimal::from(MAX_FIGURE));
    }

    #[test]
    fn statement_body_without_transactions_is_a_shape_error() {
        let body = json!({"detail": "Debtor not in this branch"});
        match statement(&body, &DueLedger) {
            Err(NormalizeError::Shape(msg)) => assert!(msg.contains("Debtor not in this branch")),
            other => panic!("expected Shape, got {other:?}"),
        }
        // An explicit empty list is a real, empty statement.
        let s = statement(&json!({"debtor_transactions": []}), &DueLedger).expect("statement");
        assert!(s.ledger.is_empty());
    }

    #[test]
    fn product_report_without_movement_lists_is_a_shape_error() {
        match product_movements(&json!({"opening_quantity": 4})) {
            Err(NormalizeError::Shape(_)) => {}
            other => panic!("expected Shape, got {other:?}"),
        }
        let ledger = product_movements(&json!({"opening_quantity": 4, "sales": []}))
            .expect("report");
        assert_eq!(ledger.movement_summary().remaining, dec!(4));
    }
}
