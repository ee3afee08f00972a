//! `ApiClient` against a throwaway local HTTP server.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tillbook::DueLedger;
use tillbook::api::{ApiClient, ApiError, ReportKind, ReportQuery, StatementKind};

struct Route {
    path_prefix: &'static str,
    status: u16,
    body: String,
}

fn route(path_prefix: &'static str, status: u16, body: serde_json::Value) -> Route {
    Route {
        path_prefix,
        status,
        body: body.to_string(),
    }
}

/// Serves `connections` requests, answering each from the first route whose
/// prefix matches the request path. Returns the raw request heads.
fn serve(routes: Vec<Route>, connections: usize) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}/api/", listener.local_addr().expect("addr"));

    let handle = thread::spawn(move || {
        let mut heads = Vec::new();
        for _ in 0..connections {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).expect("read");
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let head = String::from_utf8_lossy(&buf).to_string();
            let path = head.split_whitespace().nth(1).unwrap_or("").to_string();

            let (status, body) = routes
                .iter()
                .find(|r| path.starts_with(r.path_prefix))
                .map(|r| (r.status, r.body.as_str()))
                .unwrap_or((404, r#"{"detail":"no route"}"#));
            let reason = match status {
                200 => "OK",
                401 => "Unauthorized",
                404 => "Not Found",
                _ => "Error",
            };
            let resp = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).expect("write");
            heads.push(head);
        }
        heads
    });
    (base, handle)
}

fn client(base: &str, token: Option<&str>) -> ApiClient {
    ApiClient::new(base, token.map(str::to_string), Duration::from_secs(5)).expect("client")
}

#[test]
fn statement_request_carries_filters_and_token() {
    let (base, server) = serve(
        vec![route(
            "/api/alltransaction/debtor/statement/1/",
            200,
            json!({
                "debtor_data": {"name": "Ram"},
                "debtor_transactions": [
                    {"date": "2025-01-01", "amount": -50, "previous_due": 100},
                    {"date": "2025-01-05", "amount": 30}
                ]
            }),
        )],
        1,
    );

    let query = ReportQuery {
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
        end_date: None,
        search: Some("ram".into()),
    };
    let statement = client(&base, Some("tok-123"))
        .statement(StatementKind::Debtor, 1, &query)
        .expect("statement");

    let heads = server.join().expect("server thread");
    let head = &heads[0];
    assert!(head.starts_with(
        "GET /api/alltransaction/debtor/statement/1/?search=ram&start_date=2025-01-01 HTTP/1.1"
    ));
    assert!(head.to_ascii_lowercase().contains("authorization: bearer tok-123"));
    assert!(head.to_ascii_lowercase().contains("x-request-id: "));

    assert_eq!(statement.party.name, "Ram");
    let due: Vec<Decimal> = statement
        .ledger
        .project(&DueLedger)
        .map(|r| r.balance_after)
        .collect();
    assert_eq!(due, vec![Decimal::from(150), Decimal::from(120)]);
}

#[test]
fn status_codes_map_to_errors() {
    let (base, server) = serve(
        vec![
            route("/api/allinventory/", 404, json!({"detail": "Not found."})),
            route("/api/alltransaction/vendor/", 401, json!({"detail": "expired"})),
            route(
                "/api/alltransaction/sales-report/",
                500,
                json!({"detail": "Branch closed"}),
            ),
        ],
        3,
    );
    let c = client(&base, None);
    let none = ReportQuery::default();

    match c.product_report(9, &none) {
        Err(ApiError::NotFound(what)) => assert_eq!(what, "product report 9"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(
        c.statement(StatementKind::Vendor, 2, &none),
        Err(ApiError::Unauthorized)
    ));
    match c.branch_report(ReportKind::Sales, 3, &none) {
        Err(ApiError::Server { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Branch closed");
        }
        other => panic!("expected Server error, got {other:?}"),
    }
    server.join().expect("server thread");
}

#[test]
fn malformed_body_is_a_normalize_error() {
    let (base, server) = serve(
        vec![route("/api/alltransaction/purchase-report/", 200, json!("oops"))],
        1,
    );
    let err = client(&base, None)
        .branch_report(ReportKind::Purchase, 1, &ReportQuery::default())
        .unwrap_err();
    assert!(matches!(err, ApiError::Normalize(_)));
    server.join().expect("server thread");
}

#[test]
fn invoice_fills_enterprise_header_from_info_endpoint() {
    let (base, server) = serve(
        vec![
            route(
                "/api/alltransaction/salestransaction/77/",
                200,
                json!({
                    "bill_no": "B-77",
                    "date": "2025-03-10",
                    "enterprise_name": "Everest Mobiles",
                    "discount": "10",
                    "sales": [{"product_name": "Charger", "quantity": 2, "unit_price": 250}]
                }),
            ),
            route(
                "/api/enterprise/info/",
                200,
                json!({"name": "Everest HQ", "address": "New Road", "contact": "01-4220000"}),
            ),
        ],
        2,
    );

    let invoice = client(&base, None).invoice(77).expect("invoice");
    server.join().expect("server thread");

    assert_eq!(invoice.enterprise.name.as_deref(), Some("Everest Mobiles"));
    assert_eq!(invoice.enterprise.address.as_deref(), Some("New Road"));
    assert_eq!(invoice.enterprise.contact.as_deref(), Some("01-4220000"));
    let totals = tillbook::aggregate(&invoice.line_items, Some(invoice.discount), invoice.total_amount);
    assert_eq!(totals.total, Decimal::from(490));
}

#[test]
fn invoice_survives_missing_enterprise_info() {
    let (base, server) = serve(
        vec![route(
            "/api/alltransaction/salestransaction/5/",
            200,
            json!({"date": "2025-03-10", "sales": []}),
        )],
        2,
    );

    let invoice = client(&base, None).invoice(5).expect("invoice");
    server.join().expect("server thread");
    assert!(invoice.line_items.is_empty());
    assert_eq!(invoice.enterprise.address, None);
}
