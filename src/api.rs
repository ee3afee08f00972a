//! Blocking client for the retail REST API's report endpoints.

use crate::domain::{Invoice, TransactionReport};
use crate::ledger::{DueLedger, Ledger};
use crate::normalize::{self, NormalizeError, Statement};
use chrono::NaiveDate;
use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::Value;
use std::fmt;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API url: {0}")]
    InvalidUrl(String),

    #[error("not signed in or token expired")]
    Unauthorized,

    #[error("this account may not view {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Normalize(#[from] NormalizeError),
}

/// Filters shared by every report endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
}

impl ReportQuery {
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(s) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            out.push(("search", s.to_string()));
        }
        if let Some(d) = self.start_date {
            out.push(("start_date", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.end_date {
            out.push(("end_date", d.format("%Y-%m-%d").to_string()));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Debtor,
    EmiDebtor,
    Vendor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Purchase,
    Sales,
}

/// A report endpoint together with the record it is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Statement(StatementKind, u64),
    ProductReport(u64),
    BranchReport(ReportKind, u32),
    Invoice(u64),
    EnterpriseInfo,
}

impl Target {
    pub fn path(&self) -> String {
        match self {
            Target::Statement(StatementKind::Debtor, id) => {
                format!("alltransaction/debtor/statement/{id}/")
            }
            Target::Statement(StatementKind::EmiDebtor, id) => {
                format!("transaction/emidebtor/statement/{id}/")
            }
            Target::Statement(StatementKind::Vendor, id) => {
                format!("alltransaction/vendor/statement/{id}/")
            }
            Target::ProductReport(id) => format!("allinventory/report/product/{id}/"),
            Target::BranchReport(ReportKind::Purchase, branch) => {
                format!("alltransaction/purchase-report/branch/{branch}/")
            }
            Target::BranchReport(ReportKind::Sales, branch) => {
                format!("alltransaction/sales-report/branch/{branch}/")
            }
            Target::Invoice(id) => format!("alltransaction/salestransaction/{id}/"),
            Target::EnterpriseInfo => "enterprise/info/".to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Statement(StatementKind::Debtor, id) => write!(f, "debtor statement {id}"),
            Target::Statement(StatementKind::EmiDebtor, id) => {
                write!(f, "EMI debtor statement {id}")
            }
            Target::Statement(StatementKind::Vendor, id) => write!(f, "vendor statement {id}"),
            Target::ProductReport(id) => write!(f, "product report {id}"),
            Target::BranchReport(ReportKind::Purchase, b) => write!(f, "purchase report (branch {b})"),
            Target::BranchReport(ReportKind::Sales, b) => write!(f, "sales report (branch {b})"),
            Target::Invoice(id) => write!(f, "invoice {id}"),
            Target::EnterpriseInfo => write!(f, "enterprise info"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url =
            Url::parse(&raw).map_err(|err| ApiError::InvalidUrl(format!("{base_url}: {err}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tillbook/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, target: &Target, query: &ReportQuery) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(&target.path())
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// Raw JSON body of a report endpoint. No retry.
    pub fn get_json(&self, target: &Target, query: &ReportQuery) -> Result<Value, ApiError> {
        let url = self.url_for(target, query)?;
        let request_id = Uuid::new_v4();
        let span = info_span!("api_get", %request_id, path = %url.path());
        let _guard = span.enter();

        let mut req = self
            .http
            .get(url.clone())
            .header("Accept", "application/json")
            .header("X-Request-Id", request_id.to_string());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        debug!(%url, "requesting");
        let resp = req.send()?;
        let status = resp.status();
        if status.is_success() {
            let body = resp.json::<Value>()?;
            debug!(status = status.as_u16(), "received");
            return Ok(body);
        }

        let text = resp.text().unwrap_or_default();
        warn!(status = status.as_u16(), "request failed");
        Err(match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(target.to_string()),
            404 => ApiError::NotFound(target.to_string()),
            code => ApiError::Server {
                status: code,
                message: error_message(&text),
            },
        })
    }

    /// Statement of a debtor, EMI debtor or vendor, projected as a due
    /// ledger (charges raise the due, payments lower it).
    pub fn statement(
        &self,
        kind: StatementKind,
        id: u64,
        query: &ReportQuery,
    ) -> Result<Statement, ApiError> {
        let body = self.get_json(&Target::Statement(kind, id), query)?;
        Ok(normalize::statement(&body, &DueLedger)?)
    }

    pub fn product_report(&self, product_id: u64, query: &ReportQuery) -> Result<Ledger, ApiError> {
        let body = self.get_json(&Target::ProductReport(product_id), query)?;
        Ok(normalize::product_movements(&body)?)
    }

    pub fn branch_report(
        &self,
        kind: ReportKind,
        branch: u32,
        query: &ReportQuery,
    ) -> Result<TransactionReport, ApiError> {
        let body = self.get_json(&Target::BranchReport(kind, branch), query)?;
        Ok(normalize::transaction_report(&body)?)
    }

    /// Invoice with its enterprise header.
    ///
    /// Enterprise info is fetched alongside the invoice and only used to
    /// fill fields the invoice lacks; its failure is not an error.
    pub fn invoice(&self, sale_id: u64) -> Result<Invoice, ApiError> {
        let none = ReportQuery::default();
        let (invoice, info) = thread::scope(|s| {
            let info = s.spawn(|| self.get_json(&Target::EnterpriseInfo, &none));
            let invoice = self.get_json(&Target::Invoice(sale_id), &none);
            (invoice, info.join())
        });

        let mut invoice = normalize::invoice(&invoice?)?;
        if !invoice.enterprise.is_complete() {
            match info {
                Ok(Ok(body)) => invoice.enterprise.fill_from(normalize::enterprise(&body)),
                Ok(Err(err)) => debug!(%err, "enterprise info unavailable"),
                Err(_) => debug!("enterprise info fetch panicked"),
            }
        }
        Ok(invoice)
    }
}

/// Best readable message out of an error body (`{"detail": ...}` or
/// `{"error": ...}`), else the raw text.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("detail").or_else(|| v.get("error")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "unknown error".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}
