//! Client-side computations for the retail inventory API: running balances
//! over statements and stock movements, invoice and report totals, and the
//! query layer that fetches them.

pub mod api;
pub mod config;
pub mod domain;
pub mod export;
pub mod ledger;
pub mod normalize;
pub mod totals;
pub mod view;

pub use domain::{
    EntryKind, Invoice, InvoiceLineItem, InvoiceTotals, LedgerEntry, Party, ProjectedEntry,
};
pub use ledger::{
    Anchor, AnchorSide, BalanceSource, DueLedger, InventoryMovement, Ledger, Projection, Reversed,
    Sign, SignPolicy,
};
pub use totals::aggregate;
