//! Running-balance projection over statement and stock-movement ledgers.
//!
//! A [`Ledger`] owns its entries sorted ascending by date. Projection is
//! read-only: the same ledger and policy always produce the same balances,
//! whichever end the caller walks from.

use crate::domain::{EntryKind, LedgerEntry, ProjectedEntry};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::iter::FusedIterator;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn apply(self, magnitude: Decimal) -> Decimal {
        match self {
            Sign::Plus => magnitude,
            Sign::Minus => -magnitude,
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Sign::Plus => Sign::Minus,
            Sign::Minus => Sign::Plus,
        }
    }
}

/// Decides whether an entry raises or lowers the running balance.
pub trait SignPolicy {
    fn sign(&self, entry: &LedgerEntry) -> Sign;

    fn delta(&self, entry: &LedgerEntry) -> Decimal {
        self.sign(entry).apply(entry.magnitude)
    }
}

impl<F> SignPolicy for F
where
    F: Fn(&LedgerEntry) -> Sign,
{
    fn sign(&self, entry: &LedgerEntry) -> Sign {
        self(entry)
    }
}

/// Stock on hand: purchases add, sales and sale returns subtract.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryMovement;

impl SignPolicy for InventoryMovement {
    fn sign(&self, entry: &LedgerEntry) -> Sign {
        match entry.kind {
            EntryKind::Debit => Sign::Plus,
            EntryKind::Credit => Sign::Minus,
        }
    }
}

/// Outstanding due of a debtor, EMI debtor or vendor: charges add, payments
/// subtract.
///
/// Fed through [`EntryKind::from_signed_due`] this is
/// `due[i] = due[i - 1] - amount[i]` over the raw signed amounts.
///
/// Debit adds, same as [`InventoryMovement`]. It stays a separate type so a
/// statement call site names the due convention rather than the stock one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DueLedger;

impl SignPolicy for DueLedger {
    fn sign(&self, entry: &LedgerEntry) -> Sign {
        InventoryMovement.sign(entry)
    }
}

/// Opposite convention of the wrapped policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reversed<P>(pub P);

impl<P: SignPolicy> SignPolicy for Reversed<P> {
    fn sign(&self, entry: &LedgerEntry) -> Sign {
        self.0.sign(entry).flip()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("anchor index {index} is outside a ledger of {len} entries")]
    AnchorOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSide {
    /// Balance standing before the entry is applied (`previous_due`).
    BeforeEntry,
    /// Balance standing after the entry is applied (`current_due`).
    AfterEntry,
}

/// A balance known at one entry, identified by its position in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub index: usize,
    pub balance: Decimal,
    pub side: AnchorSide,
}

impl Anchor {
    pub fn previous_due(balance: Decimal) -> Self {
        Self {
            index: 0,
            balance,
            side: AnchorSide::BeforeEntry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSource {
    Projected,
    Reported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    pub transactions: usize,
    pub opening_balance: Decimal,
    pub total_charged: Decimal,
    pub total_paid: Decimal,
    pub closing_balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MovementSummary {
    pub opening: Decimal,
    pub purchased: Decimal,
    pub sold: Decimal,
    pub remaining: Decimal,
}

/// Entry where the server's balance disagrees with the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    pub position: usize,
    pub date: NaiveDateTime,
    pub reported: Decimal,
    pub projected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ledger {
    opening_balance: Decimal,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Builds a ledger that starts at `opening_balance`.
    ///
    /// Entries are stable-sorted by date; input order only breaks ties.
    pub fn new(opening_balance: Decimal, entries: Vec<LedgerEntry>) -> Self {
        let (entries, _) = sort_by_date(entries);
        Self {
            opening_balance,
            entries,
        }
    }

    /// Builds a ledger whose opening balance is solved from `anchor`, so that
    /// projecting with `policy` reproduces the anchor balance at its entry.
    pub fn anchored<P>(
        entries: Vec<LedgerEntry>,
        anchor: Anchor,
        policy: &P,
    ) -> Result<Self, ProjectionError>
    where
        P: SignPolicy + ?Sized,
    {
        if entries.is_empty() {
            if anchor.index == 0 && anchor.side == AnchorSide::BeforeEntry {
                return Ok(Self::new(anchor.balance, entries));
            }
            return Err(ProjectionError::AnchorOutOfRange {
                index: anchor.index,
                len: 0,
            });
        }
        if anchor.index >= entries.len() {
            return Err(ProjectionError::AnchorOutOfRange {
                index: anchor.index,
                len: entries.len(),
            });
        }

        let (entries, positions) = sort_by_date(entries);
        let at = positions[anchor.index];
        let upto = match anchor.side {
            AnchorSide::BeforeEntry => at,
            AnchorSide::AfterEntry => at + 1,
        };
        let applied: Decimal = entries[..upto].iter().map(|e| policy.delta(e)).sum();

        Ok(Self {
            opening_balance: anchor.balance - applied,
            entries,
        })
    }

    pub fn opening_balance(&self) -> Decimal {
        self.opening_balance
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn project<'a, 'p, P>(&'a self, policy: &'p P) -> Projection<'a, 'p, P>
    where
        P: SignPolicy + ?Sized,
    {
        Projection {
            entries: &self.entries,
            policy,
            front: 0,
            back: self.entries.len(),
            front_balance: self.opening_balance,
            back_balance: None,
        }
    }

    pub fn closing_balance<P>(&self, policy: &P) -> Decimal
    where
        P: SignPolicy + ?Sized,
    {
        self.entries
            .iter()
            .fold(self.opening_balance, |acc, e| acc + policy.delta(e))
    }

    pub fn summary<P>(&self, policy: &P) -> StatementSummary
    where
        P: SignPolicy + ?Sized,
    {
        let mut total_charged = Decimal::ZERO;
        let mut total_paid = Decimal::ZERO;
        for e in &self.entries {
            match policy.sign(e) {
                Sign::Plus => total_charged += e.magnitude,
                Sign::Minus => total_paid += e.magnitude,
            }
        }
        StatementSummary {
            transactions: self.entries.len(),
            opening_balance: self.opening_balance,
            total_charged,
            total_paid,
            closing_balance: self.opening_balance + total_charged - total_paid,
        }
    }

    /// Stock movement figures under [`InventoryMovement`].
    pub fn movement_summary(&self) -> MovementSummary {
        let s = self.summary(&InventoryMovement);
        MovementSummary {
            opening: s.opening_balance,
            purchased: s.total_charged,
            sold: s.total_paid,
            remaining: s.closing_balance,
        }
    }

    /// True when every entry carries a server-computed balance.
    pub fn has_reported_balances(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.reported_balance.is_some())
    }

    pub fn preferred_source(&self) -> BalanceSource {
        if self.has_reported_balances() {
            BalanceSource::Reported
        } else {
            BalanceSource::Projected
        }
    }

    pub fn reported_drift<P>(&self, policy: &P) -> Vec<BalanceDrift>
    where
        P: SignPolicy + ?Sized,
    {
        self.project(policy)
            .enumerate()
            .filter_map(|(position, row)| {
                let reported = row.entry.reported_balance?;
                (reported != row.balance_after).then_some(BalanceDrift {
                    position,
                    date: row.entry.date,
                    reported,
                    projected: row.balance_after,
                })
            })
            .collect()
    }

    /// Rows for display and export.
    ///
    /// With [`BalanceSource::Reported`], entries that carry a server balance
    /// show it verbatim and the rest fall back to the projection.
    pub fn rows<P>(&self, policy: &P, source: BalanceSource) -> Vec<ProjectedEntry<'_>>
    where
        P: SignPolicy + ?Sized,
    {
        match source {
            BalanceSource::Projected => self.project(policy).collect(),
            BalanceSource::Reported => {
                let drift = self.reported_drift(policy);
                if let Some(first) = drift.first() {
                    warn!(
                        entries = drift.len(),
                        date = %first.date,
                        reported = %first.reported,
                        projected = %first.projected,
                        "server balance differs from local projection"
                    );
                }
                self.project(policy)
                    .map(|row| ProjectedEntry {
                        balance_after: row.entry.reported_balance.unwrap_or(row.balance_after),
                        entry: row.entry,
                    })
                    .collect()
            }
        }
    }
}

/// Lazy running-balance walk over a [`Ledger`].
///
/// Walking from the back yields the same balances as walking from the front.
pub struct Projection<'a, 'p, P: ?Sized> {
    entries: &'a [LedgerEntry],
    policy: &'p P,
    front: usize,
    back: usize,
    /// Balance before `entries[front]`.
    front_balance: Decimal,
    /// Balance after `entries[back - 1]`, filled on the first backward step.
    back_balance: Option<Decimal>,
}

impl<P: ?Sized> Clone for Projection<'_, '_, P> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries,
            policy: self.policy,
            front: self.front,
            back: self.back,
            front_balance: self.front_balance,
            back_balance: self.back_balance,
        }
    }
}

impl<'a, P> Iterator for Projection<'a, '_, P>
where
    P: SignPolicy + ?Sized,
{
    type Item = ProjectedEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let entry = &self.entries[self.front];
        self.front_balance += self.policy.delta(entry);
        self.front += 1;
        Some(ProjectedEntry {
            entry,
            balance_after: self.front_balance,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<P> DoubleEndedIterator for Projection<'_, '_, P>
where
    P: SignPolicy + ?Sized,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let after = match self.back_balance {
            Some(b) => b,
            None => self.entries[self.front..self.back]
                .iter()
                .fold(self.front_balance, |acc, e| acc + self.policy.delta(e)),
        };
        self.back -= 1;
        let entry = &self.entries[self.back];
        self.back_balance = Some(after - self.policy.delta(entry));
        Some(ProjectedEntry {
            entry,
            balance_after: after,
        })
    }
}

impl<P> ExactSizeIterator for Projection<'_, '_, P> where P: SignPolicy + ?Sized {}

impl<P> FusedIterator for Projection<'_, '_, P> where P: SignPolicy + ?Sized {}

/// Stable sort by date. Returns the sorted entries and, for each input
/// position, where that entry ended up.
fn sort_by_date(entries: Vec<LedgerEntry>) -> (Vec<LedgerEntry>, Vec<usize>) {
    let mut indexed: Vec<(usize, LedgerEntry)> = entries.into_iter().enumerate().collect();
    if !indexed.windows(2).all(|w| w[0].1.date <= w[1].1.date) {
        debug!(entries = indexed.len(), "ledger input out of date order; sorting");
        indexed.sort_by_key(|(_, e)| e.date);
    }

    let mut positions = vec![0; indexed.len()];
    for (sorted_at, (input_at, _)) in indexed.iter().enumerate() {
        positions[*input_at] = sorted_at;
    }
    (indexed.into_iter().map(|(_, e)| e).collect(), positions)
}
