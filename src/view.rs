//! Report view state that ignores responses to superseded queries.
//!
//! Every fetch is tagged with a [`Ticket`] carrying the query it was issued
//! for. A response is applied only while that query is still the current
//! one, and never over data from a later fetch, so a slow early request
//! cannot overwrite a fast later one.

use crate::api::{ReportQuery, Target};
use std::fmt::Display;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub target: Target,
    pub query: ReportQuery,
}

impl QueryKey {
    pub fn new(target: Target, query: ReportQuery) -> Self {
        Self { target, query }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    key: QueryKey,
}

impl Ticket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Ready(T),
    /// Inline error message; previous data is dropped.
    Failed(String),
}

#[derive(Debug)]
pub struct ReportView<T> {
    issued: u64,
    applied: u64,
    current: Option<QueryKey>,
    state: ViewState<T>,
}

impl<T> Default for ReportView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReportView<T> {
    pub fn new() -> Self {
        Self {
            issued: 0,
            applied: 0,
            current: None,
            state: ViewState::Idle,
        }
    }

    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn into_state(self) -> ViewState<T> {
        self.state
    }

    pub fn current_key(&self) -> Option<&QueryKey> {
        self.current.as_ref()
    }

    /// Makes `key` the current query and returns the ticket its fetch must
    /// resolve with.
    pub fn begin(&mut self, key: QueryKey) -> Ticket {
        self.issued += 1;
        self.current = Some(key.clone());
        self.state = ViewState::Loading;
        Ticket {
            generation: self.issued,
            key,
        }
    }

    /// Applies a fetch result. Returns `false` when the result was stale and
    /// dropped.
    pub fn resolve<E: Display>(&mut self, ticket: Ticket, result: Result<T, E>) -> bool {
        let current = self.current.as_ref() == Some(&ticket.key);
        if !current || ticket.generation <= self.applied {
            debug!(
                generation = ticket.generation,
                applied = self.applied,
                target = %ticket.key.target,
                "dropping stale response"
            );
            return false;
        }

        self.applied = ticket.generation;
        self.state = match result {
            Ok(data) => ViewState::Ready(data),
            Err(err) => ViewState::Failed(err.to_string()),
        };
        true
    }

    /// Issues and resolves one fetch in place.
    pub fn load<E, F>(&mut self, key: QueryKey, fetch: F) -> &ViewState<T>
    where
        E: Display,
        F: FnOnce(&QueryKey) -> Result<T, E>,
    {
        let ticket = self.begin(key);
        let result = fetch(ticket.key());
        self.resolve(ticket, result);
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StatementKind;

    fn key(search: &str) -> QueryKey {
        QueryKey::new(
            Target::Statement(StatementKind::Debtor, 1),
            ReportQuery {
                search: Some(search.to_string()),
                ..ReportQuery::default()
            },
        )
    }

    #[test]
    fn slow_early_response_does_not_overwrite_later_query() {
        let mut view: ReportView<&str> = ReportView::new();
        let early = view.begin(key("sam"));
        let late = view.begin(key("samsung"));

        assert!(view.resolve(late, Ok::<_, String>("samsung rows")));
        assert!(!view.resolve(early, Ok::<_, String>("sam rows")));
        assert_eq!(view.state(), &ViewState::Ready("samsung rows"));
    }

    #[test]
    fn response_for_a_superseded_query_is_dropped_while_loading() {
        let mut view: ReportView<u32> = ReportView::new();
        let first = view.begin(key("a"));
        let _second = view.begin(key("b"));
        assert!(!view.resolve(first, Ok::<_, String>(1)));
        assert_eq!(view.state(), &ViewState::Loading);
    }

    #[test]
    fn repeated_query_keeps_the_newest_data() {
        let mut view: ReportView<u32> = ReportView::new();
        let a1 = view.begin(key("a"));
        let _b = view.begin(key("b"));
        let a2 = view.begin(key("a"));

        assert!(view.resolve(a2, Ok::<_, String>(2)));
        // Same parameters, but older than what is already shown.
        assert!(!view.resolve(a1, Ok::<_, String>(1)));
        assert_eq!(view.state(), &ViewState::Ready(2));
    }

    #[test]
    fn failure_replaces_data_with_message() {
        let mut view: ReportView<u32> = ReportView::new();
        view.load(key("a"), |_| Ok::<_, String>(5));
        let state = view.load(key("b"), |_| Err::<u32, _>("Failed to fetch debtor statement"));
        assert_eq!(
            state,
            &ViewState::Failed("Failed to fetch debtor statement".to_string())
        );
    }

    #[test]
    fn load_passes_the_current_key_to_the_fetch() {
        let mut view: ReportView<String> = ReportView::new();
        view.load(key("redmi"), |k| {
            Ok::<_, String>(k.query.search.clone().unwrap_or_default())
        });
        assert_eq!(view.state(), &ViewState::Ready("redmi".to_string()));
        assert_eq!(view.current_key(), Some(&key("redmi")));
    }
}
