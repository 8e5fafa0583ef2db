use std::collections::VecDeque;

use crate::model::WeatherSnapshot;

pub const HISTORY_CAPACITY: usize = 5;

/// Distinct past successful queries, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: VecDeque<String>,
}

impl History {
    /// Move `query` to the front, dropping any older copy and anything past capacity.
    pub fn record(&mut self, query: &str) {
        self.entries.retain(|entry| entry != query);
        self.entries.push_front(query.to_string());
        self.entries.truncate(HISTORY_CAPACITY);
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

/// The failure currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Sequence number of the request that failed.
    pub id: u64,
    pub query: String,
    pub message: String,
}

/// Everything a view needs to render. Replaced wholesale on every transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Query of the last successful fetch.
    pub query: String,
    pub result: Option<WeatherSnapshot>,
    pub error: Option<ErrorInfo>,
    pub in_flight: bool,
    /// Query of the outstanding request, while `in_flight`.
    pub pending_query: Option<String>,
    pub history: History,
    pub(crate) latest_request: u64,
    pub(crate) initialized: bool,
}
