//! In-memory retention of completed run traces
//!
//! The coordinator's trace output is structured enough to persist verbatim;
//! this store is the minimal collaborator behind the trace-retrieval
//! endpoint. Bounded so a long-lived server does not grow without limit.

use crate::state::schemas::TraceEntry;
use std::collections::{HashMap, VecDeque};

/// How many completed sessions to retain before evicting the oldest
const MAX_SESSIONS: usize = 100;

/// Bounded map of session id -> finished trace log
#[derive(Debug, Default)]
pub struct TraceStore {
    traces: HashMap<String, Vec<TraceEntry>>,
    // Insertion order, oldest first
    order: VecDeque<String>,
}

impl TraceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the trace of a completed run
    pub fn insert(&mut self, session_id: String, trace: Vec<TraceEntry>) {
        if self.traces.insert(session_id.clone(), trace).is_none() {
            self.order.push_back(session_id);
        }
        while self.order.len() > MAX_SESSIONS {
            if let Some(oldest) = self.order.pop_front() {
                self.traces.remove(&oldest);
                tracing::debug!(session_id = %oldest, "Evicted oldest trace from store");
            }
        }
    }

    /// Look up the trace for a session
    pub fn get(&self, session_id: &str) -> Option<&Vec<TraceEntry>> {
        self.traces.get(session_id)
    }

    /// Number of retained sessions
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}
