//! Shared state for a coordinator run
//!
//! Contains the request/response schemas, the per-run `AgentState` record
//! with its write-once merge logic, and the in-memory trace store used by
//! the trace-retrieval endpoint.

pub mod schemas;
pub mod trace_store;

pub use schemas::{
    AgentFragment, AgentState, BudgetBreakdown, BudgetLine, Category, CollisionSuggestion,
    CrowdPreference, ErrorEntry, Experience, ItineraryRequest, ItineraryResponse,
    NarrativeFragment, TraceEntry, TraceStatus, UserInputs,
};
pub use trace_store::TraceStore;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Application-wide state shared across HTTP handlers
///
/// Each itinerary run owns its own `AgentState`; only the finished trace is
/// retained here so the trace endpoint can serve it afterwards.
#[derive(Debug, Default)]
pub struct AppState {
    /// Completed run traces, keyed by session id
    pub traces: TraceStore,
}

impl AppState {
    /// Create a fresh application state
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shared handle to the application state
pub type SharedState = Arc<RwLock<AppState>>;
