//! HTTP API handlers
//!
//! Thin layer over the coordinator: request validation happens here, before
//! the coordinator is invoked; the coordinator itself assumes a valid
//! request and never fails past its boundary.

pub mod itinerary;

pub use itinerary::{generate_itinerary, get_agent_trace};

use crate::coordinator::Coordinator;
use crate::state::SharedState;
use std::sync::Arc;

/// Everything the handlers need, cloned per request
#[derive(Clone)]
pub struct ApiContext {
    /// The workflow driver (stateless across runs)
    pub coordinator: Arc<Coordinator>,
    /// Shared application state (trace retention)
    pub state: SharedState,
}
