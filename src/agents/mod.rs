//! Generation agents
//!
//! The five generation steps, each a pure function from a restricted view of
//! the shared state to a typed output fragment. Agents never mutate state;
//! they build a prompt, call the generation service, and parse the response
//! into their fragment type. Every failure mode is converted into an
//! `AgentError` at this boundary.

pub mod budget;
pub mod community;
pub mod cultural_context;
pub mod discovery;
pub mod plot_builder;

pub use budget::run_budget;
pub use community::run_community;
pub use cultural_context::run_cultural_context;
pub use discovery::run_discovery;
pub use plot_builder::run_plot_builder;

use crate::gemini::GenerationError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// The five generation agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentName {
    /// Finds experiences from the query and source URLs
    Discovery,
    /// Adds localization and insider knowledge per experience
    CulturalContext,
    /// Solo-sure filtering and social scaffolding cues
    Community,
    /// Weaves experiences into a narrative itinerary
    PlotBuilder,
    /// Cost breakdown and deals
    Budget,
}

impl AgentName {
    /// Name used in trace and error log entries
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Discovery => "discovery",
            AgentName::CulturalContext => "cultural_context",
            AgentName::Community => "community",
            AgentName::PlotBuilder => "plot_builder",
            AgentName::Budget => "budget",
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an agent call failed
#[derive(Error, Debug)]
pub enum AgentFailure {
    /// The bounded call did not resolve in time
    #[error("call timed out after {0}s")]
    Timeout(u64),

    /// The generation service returned an error
    #[error("generation service error: {0}")]
    Service(#[from] GenerationError),

    /// The response could not be parsed as the expected schema
    #[error("unparseable response: {0}")]
    Parse(String),

    /// Parsing succeeded but no record survived validation
    #[error("no valid records after filtering")]
    NoValidRecords,
}

/// A failed agent call
///
/// Carries everything the coordinator needs for the error log: which agent,
/// why, and when. Never propagated past the coordinator.
#[derive(Debug)]
pub struct AgentError {
    /// Agent that failed
    pub agent: AgentName,
    /// Failure reason
    pub reason: AgentFailure,
    /// When the failure occurred
    pub timestamp: DateTime<Utc>,
}

impl AgentError {
    /// Wrap a failure reason with the failing agent and the current time
    pub fn new(agent: AgentName, reason: AgentFailure) -> Self {
        Self {
            agent,
            reason,
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.agent, self.reason)
    }
}

/// Strip a markdown code fence from a model response
///
/// Models occasionally wrap JSON in ```json fences despite being told not
/// to; parse the payload inside rather than failing the step.
pub fn strip_markdown_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Parse a model response as a JSON object
pub(crate) fn parse_json_object(agent: AgentName, text: &str) -> Result<Value, AgentError> {
    let cleaned = strip_markdown_json(text);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| AgentError::new(agent, AgentFailure::Parse(e.to_string())))?;
    if !value.is_object() {
        return Err(AgentError::new(
            agent,
            AgentFailure::Parse("expected a JSON object at the top level".to_string()),
        ));
    }
    Ok(value)
}
