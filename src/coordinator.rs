//! Coordinator
//!
//! Owns the execution plan — a small fixed DAG, not a general scheduler —
//! and the merge/finalize logic:
//!
//! 1. Stage 1: Discovery alone (everything downstream needs its output)
//! 2. Stage 2: Cultural-Context + Community + Budget concurrently
//! 3. Stage 3: Plot-Builder over the fully merged state
//! 4. Finalize: terminal trace entry, convert state to the response
//!
//! Stage boundaries are total barriers: the `tokio::join!` waits for all
//! Stage-2 tasks to resolve before Stage 3 starts. Within a stage no
//! ordering is required because each agent writes a disjoint state field.
//!
//! No agent failure aborts the run. Every failure is caught here, recorded
//! in the error log and trace, and the run always reaches finalize.

use crate::agents::{
    run_budget, run_community, run_cultural_context, run_discovery, run_plot_builder, AgentError,
    AgentFailure, AgentName,
};
use crate::config::AgentModelConfigs;
use crate::gemini::GenerationService;
use crate::state::{
    AgentFragment, AgentState, ItineraryRequest, ItineraryResponse, TraceEntry, TraceStatus,
    UserInputs,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Trace label for run-level entries
const COORDINATOR: &str = "coordinator";

/// Drives the five agents through the fixed execution plan
pub struct Coordinator {
    service: Arc<dyn GenerationService>,
    models: AgentModelConfigs,
    agent_timeout: Duration,
}

/// A resolved agent call with its timing
struct StepOutcome<T> {
    result: Result<T, AgentError>,
    ended_at: DateTime<Utc>,
    duration: Duration,
}

impl Coordinator {
    /// Create a coordinator with an injected service and model configuration
    pub fn new(
        service: Arc<dyn GenerationService>,
        models: AgentModelConfigs,
        agent_timeout: Duration,
    ) -> Self {
        Self {
            service,
            models,
            agent_timeout,
        }
    }

    /// Execute the full workflow for one validated request
    ///
    /// Infallible at this boundary: the caller always receives a response,
    /// differing only in which optional fields are populated. Dropping the
    /// returned future cancels any in-flight agent calls cooperatively.
    pub async fn run(&self, request: &ItineraryRequest) -> ItineraryResponse {
        let inputs = UserInputs::from(request);
        let mut state = AgentState::new(inputs);

        let run_start = Instant::now();
        state.agent_trace.push(TraceEntry {
            agent: COORDINATOR.to_string(),
            status: TraceStatus::Started,
            timestamp: Utc::now(),
            duration_ms: None,
            metric: Some(json!({
                "query": state.inputs.query,
                "city": state.inputs.city,
            })),
        });

        tracing::info!(
            session_id = %state.session_id,
            query = %state.inputs.query,
            city = %state.inputs.city,
            "Starting itinerary workflow"
        );

        // ── Stage 1: Discovery ─────────────────────────────
        state
            .agent_trace
            .push(TraceEntry::started(AgentName::Discovery.as_str(), Utc::now()));
        let outcome = self
            .bounded(
                AgentName::Discovery,
                run_discovery(self.service.as_ref(), &self.models.discovery, &state.inputs),
            )
            .await;
        let experiences = record_outcome(&mut state, AgentName::Discovery, outcome, |exps| {
            json!({"experiences_found": exps.len()})
        })
        .unwrap_or_default();
        // A failed Discovery still merges an empty list so downstream
        // agents run against a written (if empty) field
        state.merge_fragment(AgentFragment::Discovery(experiences));

        // ── Stage 2: Cultural Context + Community + Budget ─
        // Mutually independent given Discovery's output; run concurrently
        // over a read-only view and merge disjoint fields afterwards
        for agent in [
            AgentName::CulturalContext,
            AgentName::Community,
            AgentName::Budget,
        ] {
            state
                .agent_trace
                .push(TraceEntry::started(agent.as_str(), Utc::now()));
        }

        let (cultural_outcome, community_outcome, budget_outcome) = {
            let inputs = &state.inputs;
            let experiences = &state.discovered_experiences;
            tokio::join!(
                self.bounded(
                    AgentName::CulturalContext,
                    run_cultural_context(
                        self.service.as_ref(),
                        &self.models.cultural_context,
                        inputs,
                        experiences,
                    ),
                ),
                self.bounded(
                    AgentName::Community,
                    run_community(
                        self.service.as_ref(),
                        &self.models.community,
                        inputs,
                        experiences,
                    ),
                ),
                self.bounded(
                    AgentName::Budget,
                    run_budget(
                        self.service.as_ref(),
                        &self.models.budget,
                        inputs,
                        experiences,
                    ),
                ),
            )
        };

        // Merge order across these three does not matter: disjoint fields
        if let Some(context) =
            record_outcome(&mut state, AgentName::CulturalContext, cultural_outcome, |c| {
                json!({"experiences_annotated": c.len()})
            })
        {
            state.merge_fragment(AgentFragment::CulturalContext(context));
        }
        if let Some(scaffolding) =
            record_outcome(&mut state, AgentName::Community, community_outcome, |s| {
                json!({"experiences_analyzed": s.len()})
            })
        {
            state.merge_fragment(AgentFragment::Community(scaffolding));
        }
        if let Some(breakdown) =
            record_outcome(&mut state, AgentName::Budget, budget_outcome, |b| {
                json!({
                    "total_estimate": b.total_estimate,
                    "within_budget": b.within_budget,
                })
            })
        {
            state.merge_fragment(AgentFragment::Budget(breakdown));
        }

        // ── Stage 3: Plot-Builder ──────────────────────────
        state.agent_trace.push(TraceEntry::started(
            AgentName::PlotBuilder.as_str(),
            Utc::now(),
        ));
        let outcome = self
            .bounded(
                AgentName::PlotBuilder,
                run_plot_builder(
                    self.service.as_ref(),
                    &self.models.plot_builder,
                    &state.inputs,
                    &state.discovered_experiences,
                    &state.cultural_context,
                    &state.social_scaffolding,
                ),
            )
            .await;
        if let Some(narrative) =
            record_outcome(&mut state, AgentName::PlotBuilder, outcome, |n| {
                json!({
                    "narrative_length": n.narrative_itinerary.len(),
                    "has_collision": n.collision_suggestion.is_some(),
                })
            })
        {
            state.merge_fragment(AgentFragment::PlotBuilder(narrative));
        }

        // ── Finalize ───────────────────────────────────────
        let agents_succeeded = state
            .agent_trace
            .iter()
            .filter(|t| t.status == TraceStatus::Success)
            .count();
        let agents_failed = state
            .agent_trace
            .iter()
            .filter(|t| t.status == TraceStatus::Error)
            .count();
        let total_latency = run_start.elapsed();

        state.agent_trace.push(TraceEntry::finished(
            COORDINATOR,
            TraceStatus::Completed,
            Utc::now(),
            total_latency.as_millis() as u64,
            Some(json!({
                "agents_succeeded": agents_succeeded,
                "agents_failed": agents_failed,
                "total_latency_ms": total_latency.as_millis() as u64,
            })),
        ));

        tracing::info!(
            session_id = %state.session_id,
            agents_succeeded = agents_succeeded,
            agents_failed = agents_failed,
            total_latency_ms = total_latency.as_millis() as u64,
            "Itinerary workflow completed"
        );

        state.into_response()
    }

    /// Bound an agent call by the per-agent timeout and capture its timing
    ///
    /// A timeout is a step failure, never a run failure.
    async fn bounded<T, F>(&self, agent: AgentName, fut: F) -> StepOutcome<T>
    where
        F: Future<Output = Result<T, AgentError>>,
    {
        let start = Instant::now();
        let result = match timeout(self.agent_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::new(
                agent,
                AgentFailure::Timeout(self.agent_timeout.as_secs()),
            )),
        };
        StepOutcome {
            result,
            ended_at: Utc::now(),
            duration: start.elapsed(),
        }
    }
}

/// Record a resolved step in the trace (and error log on failure)
///
/// Returns the fragment value for the coordinator to merge, or `None` when
/// the step failed and contributes nothing.
fn record_outcome<T>(
    state: &mut AgentState,
    agent: AgentName,
    outcome: StepOutcome<T>,
    metric: impl FnOnce(&T) -> Value,
) -> Option<T> {
    let duration_ms = outcome.duration.as_millis() as u64;
    match outcome.result {
        Ok(value) => {
            state.agent_trace.push(TraceEntry::finished(
                agent.as_str(),
                TraceStatus::Success,
                outcome.ended_at,
                duration_ms,
                Some(metric(&value)),
            ));
            Some(value)
        }
        Err(err) => {
            tracing::warn!(
                agent = %agent,
                error = %err.reason,
                latency_ms = duration_ms,
                "Agent failed; continuing run"
            );
            state.record_error(agent.as_str(), err.reason.to_string(), err.timestamp);
            state.agent_trace.push(TraceEntry::finished(
                agent.as_str(),
                TraceStatus::Error,
                outcome.ended_at,
                duration_ms,
                None,
            ));
            None
        }
    }
}
