//! Itinerary API handlers
//!
//! `POST /api/generate-itinerary` runs the full agent workflow;
//! `GET /api/agent-trace/:session_id` returns the trace of a completed run.

use crate::api::ApiContext;
use crate::error::AppError;
use crate::state::{ItineraryRequest, ItineraryResponse, TraceEntry};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

/// Response body for trace retrieval
#[derive(Debug, Serialize)]
pub struct TraceResponse {
    /// Session the trace belongs to
    pub session_id: String,
    /// The run's full trace log
    pub trace: Vec<TraceEntry>,
}

/// POST /api/generate-itinerary - run the five-agent workflow
///
/// Validates the request, then hands it to the coordinator. The coordinator
/// always produces a response; agent failures show up as null/empty fields
/// plus error entries, never as an HTTP error.
pub async fn generate_itinerary(
    State(ctx): State<ApiContext>,
    Json(request): Json<ItineraryRequest>,
) -> Result<Json<ItineraryResponse>, AppError> {
    request.validate().map_err(AppError::InvalidRequest)?;

    tracing::info!(
        query = %request.query,
        city = %request.city,
        num_people = request.num_people,
        "Received itinerary request"
    );

    let response = ctx.coordinator.run(&request).await;

    // Retain the trace so it stays retrievable after the run
    {
        let mut state = ctx.state.write().await;
        state
            .traces
            .insert(response.session_id.clone(), response.agent_trace.clone());
    }

    Ok(Json(response))
}

/// GET /api/agent-trace/:session_id - retrieve a completed run's trace
pub async fn get_agent_trace(
    State(ctx): State<ApiContext>,
    Path(session_id): Path<String>,
) -> Result<Json<TraceResponse>, AppError> {
    let state = ctx.state.read().await;
    let trace = state
        .traces
        .get(&session_id)
        .cloned()
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    Ok(Json(TraceResponse { session_id, trace }))
}
