//! State schemas
//!
//! Request/response types for the itinerary API, the per-run `AgentState`
//! record, and the typed fragments each agent returns. The merge logic here
//! enforces the two state invariants the coordinator relies on: every output
//! field is written by exactly one agent, and a written field is never
//! overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

// ──────────────────────────────────────────────
// API request / response
// ──────────────────────────────────────────────

/// Request body for itinerary generation
#[derive(Debug, Clone, Deserialize)]
pub struct ItineraryRequest {
    /// User's natural language query or experience description
    #[serde(default)]
    pub query: String,
    /// Instagram Reel or YouTube URLs to extract experiences from
    #[serde(default)]
    pub social_media_urls: Vec<String>,
    /// Target city for experiences
    #[serde(default = "default_city")]
    pub city: String,
    /// Minimum budget in INR
    #[serde(default = "default_budget_min")]
    pub budget_min: u32,
    /// Maximum budget in INR
    #[serde(default = "default_budget_max")]
    pub budget_max: u32,
    /// Number of people
    #[serde(default = "default_num_people")]
    pub num_people: u32,
    /// Whether to prioritize solo-friendly experiences
    #[serde(default = "default_true")]
    pub solo_preference: bool,
    /// User's interest categories (e.g. "food_nerd", "craft_explorer")
    #[serde(default)]
    pub interest_pods: Vec<String>,
    /// Crowd preference
    #[serde(default)]
    pub crowd_preference: CrowdPreference,
    /// Trip start date (YYYY-MM-DD)
    #[serde(default)]
    pub start_date: Option<String>,
    /// Trip end date (YYYY-MM-DD)
    #[serde(default)]
    pub end_date: Option<String>,
}

fn default_city() -> String {
    "Bangalore".to_string()
}

fn default_budget_min() -> u32 {
    200
}

fn default_budget_max() -> u32 {
    5000
}

fn default_num_people() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl ItineraryRequest {
    /// Validate the request before the coordinator is invoked
    ///
    /// The coordinator assumes a valid request; this is the gate in front
    /// of it. Returns a human-readable message on the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() && self.social_media_urls.is_empty() {
            return Err("query is required when no social media URLs are given".to_string());
        }
        if self.budget_min > self.budget_max {
            return Err(format!(
                "budget_min ({}) must not exceed budget_max ({})",
                self.budget_min, self.budget_max
            ));
        }
        if self.num_people == 0 {
            return Err("num_people must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Crowd-density preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrowdPreference {
    /// Popular, busy spots
    Crowded,
    /// Off the main tourist track
    #[default]
    RelativelyNiche,
    /// Known mostly to locals
    SuperNiche,
}

impl CrowdPreference {
    /// Human-readable label used in prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            CrowdPreference::Crowded => "crowded",
            CrowdPreference::RelativelyNiche => "relatively_niche",
            CrowdPreference::SuperNiche => "super_niche",
        }
    }
}

/// Response body for itinerary generation
///
/// Every optional field is always present, degrading to null/empty rather
/// than being omitted, so callers can render partial results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryResponse {
    /// Plot-first narrative itinerary with story arc
    pub narrative_itinerary: String,
    /// Discovered experiences used in the itinerary
    pub experiences: Vec<Experience>,
    /// Cultural context annotations, keyed by experience name
    pub cultural_context: HashMap<String, Value>,
    /// Cost breakdown; null when the budget agent failed
    pub budget_breakdown: Option<BudgetBreakdown>,
    /// Solo-sure and social scaffolding info, keyed by experience name
    pub social_scaffolding: HashMap<String, Value>,
    /// Cross-pod experience recommendation; null when absent
    pub collision_suggestion: Option<CollisionSuggestion>,
    /// Agent execution trace for observability
    pub agent_trace: Vec<TraceEntry>,
    /// Per-agent failures; empty when every agent succeeded
    pub errors: Vec<ErrorEntry>,
    /// Session id for trace retrieval
    pub session_id: String,
}

// ──────────────────────────────────────────────
// Domain records
// ──────────────────────────────────────────────

/// Category tag for a discovered experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Food and drink
    Food,
    /// Artisan workshops
    Craft,
    /// Heritage walks and sites
    Heritage,
    /// Outdoors and nature
    Nature,
    /// Galleries and visual art
    Art,
    /// Live music and listening rooms
    Music,
    /// Runs, climbs, movement
    Fitness,
    /// Markets and independent shops
    Shopping,
    /// Meetups and community events
    Networking,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" => Ok(Category::Food),
            "craft" => Ok(Category::Craft),
            "heritage" => Ok(Category::Heritage),
            "nature" => Ok(Category::Nature),
            "art" => Ok(Category::Art),
            "music" => Ok(Category::Music),
            "fitness" => Ok(Category::Fitness),
            "shopping" => Ok(Category::Shopping),
            "networking" => Ok(Category::Networking),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A single discovered experience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// Experience name
    pub name: String,
    /// Category tag
    pub category: Category,
    /// Best time to visit
    pub timing: String,
    /// Estimated cost in INR
    pub budget: u32,
    /// Neighborhood/area in the city
    pub location: String,
    /// Whether it works well for solo visitors
    #[serde(default)]
    pub solo_friendly: bool,
    /// Provenance (instagram, blog, local_knowledge, ...)
    #[serde(default)]
    pub source: String,
    /// Backstory and provenance notes
    #[serde(default)]
    pub lore: String,
    /// Vivid 2-3 sentence description
    #[serde(default)]
    pub description: String,
}

/// One line of a budget breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    /// Experience or cost bucket this line covers
    pub experience: String,
    /// Cost in INR
    pub cost: u32,
    /// Line type ("workshop", "transport", ...)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Booking urgency, when applicable
    #[serde(default)]
    pub booking_required: Option<String>,
}

/// Cost breakdown for an itinerary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    /// Total estimated cost in INR
    #[serde(default)]
    pub total_estimate: u32,
    /// Per-experience cost lines
    #[serde(default)]
    pub breakdown: Vec<BudgetLine>,
    /// Deals and discounts worth knowing about
    #[serde(default)]
    pub deals: Vec<String>,
    /// Cost-saving tips
    #[serde(default)]
    pub tips: Vec<String>,
    /// Whether the total fits the requested range
    #[serde(default = "default_true")]
    pub within_budget: bool,
}

/// Cross-pod experience recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionSuggestion {
    /// Suggestion headline
    pub title: String,
    /// Names of the paired experiences
    #[serde(default)]
    pub experiences: Vec<String>,
    /// Why these pair well together
    #[serde(default)]
    pub why: String,
}

/// Output of the plot-builder agent
#[derive(Debug, Clone, Default)]
pub struct NarrativeFragment {
    /// The full narrative text
    pub narrative_itinerary: String,
    /// Optional cross-pod pairing recommendation
    pub collision_suggestion: Option<CollisionSuggestion>,
}

// ──────────────────────────────────────────────
// Trace and error logs
// ──────────────────────────────────────────────

/// Lifecycle status recorded in a trace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    /// Work has begun
    Started,
    /// Work finished and produced a fragment
    Success,
    /// Work failed; details in the error log
    Error,
    /// Terminal coordinator entry for the whole run
    Completed,
}

/// One audit-log record of an agent lifecycle event
///
/// Entries are append-only; they are never mutated or removed once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Agent name, or "coordinator" for run-level entries
    pub agent: String,
    /// Lifecycle status
    pub status: TraceStatus,
    /// When this event occurred
    pub timestamp: DateTime<Utc>,
    /// Elapsed time for terminal entries
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Optional metric payload (counts, totals)
    #[serde(default)]
    pub metric: Option<Value>,
}

impl TraceEntry {
    /// Entry for work that has just begun
    pub fn started(agent: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            agent: agent.to_string(),
            status: TraceStatus::Started,
            timestamp,
            duration_ms: None,
            metric: None,
        }
    }

    /// Terminal entry for a resolved step or run
    pub fn finished(
        agent: &str,
        status: TraceStatus,
        timestamp: DateTime<Utc>,
        duration_ms: u64,
        metric: Option<Value>,
    ) -> Self {
        Self {
            agent: agent.to_string(),
            status,
            timestamp,
            duration_ms: Some(duration_ms),
            metric,
        }
    }
}

/// One entry in the run's error log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Agent that failed
    pub agent: String,
    /// Human-readable failure reason
    pub error: String,
    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
}

// ──────────────────────────────────────────────
// Shared state
// ──────────────────────────────────────────────

/// User inputs, immutable after state creation
#[derive(Debug, Clone)]
pub struct UserInputs {
    /// Free-text query
    pub query: String,
    /// Source URLs to extract experiences from
    pub social_media_urls: Vec<String>,
    /// Target city
    pub city: String,
    /// (min, max) budget in INR
    pub budget_range: (u32, u32),
    /// Party size
    pub num_people: u32,
    /// Prioritize solo-friendly experiences
    pub solo_preference: bool,
    /// Selected interest tags
    pub interest_pods: Vec<String>,
    /// Crowd-density preference
    pub crowd_preference: CrowdPreference,
    /// Optional trip start date
    pub start_date: Option<String>,
    /// Optional trip end date
    pub end_date: Option<String>,
}

impl From<&ItineraryRequest> for UserInputs {
    fn from(request: &ItineraryRequest) -> Self {
        Self {
            query: request.query.clone(),
            social_media_urls: request.social_media_urls.clone(),
            city: request.city.clone(),
            budget_range: (request.budget_min, request.budget_max),
            num_people: request.num_people,
            solo_preference: request.solo_preference,
            interest_pods: request.interest_pods.clone(),
            crowd_preference: request.crowd_preference,
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
        }
    }
}

/// The typed output an agent returns before it is merged into state
///
/// One variant per agent, so `AgentState::merge_fragment` is exhaustively
/// checked: no two variants can ever target the same state field.
#[derive(Debug, Clone)]
pub enum AgentFragment {
    /// Discovery output: validated experience list
    Discovery(Vec<Experience>),
    /// Cultural-context output, keyed by experience name
    CulturalContext(HashMap<String, Value>),
    /// Community output: social scaffolding, keyed by experience name
    Community(HashMap<String, Value>),
    /// Plot-builder output: narrative plus optional collision suggestion
    PlotBuilder(NarrativeFragment),
    /// Budget output
    Budget(BudgetBreakdown),
}

/// Tracks which output fields have been written, making merge write-once
#[derive(Debug, Clone, Copy, Default)]
struct MergedFields {
    discovery: bool,
    cultural_context: bool,
    community: bool,
    plot_builder: bool,
    budget: bool,
}

/// Per-run shared state
///
/// Owned exclusively by one in-flight coordinator run. Agents never touch
/// it directly; they return fragments that the coordinator merges in.
#[derive(Debug)]
pub struct AgentState {
    /// Immutable user inputs
    pub inputs: UserInputs,

    /// Discovery output (written once, possibly empty)
    pub discovered_experiences: Vec<Experience>,
    /// Cultural-context output
    pub cultural_context: HashMap<String, Value>,
    /// Plot-builder narrative
    pub narrative_itinerary: String,
    /// Budget output
    pub budget_breakdown: Option<BudgetBreakdown>,
    /// Community output
    pub social_scaffolding: HashMap<String, Value>,
    /// Plot-builder collision suggestion
    pub collision_suggestion: Option<CollisionSuggestion>,

    /// Append-only execution trace
    pub agent_trace: Vec<TraceEntry>,
    /// Append-only error log
    pub errors: Vec<ErrorEntry>,
    /// Opaque id, unique per run
    pub session_id: String,

    merged: MergedFields,
}

impl AgentState {
    /// Create the initial state for a run from validated inputs
    pub fn new(inputs: UserInputs) -> Self {
        Self {
            inputs,
            discovered_experiences: Vec::new(),
            cultural_context: HashMap::new(),
            narrative_itinerary: String::new(),
            budget_breakdown: None,
            social_scaffolding: HashMap::new(),
            collision_suggestion: None,
            agent_trace: Vec::new(),
            errors: Vec::new(),
            session_id: Uuid::new_v4().to_string(),
            merged: MergedFields::default(),
        }
    }

    /// Merge an agent's fragment into state
    ///
    /// Each fragment variant writes a disjoint field, so merge order across
    /// a parallel stage does not matter. A field that has already been
    /// written is never overwritten; a repeat merge is dropped with a
    /// warning.
    pub fn merge_fragment(&mut self, fragment: AgentFragment) {
        match fragment {
            AgentFragment::Discovery(experiences) => {
                if self.merged.discovery {
                    tracing::warn!(agent = "discovery", "field already merged, dropping fragment");
                    return;
                }
                self.discovered_experiences = experiences;
                self.merged.discovery = true;
            }
            AgentFragment::CulturalContext(context) => {
                if self.merged.cultural_context {
                    tracing::warn!(
                        agent = "cultural_context",
                        "field already merged, dropping fragment"
                    );
                    return;
                }
                self.cultural_context = context;
                self.merged.cultural_context = true;
            }
            AgentFragment::Community(scaffolding) => {
                if self.merged.community {
                    tracing::warn!(agent = "community", "field already merged, dropping fragment");
                    return;
                }
                self.social_scaffolding = scaffolding;
                self.merged.community = true;
            }
            AgentFragment::PlotBuilder(narrative) => {
                if self.merged.plot_builder {
                    tracing::warn!(
                        agent = "plot_builder",
                        "field already merged, dropping fragment"
                    );
                    return;
                }
                self.narrative_itinerary = narrative.narrative_itinerary;
                self.collision_suggestion = narrative.collision_suggestion;
                self.merged.plot_builder = true;
            }
            AgentFragment::Budget(breakdown) => {
                if self.merged.budget {
                    tracing::warn!(agent = "budget", "field already merged, dropping fragment");
                    return;
                }
                self.budget_breakdown = Some(breakdown);
                self.merged.budget = true;
            }
        }
    }

    /// Append an error-log entry
    pub fn record_error(&mut self, agent: &str, error: String, timestamp: DateTime<Utc>) {
        self.errors.push(ErrorEntry {
            agent: agent.to_string(),
            error,
            timestamp,
        });
    }

    /// Convert final state into the API response, consuming the state
    pub fn into_response(self) -> ItineraryResponse {
        // A collision suggestion without a title is noise from the model
        let collision_suggestion = self
            .collision_suggestion
            .filter(|c| !c.title.trim().is_empty());

        ItineraryResponse {
            narrative_itinerary: self.narrative_itinerary,
            experiences: self.discovered_experiences,
            cultural_context: self.cultural_context,
            budget_breakdown: self.budget_breakdown,
            social_scaffolding: self.social_scaffolding,
            collision_suggestion,
            agent_trace: self.agent_trace,
            errors: self.errors,
            session_id: self.session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_inputs() -> UserInputs {
        UserInputs {
            query: "solo pottery workshop".to_string(),
            social_media_urls: vec![],
            city: "Bangalore".to_string(),
            budget_range: (200, 2000),
            num_people: 1,
            solo_preference: true,
            interest_pods: vec!["craft_explorer".to_string()],
            crowd_preference: CrowdPreference::RelativelyNiche,
            start_date: None,
            end_date: None,
        }
    }

    fn sample_experience(name: &str) -> Experience {
        Experience {
            name: name.to_string(),
            category: Category::Craft,
            timing: "weekend mornings".to_string(),
            budget: 800,
            location: "Indiranagar".to_string(),
            solo_friendly: true,
            source: "local_knowledge".to_string(),
            lore: String::new(),
            description: "Wheel throwing for beginners.".to_string(),
        }
    }

    #[test]
    fn test_request_defaults() {
        let request: ItineraryRequest = serde_json::from_str(r#"{"query": "pottery"}"#).unwrap();
        assert_eq!(request.city, "Bangalore");
        assert_eq!(request.budget_min, 200);
        assert_eq!(request.budget_max, 5000);
        assert_eq!(request.num_people, 1);
        assert!(request.solo_preference);
        assert_eq!(request.crowd_preference, CrowdPreference::RelativelyNiche);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation_rejects_empty_query_without_urls() {
        let request: ItineraryRequest = serde_json::from_str(r#"{"query": "  "}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_validation_accepts_urls_without_query() {
        let request: ItineraryRequest = serde_json::from_str(
            r#"{"social_media_urls": ["https://instagram.com/reel/x"]}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation_rejects_inverted_budget() {
        let request: ItineraryRequest =
            serde_json::from_str(r#"{"query": "q", "budget_min": 900, "budget_max": 100}"#)
                .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_validation_rejects_zero_people() {
        let request: ItineraryRequest =
            serde_json::from_str(r#"{"query": "q", "num_people": 0}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("food".parse::<Category>().unwrap(), Category::Food);
        assert_eq!(" Heritage ".parse::<Category>().unwrap(), Category::Heritage);
        assert!("street_food".parse::<Category>().is_err());
    }

    #[test]
    fn test_merge_is_order_independent_across_stage_two() {
        let context: HashMap<String, Value> =
            HashMap::from([("Pottery".to_string(), json!({"timing": "mornings"}))]);
        let scaffolding: HashMap<String, Value> =
            HashMap::from([("Pottery".to_string(), json!({"solo_friendly": true}))]);
        let breakdown = BudgetBreakdown {
            total_estimate: 1250,
            ..Default::default()
        };

        let fragments = [
            AgentFragment::CulturalContext(context.clone()),
            AgentFragment::Community(scaffolding.clone()),
            AgentFragment::Budget(breakdown.clone()),
        ];

        // All 6 permutations of the three fragments must agree
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for order in orders {
            let mut state = AgentState::new(sample_inputs());
            for idx in order {
                state.merge_fragment(fragments[idx].clone());
            }
            assert_eq!(state.cultural_context, context);
            assert_eq!(state.social_scaffolding, scaffolding);
            assert_eq!(state.budget_breakdown, Some(breakdown.clone()));
        }
    }

    #[test]
    fn test_merge_never_overwrites_written_field() {
        let mut state = AgentState::new(sample_inputs());
        state.merge_fragment(AgentFragment::Discovery(vec![sample_experience("Pottery")]));
        state.merge_fragment(AgentFragment::Discovery(vec![]));
        assert_eq!(state.discovered_experiences.len(), 1);

        state.merge_fragment(AgentFragment::Budget(BudgetBreakdown {
            total_estimate: 500,
            ..Default::default()
        }));
        state.merge_fragment(AgentFragment::Budget(BudgetBreakdown {
            total_estimate: 9999,
            ..Default::default()
        }));
        assert_eq!(state.budget_breakdown.unwrap().total_estimate, 500);
    }

    #[test]
    fn test_into_response_drops_untitled_collision() {
        let mut state = AgentState::new(sample_inputs());
        state.merge_fragment(AgentFragment::PlotBuilder(NarrativeFragment {
            narrative_itinerary: "A day of clay.".to_string(),
            collision_suggestion: Some(CollisionSuggestion {
                title: "  ".to_string(),
                experiences: vec![],
                why: String::new(),
            }),
        }));
        let response = state.into_response();
        assert!(response.collision_suggestion.is_none());
        assert_eq!(response.narrative_itinerary, "A day of clay.");
    }

    #[test]
    fn test_session_ids_are_unique_per_run() {
        let a = AgentState::new(sample_inputs());
        let b = AgentState::new(sample_inputs());
        assert_ne!(a.session_id, b.session_id);
    }
}
