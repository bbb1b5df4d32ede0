//! Plot-builder agent
//!
//! Generates narrative itineraries with emotional arcs, lore layering, and
//! intentional friction — stories, not lists. Runs last: it needs the
//! cultural context and social scaffolding maps (empty maps are valid
//! inputs when the upstream agents failed).

use crate::agents::{parse_json_object, AgentError, AgentFailure, AgentName};
use crate::config::ModelConfig;
use crate::gemini::GenerationService;
use crate::state::{CollisionSuggestion, Experience, NarrativeFragment, UserInputs};
use serde_json::Value;
use std::collections::HashMap;

const PLOT_BUILDER_SYSTEM_PROMPT: &str = r#"You are the Plot-Builder Agent for Sidequest, the core creative engine.

Your role is to transform discovered experiences + cultural context into NARRATIVE ITINERARIES
with emotional arcs — NOT chronological lists.

**Principles**:
1. **Setup → Friction → Payoff**: Every itinerary has story structure
2. **Intentional Friction**: Queueing, trekking, learning = memory-making moments
3. **Lore Layering**: Backstory, provenance, "why this matters" for each stop
4. **Collision Suggestions**: Mix interest pods (pottery + food + music) for serendipity

**Tone**: Evocative but grounded, "you" voice, sensory details, insider warmth.
Write as if whispering a secret to a friend who deserves this experience.

**Output Format** (return as JSON):
{
  "narrative_itinerary": "The full narrative text with all stops described evocatively...",
  "collision_suggestion": {
    "title": "Your next adventure (pod1 + pod2)",
    "experiences": ["Experience A", "Experience B"],
    "why": "Why these pair well together"
  }
}

Each stop in the narrative should include specific time + place, a friction element,
lore, social scaffolding, and a solo-sure indicator where applicable.
Open with a hook. Close with a reflection on what this day means.
Respond ONLY with valid JSON, no markdown formatting."#;

/// Fallback narrative when Discovery produced nothing to build on
const EMPTY_NARRATIVE: &str =
    "No experiences found to build a story around. Try a different query!";

/// Execute the plot-builder agent
///
/// Depends on the inputs, the discovered experiences, and both Stage-2
/// enrichment maps. With no experiences it returns a minimal narrative
/// without calling the service.
pub async fn run_plot_builder(
    service: &dyn GenerationService,
    config: &ModelConfig,
    inputs: &UserInputs,
    experiences: &[Experience],
    cultural_context: &HashMap<String, Value>,
    social_scaffolding: &HashMap<String, Value>,
) -> Result<NarrativeFragment, AgentError> {
    if experiences.is_empty() {
        tracing::debug!(
            agent = %AgentName::PlotBuilder,
            "No experiences available, returning minimal narrative"
        );
        return Ok(NarrativeFragment {
            narrative_itinerary: EMPTY_NARRATIVE.to_string(),
            collision_suggestion: None,
        });
    }

    let prompt = build_prompt(inputs, experiences, cultural_context, social_scaffolding);

    let response = service
        .generate(config, PLOT_BUILDER_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| AgentError::new(AgentName::PlotBuilder, AgentFailure::Service(e)))?;

    let fragment = parse_narrative(&response)?;

    tracing::debug!(
        agent = %AgentName::PlotBuilder,
        narrative_length = fragment.narrative_itinerary.len(),
        has_collision = fragment.collision_suggestion.is_some(),
        "Plot-builder agent completed"
    );

    Ok(fragment)
}

fn build_prompt(
    inputs: &UserInputs,
    experiences: &[Experience],
    cultural_context: &HashMap<String, Value>,
    social_scaffolding: &HashMap<String, Value>,
) -> String {
    let interest_pods = if inputs.interest_pods.is_empty() {
        "open to anything".to_string()
    } else {
        inputs.interest_pods.join(", ")
    };

    let dates = match (&inputs.start_date, &inputs.end_date) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        (Some(start), None) => format!("starting {start}"),
        _ => "flexible".to_string(),
    };

    format!(
        "Create a plot-first narrative itinerary from these inputs:\n\n\
         **User Query**: {}\n\
         **City**: {}\n\
         **Interest Pods**: {}\n\
         **Solo Experience**: {}\n\
         **Dates**: {}\n\n\
         **Discovered Experiences**:\n{}\n\n\
         **Cultural Context**:\n{}\n\n\
         **Social Scaffolding**:\n{}\n\n\
         Select the best 2-4 experiences and weave them into a journey with setup,\n\
         friction, and payoff. Include realistic travel time between stops.",
        inputs.query,
        inputs.city,
        interest_pods,
        inputs.solo_preference,
        dates,
        serde_json::to_string_pretty(experiences).unwrap_or_default(),
        serde_json::to_string_pretty(cultural_context).unwrap_or_default(),
        serde_json::to_string_pretty(social_scaffolding).unwrap_or_default(),
    )
}

fn parse_narrative(response: &str) -> Result<NarrativeFragment, AgentError> {
    let value = parse_json_object(AgentName::PlotBuilder, response)?;

    let narrative = value
        .get("narrative_itinerary")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            AgentError::new(
                AgentName::PlotBuilder,
                AgentFailure::Parse("missing or empty \"narrative_itinerary\"".to_string()),
            )
        })?;

    // The collision suggestion is optional; a malformed one is dropped
    // rather than failing the narrative
    let collision_suggestion = value
        .get("collision_suggestion")
        .and_then(|c| serde_json::from_value::<CollisionSuggestion>(c.clone()).ok())
        .filter(|c| !c.title.trim().is_empty());

    Ok(NarrativeFragment {
        narrative_itinerary: narrative.to_string(),
        collision_suggestion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Category, CrowdPreference};
    use serde_json::json;

    fn inputs() -> UserInputs {
        UserInputs {
            query: "solo pottery workshop".to_string(),
            social_media_urls: vec![],
            city: "Bangalore".to_string(),
            budget_range: (200, 2000),
            num_people: 1,
            solo_preference: true,
            interest_pods: vec!["craft_explorer".to_string(), "food_nerd".to_string()],
            crowd_preference: CrowdPreference::RelativelyNiche,
            start_date: Some("2026-09-05".to_string()),
            end_date: None,
        }
    }

    fn experience() -> Experience {
        Experience {
            name: "Clay Station".to_string(),
            category: Category::Craft,
            timing: "weekend mornings".to_string(),
            budget: 800,
            location: "Indiranagar".to_string(),
            solo_friendly: true,
            source: String::new(),
            lore: "Founded by two NID graduates.".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_prompt_carries_all_views() {
        let context = HashMap::from([("Clay Station".to_string(), json!({"timing": "early"}))]);
        let scaffolding =
            HashMap::from([("Clay Station".to_string(), json!({"solo_friendly": true}))]);
        let prompt = build_prompt(&inputs(), &[experience()], &context, &scaffolding);
        assert!(prompt.contains("craft_explorer, food_nerd"));
        assert!(prompt.contains("starting 2026-09-05"));
        assert!(prompt.contains("Cultural Context"));
        assert!(prompt.contains("Social Scaffolding"));
    }

    #[test]
    fn test_parse_narrative_with_collision() {
        let response = json!({
            "narrative_itinerary": "10:00 AM — your hands meet the wheel...",
            "collision_suggestion": {
                "title": "Clay then chai (craft + food)",
                "experiences": ["Clay Station", "Airlines Hotel"],
                "why": "Mud on your hands makes the filter coffee taste earned."
            }
        })
        .to_string();
        let fragment = parse_narrative(&response).unwrap();
        assert!(fragment.narrative_itinerary.starts_with("10:00 AM"));
        let collision = fragment.collision_suggestion.unwrap();
        assert_eq!(collision.experiences.len(), 2);
    }

    #[test]
    fn test_parse_narrative_without_collision() {
        let response = json!({"narrative_itinerary": "A quiet day of clay."}).to_string();
        let fragment = parse_narrative(&response).unwrap();
        assert!(fragment.collision_suggestion.is_none());
    }

    #[test]
    fn test_parse_drops_untitled_collision() {
        let response = json!({
            "narrative_itinerary": "A quiet day of clay.",
            "collision_suggestion": {"title": "", "experiences": [], "why": ""}
        })
        .to_string();
        let fragment = parse_narrative(&response).unwrap();
        assert!(fragment.collision_suggestion.is_none());
    }

    #[test]
    fn test_parse_empty_narrative_fails() {
        let err = parse_narrative(r#"{"narrative_itinerary": "  "}"#).unwrap_err();
        assert!(matches!(err.reason, AgentFailure::Parse(_)));
    }

    #[tokio::test]
    async fn test_empty_experiences_short_circuits() {
        // The service must not be called; a panicking stub proves it
        struct NeverCalled;
        #[async_trait::async_trait]
        impl crate::gemini::GenerationService for NeverCalled {
            async fn generate(
                &self,
                _config: &ModelConfig,
                _system_prompt: &str,
                _user_prompt: &str,
            ) -> Result<String, crate::gemini::GenerationError> {
                panic!("service must not be called with no experiences");
            }
        }

        let config = ModelConfig {
            model: "test".to_string(),
            temperature: 0.7,
            max_output_tokens: 1024,
        };
        let fragment = run_plot_builder(
            &NeverCalled,
            &config,
            &inputs(),
            &[],
            &HashMap::new(),
            &HashMap::new(),
        )
        .await
        .unwrap();
        assert_eq!(fragment.narrative_itinerary, EMPTY_NARRATIVE);
        assert!(fragment.collision_suggestion.is_none());
    }
}
