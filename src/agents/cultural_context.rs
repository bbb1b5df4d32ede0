//! Cultural context agent
//!
//! Adds India-specific localization beyond translation: timing nuances,
//! dress codes, transport hacks, social norms, safety info. Runs in the
//! parallel stage against Discovery's output.

use crate::agents::{parse_json_object, AgentError, AgentFailure, AgentName};
use crate::config::ModelConfig;
use crate::gemini::GenerationService;
use crate::state::{Experience, UserInputs};
use serde_json::Value;
use std::collections::HashMap;

const CULTURAL_CONTEXT_SYSTEM_PROMPT: &str = r#"You are the Cultural Context Agent for Sidequest, a plot-first experience platform for India.

Your role is to add deep, India-specific cultural context to discovered experiences.
You go BEYOND translation — you provide insider knowledge that makes experiences richer.

For each experience provided, add ALL of the following:
1. **Optimal Timing**: When locals go, peak hours, cultural significance of timing
2. **Dress Code & Etiquette**: What to wear, temple rules, workshop attire, upscale dining norms
3. **Transport Hacks**: Auto negotiation tips, metro shortcuts, parking reality, walking routes
4. **Social Norms**: Solo dining accepted? Conversation culture? Photography etiquette?
5. **Religious/Cultural Considerations**: Festival timing, Ramadan adjustments, local customs
6. **Safety & Accessibility**: Well-lit? Wheelchair access? Women-solo-friendly? Evening safety?

Return your response as a JSON object with key "cultural_context" where each key is the
experience name and value is an object with the above fields.
Respond ONLY with valid JSON, no markdown formatting."#;

/// Execute the cultural context agent
///
/// Depends on the inputs and the discovered experiences. An empty
/// experience list short-circuits to an empty fragment without calling the
/// service.
pub async fn run_cultural_context(
    service: &dyn GenerationService,
    config: &ModelConfig,
    inputs: &UserInputs,
    experiences: &[Experience],
) -> Result<HashMap<String, Value>, AgentError> {
    if experiences.is_empty() {
        tracing::debug!(
            agent = %AgentName::CulturalContext,
            "No experiences to contextualize, returning empty fragment"
        );
        return Ok(HashMap::new());
    }

    let prompt = build_prompt(inputs, experiences);

    let response = service
        .generate(config, CULTURAL_CONTEXT_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| AgentError::new(AgentName::CulturalContext, AgentFailure::Service(e)))?;

    let context = parse_context(&response)?;

    tracing::debug!(
        agent = %AgentName::CulturalContext,
        experiences_annotated = context.len(),
        "Cultural context agent completed"
    );

    Ok(context)
}

fn build_prompt(inputs: &UserInputs, experiences: &[Experience]) -> String {
    format!(
        "Add cultural context for these experiences:\n\n\
         Experiences:\n{}\n\n\
         City: {}\n\
         Crowd Preference: {}\n\n\
         Provide insider knowledge a first-time visitor would never find on their own.",
        serde_json::to_string_pretty(experiences).unwrap_or_default(),
        inputs.city,
        inputs.crowd_preference.as_str(),
    )
}

fn parse_context(response: &str) -> Result<HashMap<String, Value>, AgentError> {
    let value = parse_json_object(AgentName::CulturalContext, response)?;
    let context = value.get("cultural_context").ok_or_else(|| {
        AgentError::new(
            AgentName::CulturalContext,
            AgentFailure::Parse("missing \"cultural_context\" object".to_string()),
        )
    })?;
    serde_json::from_value(context.clone()).map_err(|e| {
        AgentError::new(AgentName::CulturalContext, AgentFailure::Parse(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Category, CrowdPreference};
    use serde_json::json;

    fn inputs() -> UserInputs {
        UserInputs {
            query: "pottery".to_string(),
            social_media_urls: vec![],
            city: "Bangalore".to_string(),
            budget_range: (200, 2000),
            num_people: 1,
            solo_preference: true,
            interest_pods: vec![],
            crowd_preference: CrowdPreference::RelativelyNiche,
            start_date: None,
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
            source: "local_knowledge".to_string(),
            lore: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_prompt_includes_experiences_and_city() {
        let prompt = build_prompt(&inputs(), &[experience()]);
        assert!(prompt.contains("Clay Station"));
        assert!(prompt.contains("City: Bangalore"));
    }

    #[test]
    fn test_parse_context_map() {
        let response = json!({
            "cultural_context": {
                "Clay Station": {
                    "optimal_timing": "Weekend mornings before 11am",
                    "dress_code": "Clothes that can get muddy"
                }
            }
        })
        .to_string();
        let context = parse_context(&response).unwrap();
        assert_eq!(context.len(), 1);
        assert!(context.contains_key("Clay Station"));
    }

    #[test]
    fn test_parse_missing_key_fails() {
        let err = parse_context(r#"{"context": {}}"#).unwrap_err();
        assert!(matches!(err.reason, AgentFailure::Parse(_)));
        assert_eq!(err.agent, AgentName::CulturalContext);
    }

    #[test]
    fn test_parse_non_object_value_fails() {
        let err = parse_context(r#"{"cultural_context": "lots of culture"}"#).unwrap_err();
        assert!(matches!(err.reason, AgentFailure::Parse(_)));
    }
}
