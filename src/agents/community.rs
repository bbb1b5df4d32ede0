//! Community agent
//!
//! Solo-sure filtering, social scaffolding cues, and ambient belonging
//! indicators. Runs in the parallel stage against Discovery's output.

use crate::agents::{parse_json_object, AgentError, AgentFailure, AgentName};
use crate::config::ModelConfig;
use crate::gemini::GenerationService;
use crate::state::{Experience, UserInputs};
use serde_json::Value;
use std::collections::HashMap;

const COMMUNITY_SYSTEM_PROMPT: &str = r#"You are the Community Agent for Sidequest.

Your role is to analyze the social dynamics of experiences and provide solo-sure filtering
and social scaffolding cues. You help people who arrive alone feel confident and welcome.

For each experience, analyze and provide:
1. **solo_friendly**: true/false — Can someone come alone comfortably?
2. **solo_percentage**: Estimated % of attendees who come alone (e.g., "40%")
3. **scaffolding**: How the environment facilitates connection
4. **arrival_vibe**: What it feels like arriving alone
5. **beginner_energy**: Low/Medium/High — Is it welcoming to first-timers? Include explanation

Return your response as a JSON object with key "social_scaffolding" where each key is the
experience name and value is an object with the above fields.
Respond ONLY with valid JSON, no markdown formatting."#;

/// Execute the community agent
///
/// Depends on the inputs and the discovered experiences. An empty
/// experience list short-circuits to an empty fragment without calling the
/// service.
pub async fn run_community(
    service: &dyn GenerationService,
    config: &ModelConfig,
    inputs: &UserInputs,
    experiences: &[Experience],
) -> Result<HashMap<String, Value>, AgentError> {
    if experiences.is_empty() {
        tracing::debug!(
            agent = %AgentName::Community,
            "No experiences to analyze, returning empty fragment"
        );
        return Ok(HashMap::new());
    }

    let prompt = build_prompt(inputs, experiences);

    let response = service
        .generate(config, COMMUNITY_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| AgentError::new(AgentName::Community, AgentFailure::Service(e)))?;

    let scaffolding = parse_scaffolding(&response)?;

    tracing::debug!(
        agent = %AgentName::Community,
        experiences_analyzed = scaffolding.len(),
        "Community agent completed"
    );

    Ok(scaffolding)
}

fn build_prompt(inputs: &UserInputs, experiences: &[Experience]) -> String {
    format!(
        "Analyze social dynamics for these experiences:\n\n\
         Experiences:\n{}\n\n\
         City: {}\n\
         Solo Visitor: {}\n\n\
         Provide honest, encouraging solo-sure assessments.",
        serde_json::to_string_pretty(experiences).unwrap_or_default(),
        inputs.city,
        inputs.solo_preference,
    )
}

fn parse_scaffolding(response: &str) -> Result<HashMap<String, Value>, AgentError> {
    let value = parse_json_object(AgentName::Community, response)?;
    let scaffolding = value.get("social_scaffolding").ok_or_else(|| {
        AgentError::new(
            AgentName::Community,
            AgentFailure::Parse("missing \"social_scaffolding\" object".to_string()),
        )
    })?;
    serde_json::from_value(scaffolding.clone())
        .map_err(|e| AgentError::new(AgentName::Community, AgentFailure::Parse(e.to_string())))
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
            timing: String::new(),
            budget: 800,
            location: "Indiranagar".to_string(),
            solo_friendly: true,
            source: String::new(),
            lore: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_prompt_mentions_solo_visitor() {
        let prompt = build_prompt(&inputs(), &[experience()]);
        assert!(prompt.contains("Solo Visitor: true"));
        assert!(prompt.contains("Clay Station"));
    }

    #[test]
    fn test_parse_scaffolding_map() {
        let response = json!({
            "social_scaffolding": {
                "Clay Station": {
                    "solo_friendly": true,
                    "solo_percentage": "40%",
                    "scaffolding": "Shared wheels encourage chatting",
                    "arrival_vibe": "Instructor greets everyone by name",
                    "beginner_energy": "High - designed for first-timers"
                }
            }
        })
        .to_string();
        let scaffolding = parse_scaffolding(&response).unwrap();
        assert_eq!(scaffolding.len(), 1);
        assert_eq!(
            scaffolding["Clay Station"]["solo_percentage"],
            json!("40%")
        );
    }

    #[test]
    fn test_parse_missing_key_fails() {
        let err = parse_scaffolding(r#"{"scaffolding": {}}"#).unwrap_err();
        assert!(matches!(err.reason, AgentFailure::Parse(_)));
        assert_eq!(err.agent, AgentName::Community);
    }
}
