//! Discovery agent
//!
//! Finds experiences from social media, community platforms, and hyperlocal
//! sources. Runs alone in Stage 1; every other agent depends on its output.
//! Records failing validation are dropped, not repaired, and the list is
//! capped at ten.

use crate::agents::{parse_json_object, AgentError, AgentFailure, AgentName};
use crate::config::ModelConfig;
use crate::gemini::GenerationService;
use crate::state::{Category, Experience, UserInputs};
use serde_json::Value;

/// Most experiences one run will carry forward
const MAX_EXPERIENCES: usize = 10;

const DISCOVERY_SYSTEM_PROMPT: &str = r#"You are the Discovery Agent for Sidequest, a plot-first experience discovery platform.

Your role is to find compelling, unique experiences based on the user's query and preferences.

Given the user's input, discover and return 5-10 relevant experiences. Focus on:
1. Hyperlocal gems not easily found on Google Maps
2. Artisan workshops, heritage walks, cultural immersions
3. Solo-friendly activities with social scaffolding potential
4. Experiences with story potential (lore, provenance, friction)

For each experience, provide:
- name: Experience name
- category: One of [food, craft, heritage, nature, art, music, fitness, shopping, networking]
- timing: Best time to visit
- budget: Estimated cost in INR
- location: Neighborhood/area in the city
- solo_friendly: Whether it works well for solo visitors
- source: Where you found this (instagram, blog, local_knowledge, etc.)
- description: 2-3 sentence vivid description

Return your response as a JSON object with key "discovered_experiences" containing an array of experiences.
Respond ONLY with valid JSON, no markdown formatting."#;

/// Execute the discovery agent
///
/// Depends only on the user inputs. Returns the validated experience list;
/// zero valid records after filtering is a soft failure
/// (`AgentFailure::NoValidRecords`), which the coordinator treats as a
/// failed step with an empty list merged in.
pub async fn run_discovery(
    service: &dyn GenerationService,
    config: &ModelConfig,
    inputs: &UserInputs,
) -> Result<Vec<Experience>, AgentError> {
    let prompt = build_prompt(inputs);

    let response = service
        .generate(config, DISCOVERY_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| AgentError::new(AgentName::Discovery, AgentFailure::Service(e)))?;

    let experiences = parse_experiences(&response)?;

    tracing::debug!(
        agent = %AgentName::Discovery,
        experiences_found = experiences.len(),
        "Discovery agent completed"
    );

    Ok(experiences)
}

fn build_prompt(inputs: &UserInputs) -> String {
    let interest_pods = if inputs.interest_pods.is_empty() {
        "open to anything".to_string()
    } else {
        inputs.interest_pods.join(", ")
    };

    let mut prompt = format!(
        "Find experiences for the following request:\n\n\
         Query: {}\n\
         City: {}\n\
         Budget Range: ₹{} - ₹{}\n\
         Number of People: {}\n\
         Solo Preference: {}\n\
         Interest Pods: {}\n\
         Crowd Preference: {}\n",
        inputs.query,
        inputs.city,
        inputs.budget_range.0,
        inputs.budget_range.1,
        inputs.num_people,
        inputs.solo_preference,
        interest_pods,
        inputs.crowd_preference.as_str(),
    );

    if !inputs.social_media_urls.is_empty() {
        prompt.push_str(&format!(
            "\nSocial Media URLs to extract from: {}",
            inputs.social_media_urls.join(", ")
        ));
    }

    prompt
}

/// Parse and validate the discovery response
///
/// Malformed records are filtered out; an entirely empty result after
/// filtering is `NoValidRecords`.
fn parse_experiences(response: &str) -> Result<Vec<Experience>, AgentError> {
    let value = parse_json_object(AgentName::Discovery, response)?;

    let raw = value
        .get("discovered_experiences")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AgentError::new(
                AgentName::Discovery,
                AgentFailure::Parse("missing \"discovered_experiences\" array".to_string()),
            )
        })?;

    let total = raw.len();
    let experiences: Vec<Experience> = raw
        .iter()
        .filter_map(validate_experience)
        .take(MAX_EXPERIENCES)
        .collect();

    if experiences.len() < total {
        tracing::warn!(
            agent = %AgentName::Discovery,
            dropped = total - experiences.len(),
            "Dropped experiences that failed validation"
        );
    }

    if experiences.is_empty() && total > 0 {
        return Err(AgentError::new(
            AgentName::Discovery,
            AgentFailure::NoValidRecords,
        ));
    }

    Ok(experiences)
}

/// Validate one raw experience record; `None` drops it
fn validate_experience(value: &Value) -> Option<Experience> {
    let name = value.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let category: Category = value.get("category")?.as_str()?.parse().ok()?;

    // Budget must be a non-negative integer when present
    let budget = match value.get("budget") {
        None | Some(Value::Null) => 0,
        Some(v) => u32::try_from(v.as_u64()?).ok()?,
    };

    let text_field = |key: &str| -> String {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Some(Experience {
        name: name.to_string(),
        category,
        timing: text_field("timing"),
        budget,
        location: text_field("location"),
        solo_friendly: value
            .get("solo_friendly")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        source: text_field("source"),
        lore: text_field("lore"),
        description: text_field("description"),
    })
}
