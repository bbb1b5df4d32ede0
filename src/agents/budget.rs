//! Budget optimizer agent
//!
//! Cost transparency, deals discovery, and booking timeline recommendations.
//! Depends only on Discovery's output, so it runs in the parallel stage
//! alongside cultural context and community.

use crate::agents::{parse_json_object, AgentError, AgentFailure, AgentName};
use crate::config::ModelConfig;
use crate::gemini::GenerationService;
use crate::state::{BudgetBreakdown, Experience, UserInputs};

const BUDGET_SYSTEM_PROMPT: &str = r#"You are the Budget Optimizer Agent for Sidequest.

Your role is to provide cost transparency and smart budget recommendations for experiences.

For each experience, calculate:
1. **Entry/ticket cost**: Actual fees
2. **Average spend**: Food, drinks, materials
3. **Transport cost**: Auto/metro/walk between experiences
4. **Hidden costs**: Parking, tips, extras

Also provide:
- Deals: Early bird pricing, group discounts, BNPL options
- Booking urgency: "Book 3 days ahead (sells out)" or "Walk-in available"
- Cost-saving tips: "Take metro instead of auto, save ₹200"

Return JSON with key "budget_breakdown":
{
  "budget_breakdown": {
    "total_estimate": 1250,
    "breakdown": [
      {"experience": "Name", "cost": 800, "type": "workshop", "booking_required": "2 days ahead"},
      {"experience": "Transport", "cost": 300, "type": "transport"}
    ],
    "deals": ["BNPL available via Simpl for workshop"],
    "tips": ["Take metro from MG Road to save ₹150"],
    "within_budget": true
  }
}

All costs in INR (₹). Be realistic with Bangalore/Indian city pricing.
Respond ONLY with valid JSON, no markdown formatting."#;

/// Execute the budget optimizer agent
///
/// Depends on the inputs and the discovered experiences. An empty
/// experience list short-circuits to a zero breakdown without calling the
/// service.
pub async fn run_budget(
    service: &dyn GenerationService,
    config: &ModelConfig,
    inputs: &UserInputs,
    experiences: &[Experience],
) -> Result<BudgetBreakdown, AgentError> {
    if experiences.is_empty() {
        tracing::debug!(
            agent = %AgentName::Budget,
            "No experiences to price, returning zero breakdown"
        );
        return Ok(BudgetBreakdown::default());
    }

    let prompt = build_prompt(inputs, experiences);

    let response = service
        .generate(config, BUDGET_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| AgentError::new(AgentName::Budget, AgentFailure::Service(e)))?;

    let breakdown = parse_breakdown(&response)?;

    tracing::debug!(
        agent = %AgentName::Budget,
        total_estimate = breakdown.total_estimate,
        within_budget = breakdown.within_budget,
        "Budget agent completed"
    );

    Ok(breakdown)
}

fn build_prompt(inputs: &UserInputs, experiences: &[Experience]) -> String {
    format!(
        "Analyze budget for these experiences:\n\n\
         Experiences:\n{}\n\n\
         City: {}\n\
         Budget Range: ₹{} - ₹{}\n\
         Number of People: {}\n\n\
         Provide realistic INR pricing for {}.",
        serde_json::to_string_pretty(experiences).unwrap_or_default(),
        inputs.city,
        inputs.budget_range.0,
        inputs.budget_range.1,
        inputs.num_people,
        inputs.city,
    )
}

fn parse_breakdown(response: &str) -> Result<BudgetBreakdown, AgentError> {
    let value = parse_json_object(AgentName::Budget, response)?;
    let breakdown = value.get("budget_breakdown").ok_or_else(|| {
        AgentError::new(
            AgentName::Budget,
            AgentFailure::Parse("missing \"budget_breakdown\" object".to_string()),
        )
    })?;
    serde_json::from_value(breakdown.clone())
        .map_err(|e| AgentError::new(AgentName::Budget, AgentFailure::Parse(e.to_string())))
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
            num_people: 2,
            solo_preference: false,
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
    fn test_prompt_includes_budget_range_and_party_size() {
        let prompt = build_prompt(&inputs(), &[experience()]);
        assert!(prompt.contains("₹200 - ₹2000"));
        assert!(prompt.contains("Number of People: 2"));
    }

    #[test]
    fn test_parse_full_breakdown() {
        let response = json!({
            "budget_breakdown": {
                "total_estimate": 1250,
                "breakdown": [
                    {"experience": "Clay Station", "cost": 800, "type": "workshop",
                     "booking_required": "2 days ahead"},
                    {"experience": "Transport", "cost": 450, "type": "transport"}
                ],
                "deals": ["Early bird 10% off"],
                "tips": ["Take the metro"],
                "within_budget": true
            }
        })
        .to_string();
        let breakdown = parse_breakdown(&response).unwrap();
        assert_eq!(breakdown.total_estimate, 1250);
        assert_eq!(breakdown.breakdown.len(), 2);
        assert_eq!(
            breakdown.breakdown[0].booking_required.as_deref(),
            Some("2 days ahead")
        );
        assert!(breakdown.within_budget);
    }

    #[test]
    fn test_parse_sparse_breakdown_uses_defaults() {
        let response = json!({"budget_breakdown": {"total_estimate": 300}}).to_string();
        let breakdown = parse_breakdown(&response).unwrap();
        assert_eq!(breakdown.total_estimate, 300);
        assert!(breakdown.breakdown.is_empty());
        assert!(breakdown.within_budget);
    }

    #[test]
    fn test_parse_missing_key_fails() {
        let err = parse_breakdown(r#"{"budget": {}}"#).unwrap_err();
        assert!(matches!(err.reason, AgentFailure::Parse(_)));
        assert_eq!(err.agent, AgentName::Budget);
    }
}
