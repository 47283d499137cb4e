//! Hybrid generation strategy.
//!
//! Deterministic facts already cover most of the output schema, so this path
//! makes exactly one completion call scoped to the missing sections, under a
//! smaller token budget and a shorter timeout than multipass. There is no
//! retry-and-validate loop: a malformed response is replaced by structural
//! defaults so the caller always receives a complete profile.
use crate::completion::{CompletionClient, CompletionRequest, HYBRID_MAX_TOKENS, HYBRID_TIMEOUT};
use crate::extract::extract_as;
use crate::schema::{
    GeneratedSections, GenerationRequest, JourneyStage, MissingFields, UvpDerivedFacts,
};

const HYBRID_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/hybrid_fill.md"
));

/// Result of a hybrid run. Always structurally complete.
#[derive(Debug)]
pub struct HybridOutcome {
    pub generated: GeneratedSections,
    /// True when the completion response could not be used and the
    /// structural defaults were substituted.
    pub defaulted: bool,
}

/// Run the single gap-fill call.
pub fn run_hybrid(
    client: &dyn CompletionClient,
    request: &GenerationRequest,
    facts: &UvpDerivedFacts,
    missing: &MissingFields,
) -> HybridOutcome {
    let prompt = hybrid_prompt(request, facts, missing);
    let completion_request = CompletionRequest::new(prompt, HYBRID_MAX_TOKENS, HYBRID_TIMEOUT);

    let response = match client.complete(&completion_request) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "hybrid completion failed, substituting defaults");
            return HybridOutcome {
                generated: default_sections(),
                defaulted: true,
            };
        }
    };

    match extract_as::<GeneratedSections>(&response) {
        Ok(mut generated) => {
            fill_structural_gaps(&mut generated);
            HybridOutcome {
                generated,
                defaulted: false,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "hybrid response unusable, substituting defaults");
            HybridOutcome {
                generated: default_sections(),
                defaulted: true,
            }
        }
    }
}

/// The documented structural default: empty lists plus a generic five-stage
/// journey, so downstream consumers always find every key present.
pub fn default_sections() -> GeneratedSections {
    GeneratedSections {
        customer_journey: default_journey(),
        ..GeneratedSections::default()
    }
}

fn default_journey() -> Vec<JourneyStage> {
    [
        ("Awareness", "The customer realizes they have a need this specialty addresses."),
        ("Consideration", "The customer compares providers and approaches."),
        ("Decision", "The customer selects a provider and commits."),
        ("Onboarding", "The customer experiences the service for the first time."),
        ("Advocacy", "A satisfied customer returns and refers others."),
    ]
    .into_iter()
    .map(|(name, description)| JourneyStage {
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}

/// A parsed response may still omit the journey; keep the structural
/// guarantee without touching sections the response did fill.
fn fill_structural_gaps(generated: &mut GeneratedSections) {
    if generated.customer_journey.is_empty() {
        generated.customer_journey = default_journey();
    }
}

fn hybrid_prompt(
    request: &GenerationRequest,
    facts: &UvpDerivedFacts,
    missing: &MissingFields,
) -> String {
    let known_facts =
        serde_json::to_string_pretty(facts).unwrap_or_else(|_| "{}".to_string());
    let missing_sections = missing
        .section_names()
        .iter()
        .map(|name| format!("- `{name}`"))
        .collect::<Vec<_>>()
        .join("\n");
    HYBRID_TEMPLATE
        .replace("{specialty_name}", &request.specialty_name)
        .replace(
            "{business_profile_type}",
            request.business_profile_type.as_str(),
        )
        .replace("{known_facts}", &known_facts)
        .replace("{missing_sections}", &missing_sections)
}
