//! Multipass generation strategy.
//!
//! Three sequential stages, each with its own validator and a budget of
//! [`MAX_STAGE_ATTEMPTS`] attempts: structure builds a full candidate profile,
//! enhancement raises content counts, refinement makes trigger phrases
//! concrete. Stage 1 is mandatory; the later stages keep the best prior draft
//! when their budget runs out.
use crate::completion::{
    BackoffPolicy, CompletionClient, CompletionRequest, FULL_PROFILE_MAX_TOKENS,
    MULTIPASS_TIMEOUT, REFINEMENT_MAX_TOKENS,
};
use crate::error::GenerationError;
use crate::extract::extract_as;
use crate::schema::{GenerationRequest, ProfileDraft, StageAttempt, StageResults, MAX_STAGE_ATTEMPTS};
use crate::validators::{enhancement_gate, refinement_gate, structure_gate, ValidationOutcome};

const STAGE1_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/stage1_structure.md"
));
const STAGE2_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/stage2_enhance.md"
));
const STAGE3_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/stage3_refine.md"
));

/// Result of a full multipass run.
#[derive(Debug)]
pub struct MultipassOutcome {
    pub stage_results: StageResults,
    pub result: Result<ProfileDraft, GenerationError>,
}

/// Run the three-stage pipeline against the completion client.
pub fn run_multipass(
    client: &dyn CompletionClient,
    backoff: &BackoffPolicy,
    request: &GenerationRequest,
) -> MultipassOutcome {
    let mut stages = StageResults::default();

    let stage1 = run_stage(
        client,
        backoff,
        &mut stages.stage1,
        FULL_PROFILE_MAX_TOKENS,
        |last_error| stage1_prompt(request, last_error),
        structure_gate,
    );
    let mut draft = match stage1 {
        Some(draft) => draft,
        None => {
            let reason = stages
                .stage1
                .last_error
                .clone()
                .unwrap_or_else(|| "structure validator never passed".to_string());
            tracing::info!(attempts = stages.stage1.attempts, "stage 1 exhausted");
            return MultipassOutcome {
                result: Err(GenerationError::QualityGate {
                    stage: 1,
                    attempts: stages.stage1.attempts,
                    reason,
                }),
                stage_results: stages,
            };
        }
    };
    tracing::info!(attempts = stages.stage1.attempts, "stage 1 validated");

    if let Some(enhanced) = run_stage(
        client,
        backoff,
        &mut stages.stage2,
        FULL_PROFILE_MAX_TOKENS,
        |last_error| stage2_prompt(request, &draft, last_error),
        enhancement_gate,
    ) {
        draft = enhanced;
        tracing::info!(attempts = stages.stage2.attempts, "stage 2 validated");
    } else {
        tracing::info!(
            attempts = stages.stage2.attempts,
            "stage 2 exhausted, keeping stage 1 profile"
        );
    }

    if let Some(refined) = run_stage(
        client,
        backoff,
        &mut stages.stage3,
        REFINEMENT_MAX_TOKENS,
        |last_error| stage3_prompt(request, &draft, last_error),
        refinement_gate,
    ) {
        draft = refined;
        tracing::info!(attempts = stages.stage3.attempts, "stage 3 validated");
    } else {
        tracing::info!(
            attempts = stages.stage3.attempts,
            "stage 3 exhausted, keeping best prior profile"
        );
    }

    MultipassOutcome {
        stage_results: stages,
        result: Ok(draft),
    }
}

/// Run one stage's attempt loop. Returns the validated draft, or `None` when
/// the budget is exhausted; `record` holds attempts and the last error.
fn run_stage(
    client: &dyn CompletionClient,
    backoff: &BackoffPolicy,
    record: &mut StageAttempt,
    max_tokens: u32,
    build_prompt: impl Fn(Option<&str>) -> String,
    gate: impl Fn(&ProfileDraft) -> ValidationOutcome,
) -> Option<ProfileDraft> {
    while record.attempts < MAX_STAGE_ATTEMPTS {
        if record.attempts > 0 {
            backoff.pause(record.attempts);
        }
        record.attempts += 1;

        let prompt = build_prompt(record.last_error.as_deref());
        let completion_request =
            CompletionRequest::new(prompt, max_tokens, MULTIPASS_TIMEOUT);

        let response = match client.complete(&completion_request) {
            Ok(text) => text,
            Err(err) => {
                record.last_error = Some(err.to_string());
                if !err.is_retryable() {
                    tracing::debug!(error = %err, "stage attempt failed fatally");
                    return None;
                }
                tracing::debug!(attempt = record.attempts, error = %err, "stage attempt failed");
                continue;
            }
        };

        let draft: ProfileDraft = match extract_as(&response) {
            Ok(draft) => draft,
            Err(err) => {
                record.last_error = Some(err.to_string());
                tracing::debug!(attempt = record.attempts, error = %err, "response rejected");
                continue;
            }
        };

        let outcome = gate(&draft);
        if outcome.passed {
            record.success = true;
            record.last_error = None;
            return Some(draft);
        }
        record.last_error = Some(outcome.summary());
        tracing::debug!(attempt = record.attempts, reasons = %outcome.summary(), "gate failed");
    }
    None
}

fn stage1_prompt(request: &GenerationRequest, last_error: Option<&str>) -> String {
    let customer_hint = match request.uvp_hints.as_deref() {
        Some(hint) if !hint.trim().is_empty() => format!("- Target customer: {hint}\n"),
        _ => String::new(),
    };
    STAGE1_TEMPLATE
        .replace("{specialty_name}", &request.specialty_name)
        .replace("{specialty_description}", &request.specialty_description)
        .replace(
            "{business_profile_type}",
            request.business_profile_type.as_str(),
        )
        .replace(
            "{classification_code}",
            request.base_classification_code.as_deref().unwrap_or("none"),
        )
        .replace("{customer_hint}", &customer_hint)
        .replace("{retry_section}", &retry_section(last_error))
}

fn stage2_prompt(
    request: &GenerationRequest,
    draft: &ProfileDraft,
    last_error: Option<&str>,
) -> String {
    STAGE2_TEMPLATE
        .replace("{specialty_name}", &request.specialty_name)
        .replace(
            "{business_profile_type}",
            request.business_profile_type.as_str(),
        )
        .replace("{current_profile}", &draft_json(draft))
        .replace("{retry_section}", &retry_section(last_error))
}

fn stage3_prompt(
    request: &GenerationRequest,
    draft: &ProfileDraft,
    last_error: Option<&str>,
) -> String {
    STAGE3_TEMPLATE
        .replace("{specialty_name}", &request.specialty_name)
        .replace("{current_profile}", &draft_json(draft))
        .replace("{retry_section}", &retry_section(last_error))
}

fn draft_json(draft: &ProfileDraft) -> String {
    serde_json::to_string_pretty(draft).unwrap_or_else(|_| "{}".to_string())
}

fn retry_section(last_error: Option<&str>) -> String {
    match last_error {
        Some(error) => format!(
            "\n## Previous attempt\n\nYour previous response was rejected: {error}\nFix this and respond again with the full JSON object.\n"
        ),
        None => String::new(),
    }
}
