//! Shared test infrastructure for integration tests.

use profilegen::completion::{CompletionClient, CompletionRequest};
use profilegen::error::GenerationError;
use profilegen::schema::{BusinessProfileType, FullUvp, GenerationRequest, UvpDerivedFacts};
use profilegen::store::ProfileStore;
use std::cell::RefCell;
use tempfile::TempDir;

/// Scripted completion backend: pops queued results in order and records
/// every prompt it was sent.
pub struct ScriptedClient {
    responses: RefCell<Vec<Result<String, GenerationError>>>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        ScriptedClient {
            responses: RefCell::new(responses),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl CompletionClient for ScriptedClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.prompts.borrow_mut().push(request.prompt.clone());
        let mut responses = self.responses.borrow_mut();
        if responses.is_empty() {
            return Err(GenerationError::Transport("script exhausted".into()));
        }
        responses.remove(0)
    }
}

pub fn temp_store() -> (TempDir, ProfileStore) {
    let dir = TempDir::new().expect("create temp store");
    let store = ProfileStore::new(dir.path().to_path_buf());
    (dir, store)
}

/// A request with no deterministic facts, selecting the multipass strategy.
pub fn multipass_request() -> GenerationRequest {
    GenerationRequest {
        request_id: Some("req-1".into()),
        specialty_name: "Mobile Pet Grooming".into(),
        specialty_description: "Van-based grooming for dogs and cats".into(),
        base_classification_code: Some("812910".into()),
        business_profile_type: BusinessProfileType::LocalServiceB2c,
        uvp_hints: Some("busy suburban pet owners".into()),
        uvp_derived_facts: None,
        missing_fields: None,
    }
}

/// A request carrying deterministic facts, selecting the hybrid strategy.
pub fn hybrid_request() -> GenerationRequest {
    GenerationRequest {
        request_id: Some("req-2".into()),
        specialty_name: "Compliance SaaS".into(),
        specialty_description: "Audit automation for fintech teams".into(),
        base_classification_code: Some("541511".into()),
        business_profile_type: BusinessProfileType::GlobalSaasB2b,
        uvp_hints: None,
        uvp_derived_facts: Some(hybrid_facts()),
        missing_fields: None,
    }
}

pub fn hybrid_facts() -> UvpDerivedFacts {
    UvpDerivedFacts {
        pain_points: vec!["manual evidence collection".into()],
        buying_triggers: vec!["upcoming SOC 2 audit".into()],
        urgency_drivers: vec!["audit window closing".into()],
        competitive_advantages: vec!["continuous monitoring".into()],
        trust_builders: vec!["SOC 2 certified ourselves".into()],
        objection_handlers: vec!["integrates with existing stack".into()],
        transformations: vec!["weeks of prep become hours".into()],
        success_metrics: vec!["audit prep time".into()],
        full_uvp: Some(FullUvp {
            customer_statement: "for fintech compliance teams".into(),
            product_statement: "an automated evidence pipeline".into(),
            benefit_statement: "audit-ready every day".into(),
            solution_statement: "continuous control monitoring".into(),
        }),
    }
}

/// A multipass response body with the given trigger and power-word counts.
/// Triggers are long phrases so the refinement gate passes on them.
pub fn structural_json(triggers: usize, power_words: usize) -> String {
    let triggers: Vec<String> = (0..triggers)
        .map(|i| format!("booked a spring grooming slot {i}"))
        .collect();
    let words: Vec<String> = (0..power_words).map(|i| format!("word{i}")).collect();
    serde_json::json!({
        "category": "Pet Services",
        "subcategory": "Mobile Grooming",
        "buying_triggers": triggers,
        "urgency_drivers": ["matted coat risk", "summer heat wave", "vet referral"],
        "objection_handlers": ["price concern", "stranger anxiety", "scheduling"],
        "power_words": words,
    })
    .to_string()
}
