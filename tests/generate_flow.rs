//! End-to-end generation flows against a scripted completion backend and a
//! temp-dir store.

mod common;

use common::{
    hybrid_facts, hybrid_request, multipass_request, structural_json, temp_store, ScriptedClient,
};
use profilegen::completion::BackoffPolicy;
use profilegen::error::GenerationError;
use profilegen::merge::enabled_tabs;
use profilegen::orchestrator::generate;
use profilegen::schema::StrategyMode;
use profilegen::state::GenerationState;
use profilegen::store::{identity_hash, HistoryEntry};
use std::fs;
use std::time::Duration;

#[test]
fn multipass_success_persists_complete_row() {
    let (dir, store) = temp_store();
    let client = ScriptedClient::new(vec![
        Ok(structural_json(3, 0)),
        Ok(structural_json(8, 18)),
        Ok(structural_json(8, 18)),
    ]);
    let request = multipass_request();

    let outcome = generate(&store, &client, &BackoffPolicy::none(), &request).unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.status, GenerationState::Complete);
    assert_eq!(outcome.mode, StrategyMode::Multipass);
    assert!(outcome.validation_score >= 60);
    let stages = outcome.stage_results.as_ref().unwrap();
    assert!(stages.stage1.success && stages.stage2.success && stages.stage3.success);

    let hash = identity_hash(&request.specialty_name, request.business_profile_type);
    assert_eq!(outcome.profile_id.as_deref(), Some(hash.as_str()));

    let row = store.load(&hash).unwrap().unwrap();
    assert_eq!(row.generation_status, GenerationState::Complete);
    assert!(row.generation_completed_at_epoch_ms.is_some());
    assert_eq!(row.validation_score, Some(outcome.validation_score));
    assert_eq!(row.summary.buying_triggers.len(), 8);
    assert_eq!(
        row.enabled_tabs,
        Some(enabled_tabs(request.business_profile_type))
    );
    let profile = row.profile_data.unwrap();
    assert_eq!(profile.identity.slug, "mobile-pet-grooming");
    assert_eq!(profile.identity.classification_code, "812910");
    assert_eq!(profile.identity.category.as_deref(), Some("Pet Services"));

    let history = fs::read_to_string(dir.path().join("history.jsonl")).unwrap();
    assert_eq!(history.lines().count(), 1);
}

#[test]
fn multipass_low_score_escalates_to_needs_human() {
    // Stage 1 validates but stages 2 and 3 never raise the content counts,
    // so the final score stays under the bar.
    let (_dir, store) = temp_store();
    let weak = || Ok(structural_json(3, 0));
    let client = ScriptedClient::new(vec![
        Ok(structural_json(3, 0)),
        weak(),
        weak(),
        weak(),
        Ok(structural_json(3, 0)),
    ]);
    let request = multipass_request();

    let outcome = generate(&store, &client, &BackoffPolicy::none(), &request).unwrap();

    assert!(!outcome.success);
    assert!(outcome.needs_human);
    assert_eq!(outcome.status, GenerationState::NeedsHuman);
    assert!(outcome.validation_score < 60);
    assert!(outcome.error.as_deref().unwrap().contains("below minimum"));
    assert!(outcome.profile.is_none());

    let hash = identity_hash(&request.specialty_name, request.business_profile_type);
    let row = store.load(&hash).unwrap().unwrap();
    assert_eq!(row.generation_status, GenerationState::NeedsHuman);
    assert!(row.profile_data.is_none());
    assert!(row.last_error.is_some());
}

#[test]
fn stage1_exhaustion_fails_with_stage_report() {
    let (dir, store) = temp_store();
    let timeout = || Err(GenerationError::Timeout(Duration::from_secs(60)));
    let client = ScriptedClient::new(vec![timeout(), timeout(), timeout()]);
    let request = multipass_request();

    let outcome = generate(&store, &client, &BackoffPolicy::none(), &request).unwrap();

    assert!(!outcome.success);
    assert!(!outcome.needs_human);
    assert_eq!(outcome.status, GenerationState::Failed);
    assert!(outcome
        .error
        .as_deref()
        .unwrap()
        .contains("Stage 1 failed after 3 attempts"));
    let stages = outcome.stage_results.as_ref().unwrap();
    assert_eq!(stages.stage1.attempts, 3);
    assert_eq!(stages.stage2.attempts, 0);
    assert_eq!(stages.stage3.attempts, 0);

    let hash = identity_hash(&request.specialty_name, request.business_profile_type);
    let row = store.load(&hash).unwrap().unwrap();
    assert_eq!(row.generation_status, GenerationState::Failed);
    assert!(row.profile_data.is_none());

    let history = fs::read_to_string(dir.path().join("history.jsonl")).unwrap();
    let entry: HistoryEntry = serde_json::from_str(history.lines().next().unwrap()).unwrap();
    assert_eq!(entry.status, GenerationState::Failed);
    assert_eq!(entry.stage_attempts.unwrap().stage1.attempts, 3);
}

#[test]
fn hybrid_propagates_facts_verbatim_in_one_call() {
    let (_dir, store) = temp_store();
    let response = serde_json::json!({
        "market_trends": ["continuous compliance tooling"],
        "power_words": ["audit-ready", "automated", "continuous"],
        "customer_journey": [
            {"name": "Awareness", "description": "an audit gets scheduled"}
        ]
    })
    .to_string();
    let client = ScriptedClient::new(vec![Ok(response)]);
    let request = hybrid_request();

    let outcome = generate(&store, &client, &BackoffPolicy::none(), &request).unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.mode, StrategyMode::Hybrid);
    assert_eq!(client.calls(), 1);
    assert!(outcome.stage_results.is_none());

    let profile = outcome.profile.unwrap();
    assert_eq!(profile.facts, hybrid_facts());
    assert_eq!(
        profile
            .facts
            .full_uvp
            .as_ref()
            .unwrap()
            .benefit_statement,
        "audit-ready every day"
    );
    // Global SaaS gets no physical-presence tabs
    assert!(!profile.enabled_tabs.local);
    assert!(!profile.enabled_tabs.weather);
    assert!(profile.enabled_tabs.trends);
}

#[test]
fn hybrid_timeout_still_completes_with_defaults() {
    let (_dir, store) = temp_store();
    let client = ScriptedClient::new(vec![Err(GenerationError::Timeout(Duration::from_secs(
        30,
    )))]);
    let request = hybrid_request();

    let outcome = generate(&store, &client, &BackoffPolicy::none(), &request).unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.status, GenerationState::Complete);
    assert!(!outcome.needs_human);
    let profile = outcome.profile.unwrap();
    assert_eq!(profile.generated.customer_journey.len(), 5);
    assert!(profile.generated.market_trends.is_empty());
    assert_eq!(profile.facts, hybrid_facts());
}

#[test]
fn rejected_request_leaves_no_files() {
    let (dir, store) = temp_store();
    let client = ScriptedClient::new(vec![]);
    let mut request = multipass_request();
    request.specialty_description = String::new();

    let err = generate(&store, &client, &BackoffPolicy::none(), &request).unwrap_err();
    assert!(matches!(err, GenerationError::InvalidRequest(_)));
    assert_eq!(client.calls(), 0);
    assert!(!dir.path().join("profiles").exists());
    assert!(!dir.path().join("history.jsonl").exists());
}

#[test]
fn repeat_generation_overwrites_the_single_row() {
    let (dir, store) = temp_store();
    let request = hybrid_request();
    let hash = identity_hash(&request.specialty_name, request.business_profile_type);

    for _ in 0..2 {
        let client = ScriptedClient::new(vec![Ok("{}".into())]);
        let outcome = generate(&store, &client, &BackoffPolicy::none(), &request).unwrap();
        assert!(outcome.success);
    }

    let rows: Vec<_> = fs::read_dir(dir.path().join("profiles"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(store.load(&hash).unwrap().is_some());

    let history = fs::read_to_string(dir.path().join("history.jsonl")).unwrap();
    assert_eq!(history.lines().count(), 2);
}
