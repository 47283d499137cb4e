//! Generation orchestration.
//!
//! Owns the status state machine and the persistence row; strategies only
//! return results. Malformed requests fail fast with zero persistence side
//! effects, and persistence failures never discard a computed profile.
use crate::completion::{BackoffPolicy, CompletionClient};
use crate::error::GenerationError;
use crate::hybrid::run_hybrid;
use crate::merge::{merge, merge_draft, now_epoch_ms};
use crate::multipass::run_multipass;
use crate::schema::{
    CanonicalProfile, GenerationRequest, MissingFields, StageResults, StrategyMode,
    MIN_MULTIPASS_SCORE,
};
use crate::score::{hybrid_score, multipass_score};
use crate::state::GenerationState;
use crate::store::{identity_hash, HistoryEntry, PersistedRow, ProfileStore, RowSummary};
use serde::Serialize;
use std::time::Instant;

/// Result of one generation run, mirroring the persisted terminal state.
#[derive(Debug, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub status: GenerationState,
    pub mode: StrategyMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<CanonicalProfile>,
    pub validation_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_results: Option<StageResults>,
    pub needs_human: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time_ms: u128,
}

/// Run one generation end to end.
///
/// Returns `Err` only for rejected requests; strategy failures come back as
/// an outcome with `success: false` and a stage-by-stage attempt report.
pub fn generate(
    store: &ProfileStore,
    client: &dyn CompletionClient,
    backoff: &BackoffPolicy,
    request: &GenerationRequest,
) -> Result<GenerationOutcome, GenerationError> {
    validate_request(request)?;

    let started = Instant::now();
    let started_at = now_epoch_ms();
    let row_id = identity_hash(&request.specialty_name, request.business_profile_type);
    let mode = if request.uvp_derived_facts.is_some() {
        StrategyMode::Hybrid
    } else {
        StrategyMode::Multipass
    };
    tracing::info!(specialty = %request.specialty_name, %mode, "generation started");

    begin_row(store, &row_id, request, started_at);

    let (status, profile, score, stage_results, error) = match mode {
        StrategyMode::Hybrid => run_hybrid_strategy(client, request),
        StrategyMode::Multipass => run_multipass_strategy(client, backoff, request),
    };

    finish_row(
        store, &row_id, request, started_at, status, &profile, score, &stage_results, &error, mode,
    );
    tracing::info!(%status, score, "generation finished");

    Ok(GenerationOutcome {
        success: status == GenerationState::Complete,
        status,
        mode,
        profile_id: Some(row_id),
        profile,
        validation_score: score,
        stage_results,
        needs_human: status == GenerationState::NeedsHuman,
        error,
        response_time_ms: started.elapsed().as_millis(),
    })
}

type StrategyResult = (
    GenerationState,
    Option<CanonicalProfile>,
    u32,
    Option<StageResults>,
    Option<String>,
);

fn run_hybrid_strategy(
    client: &dyn CompletionClient,
    request: &GenerationRequest,
) -> StrategyResult {
    // mode selection guarantees facts are present on this path
    let facts = request.uvp_derived_facts.clone().unwrap_or_default();
    let missing = request.missing_fields.unwrap_or_else(MissingFields::all);
    let outcome = run_hybrid(client, request, &facts, &missing);
    let score = hybrid_score(&facts, &outcome.generated);
    let profile = merge(request, facts, outcome.generated, None, None);
    (
        GenerationState::Complete,
        Some(profile),
        score,
        None,
        None,
    )
}

fn run_multipass_strategy(
    client: &dyn CompletionClient,
    backoff: &BackoffPolicy,
    request: &GenerationRequest,
) -> StrategyResult {
    let outcome = run_multipass(client, backoff, request);
    let stages = outcome.stage_results;
    match outcome.result {
        Ok(draft) => {
            let score = multipass_score(&draft, &stages);
            if score >= MIN_MULTIPASS_SCORE {
                let profile = merge_draft(request, draft);
                (
                    GenerationState::Complete,
                    Some(profile),
                    score,
                    Some(stages),
                    None,
                )
            } else {
                // Structure validated but content never reached the quality
                // bar: a human can salvage this, so escalate instead of
                // discarding as failed.
                let error = format!(
                    "validation score {score} below minimum {MIN_MULTIPASS_SCORE}"
                );
                (
                    GenerationState::NeedsHuman,
                    None,
                    score,
                    Some(stages),
                    Some(error),
                )
            }
        }
        Err(err) => (
            GenerationState::Failed,
            None,
            0,
            Some(stages),
            Some(err.to_string()),
        ),
    }
}

fn validate_request(request: &GenerationRequest) -> Result<(), GenerationError> {
    if request.specialty_name.trim().is_empty() {
        return Err(GenerationError::InvalidRequest(
            "specialty_name is required".into(),
        ));
    }
    if request.specialty_description.trim().is_empty() {
        return Err(GenerationError::InvalidRequest(
            "specialty_description is required".into(),
        ));
    }
    Ok(())
}

/// Mark the row generating. A racing request may overwrite an in-flight row;
/// there is no cross-request locking by design.
fn begin_row(store: &ProfileStore, row_id: &str, request: &GenerationRequest, started_at: u128) {
    let previous = match store.load(row_id) {
        Ok(row) => row.map(|row| row.generation_status),
        Err(err) => {
            tracing::warn!(error = %err, "could not read existing row");
            None
        }
    };
    let status = match previous {
        None => GenerationState::Pending
            .transition_to(GenerationState::Generating)
            .expect("pending -> generating"),
        Some(GenerationState::Generating) => {
            tracing::warn!(row_id, "overwriting in-flight generating row");
            GenerationState::Generating
        }
        Some(state) => state
            .transition_to(GenerationState::Generating)
            .expect("re-entry via new request"),
    };

    let row = PersistedRow {
        identity_hash: row_id.to_string(),
        specialty_name: request.specialty_name.clone(),
        business_profile_type: request.business_profile_type,
        generation_status: status,
        generation_started_at_epoch_ms: started_at,
        generation_completed_at_epoch_ms: None,
        profile_data: None,
        summary: RowSummary::default(),
        enabled_tabs: None,
        validation_score: None,
        last_error: None,
    };
    if let Err(err) = store.upsert(&row) {
        tracing::warn!(error = %err, "could not persist generating row");
    }
}

#[allow(clippy::too_many_arguments)]
fn finish_row(
    store: &ProfileStore,
    row_id: &str,
    request: &GenerationRequest,
    started_at: u128,
    status: GenerationState,
    profile: &Option<CanonicalProfile>,
    score: u32,
    stage_results: &Option<StageResults>,
    error: &Option<String>,
    mode: StrategyMode,
) {
    let finished_at = now_epoch_ms();
    let terminal = GenerationState::Generating
        .transition_to(status)
        .expect("generating -> terminal");

    let row = PersistedRow {
        identity_hash: row_id.to_string(),
        specialty_name: request.specialty_name.clone(),
        business_profile_type: request.business_profile_type,
        generation_status: terminal,
        generation_started_at_epoch_ms: started_at,
        generation_completed_at_epoch_ms: Some(finished_at),
        summary: profile
            .as_ref()
            .map(RowSummary::from_profile)
            .unwrap_or_default(),
        enabled_tabs: profile.as_ref().map(|profile| profile.enabled_tabs),
        profile_data: profile.clone(),
        validation_score: Some(score),
        last_error: error.clone(),
    };
    if let Err(err) = store.upsert(&row) {
        tracing::warn!(error = %err, "could not persist terminal row, returning result anyway");
    }

    let entry = HistoryEntry {
        identity_hash: row_id.to_string(),
        status: terminal,
        mode,
        validation_score: Some(score),
        stage_attempts: stage_results.clone(),
        finished_at_epoch_ms: finished_at,
        error: error.clone(),
    };
    if let Err(err) = store.append_history(&entry) {
        tracing::warn!(error = %err, "could not append history entry");
    }
}
