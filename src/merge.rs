//! Canonical profile assembly.
//!
//! Deterministic facts and generated sections are copied verbatim; identity
//! fields are derived from the request. Merging has no hidden state and is
//! idempotent given identical inputs.
use crate::schema::{
    BusinessProfileType, CanonicalProfile, EnabledTabs, GeneratedSections, GenerationRequest,
    ProfileDraft, ProfileIdentity, UvpDerivedFacts, PROFILE_VERSION,
};
use regex::Regex;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel classification code when no nearest-fit code was supplied.
pub const DEFAULT_CLASSIFICATION_CODE: &str = "999999";

/// Derive the tab flag-set from the business-profile type alone.
///
/// Local-service variants and regional retail are the only archetypes with a
/// meaningful physical footprint, so only they enable the location and
/// weather tabs. Seasonal follows physical presence; trends is universal.
pub fn enabled_tabs(profile_type: BusinessProfileType) -> EnabledTabs {
    let physical = matches!(
        profile_type,
        BusinessProfileType::LocalServiceB2c
            | BusinessProfileType::LocalServiceB2b
            | BusinessProfileType::RegionalRetail
    );
    EnabledTabs {
        local: physical,
        weather: physical,
        seasonal: physical,
        trends: true,
    }
}

/// Lowercase, hyphen-separated slug for a specialty name.
pub fn slugify(name: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let pattern = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));
    pattern
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Combine deterministic facts and generated sections into the canonical
/// persisted shape.
pub fn merge(
    request: &GenerationRequest,
    facts: UvpDerivedFacts,
    generated: GeneratedSections,
    category: Option<String>,
    subcategory: Option<String>,
) -> CanonicalProfile {
    let identity = ProfileIdentity {
        slug: slugify(&request.specialty_name),
        display_name: request.specialty_name.clone(),
        classification_code: request
            .base_classification_code
            .clone()
            .unwrap_or_else(|| DEFAULT_CLASSIFICATION_CODE.to_string()),
        category,
        subcategory,
    };
    CanonicalProfile {
        identity,
        business_profile_type: request.business_profile_type,
        facts,
        generated,
        enabled_tabs: enabled_tabs(request.business_profile_type),
        version: PROFILE_VERSION.to_string(),
        generated_at_epoch_ms: now_epoch_ms(),
        staleness_score: 0,
    }
}

/// Merge a multipass draft, whose facts were themselves generated.
pub fn merge_draft(request: &GenerationRequest, draft: ProfileDraft) -> CanonicalProfile {
    merge(
        request,
        draft.facts,
        draft.generated,
        draft.category,
        draft.subcategory,
    )
}

pub fn now_epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}
