//! Validation scoring.
//!
//! Both formulas are pure functions of the final profile content plus the
//! stage-result record; identical inputs always yield identical scores.
use crate::schema::{GeneratedSections, ProfileDraft, StageResults, UvpDerivedFacts};

const LIST_TIERS_10: [(usize, u32); 4] = [(7, 10), (5, 7), (3, 4), (1, 2)];
const POWER_WORD_TIERS_10: [(usize, u32); 4] = [(15, 10), (10, 7), (5, 4), (1, 2)];
const DICTIONARY_TIERS_10: [(usize, u32); 4] = [(40, 10), (20, 7), (10, 4), (1, 2)];
const HOOK_TIERS_10: [(usize, u32); 4] = [(20, 10), (10, 7), (5, 4), (1, 2)];

const FACT_TIERS_6: [(usize, u32); 3] = [(5, 6), (3, 4), (1, 2)];
const LIST_TIERS_5: [(usize, u32); 3] = [(5, 5), (3, 3), (1, 1)];
const TOTAL_TIERS_5: [(usize, u32); 3] = [(10, 5), (5, 3), (1, 1)];

/// Multipass score: stage-completion points (max 40) plus tiered content
/// points across six measures (max 60).
pub fn multipass_score(draft: &ProfileDraft, stages: &StageResults) -> u32 {
    let mut score = 0;
    if stages.stage1.success {
        score += 20;
    }
    if stages.stage2.success {
        score += 10;
    }
    if stages.stage3.success {
        score += 10;
    }

    score += tiered(draft.facts.buying_triggers.len(), &LIST_TIERS_10);
    score += tiered(draft.facts.urgency_drivers.len(), &LIST_TIERS_10);
    score += tiered(draft.facts.objection_handlers.len(), &LIST_TIERS_10);
    score += tiered(draft.generated.power_words.len(), &POWER_WORD_TIERS_10);
    score += tiered(draft.generated.dictionary_word_count(), &DICTIONARY_TIERS_10);
    score += tiered(draft.generated.hook_count(), &HOOK_TIERS_10);
    score
}

/// Hybrid score: deterministic-section presence/count points (max 50) plus
/// generated-section threshold points (max 50).
pub fn hybrid_score(facts: &UvpDerivedFacts, generated: &GeneratedSections) -> u32 {
    let mut score = 0;

    let fact_sections = [
        &facts.pain_points,
        &facts.buying_triggers,
        &facts.urgency_drivers,
        &facts.competitive_advantages,
        &facts.trust_builders,
        &facts.objection_handlers,
        &facts.transformations,
        &facts.success_metrics,
    ];
    for section in fact_sections {
        score += tiered(section.len(), &FACT_TIERS_6);
    }
    if facts.full_uvp.is_some() {
        score += 2;
    }

    let generated_lists = [
        &generated.market_trends,
        &generated.seasonal_patterns,
        &generated.geographic_variation,
        &generated.headline_templates,
        &generated.power_words,
        &generated.avoid_words,
        &generated.innovation_opportunities,
    ];
    for section in generated_lists {
        score += tiered(section.len(), &LIST_TIERS_5);
    }
    score += tiered(generated.customer_journey.len(), &LIST_TIERS_5);
    score += tiered(generated.hook_count(), &TOTAL_TIERS_5);
    score += tiered(generated.dictionary_word_count(), &TOTAL_TIERS_5);
    score
}

fn tiered(count: usize, tiers: &[(usize, u32)]) -> u32 {
    for (threshold, points) in tiers {
        if count >= *threshold {
            return *points;
        }
    }
    0
}
