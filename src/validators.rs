//! Stage quality gates.
//!
//! Each gate is a named predicate over a candidate profile returning a
//! structured outcome, so a failed stage can report why it failed rather than
//! just that it did.
use crate::schema::ProfileDraft;

/// Outcome of one quality gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub reasons: Vec<String>,
}

impl ValidationOutcome {
    fn pass() -> Self {
        ValidationOutcome {
            passed: true,
            reasons: Vec::new(),
        }
    }

    fn fail(reasons: Vec<String>) -> Self {
        ValidationOutcome {
            passed: false,
            reasons,
        }
    }

    /// Reasons joined for attempt bookkeeping.
    pub fn summary(&self) -> String {
        self.reasons.join("; ")
    }
}

/// Stage 1 gate: identity present and the three core fact lists each have at
/// least 3 entries. Mandatory; the run fails if this never passes.
pub fn structure_gate(draft: &ProfileDraft) -> ValidationOutcome {
    let mut reasons = Vec::new();
    if !matches!(draft.category.as_deref(), Some(category) if !category.is_empty()) {
        reasons.push("category is missing".to_string());
    }
    require_count(
        &mut reasons,
        "buying_triggers",
        draft.facts.buying_triggers.len(),
        3,
    );
    require_count(
        &mut reasons,
        "urgency_drivers",
        draft.facts.urgency_drivers.len(),
        3,
    );
    require_count(
        &mut reasons,
        "objection_handlers",
        draft.facts.objection_handlers.len(),
        3,
    );
    if reasons.is_empty() {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(reasons)
    }
}

/// Stage 2 gate: the enhancement call raised trigger and power-word counts.
pub fn enhancement_gate(draft: &ProfileDraft) -> ValidationOutcome {
    let mut reasons = Vec::new();
    require_count(
        &mut reasons,
        "buying_triggers",
        draft.facts.buying_triggers.len(),
        5,
    );
    require_count(
        &mut reasons,
        "power_words",
        draft.generated.power_words.len(),
        10,
    );
    if reasons.is_empty() {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(reasons)
    }
}

/// Stage 3 gate: triggers read as concrete events, proxied by a mean phrase
/// length of at least 4 words.
pub fn refinement_gate(draft: &ProfileDraft) -> ValidationOutcome {
    let mean = mean_phrase_words(&draft.facts.buying_triggers);
    if mean >= 4.0 {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(vec![format!(
            "buying triggers average {mean:.1} words, need >= 4"
        )])
    }
}

/// Mean whitespace-separated word count across phrases; 0 for an empty list.
pub fn mean_phrase_words(phrases: &[String]) -> f64 {
    if phrases.is_empty() {
        return 0.0;
    }
    let total: usize = phrases
        .iter()
        .map(|phrase| phrase.split_whitespace().count())
        .sum();
    total as f64 / phrases.len() as f64
}

fn require_count(reasons: &mut Vec<String>, label: &str, actual: usize, minimum: usize) {
    if actual < minimum {
        reasons.push(format!("{label} has {actual} entries, need >= {minimum}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn structural_draft() -> ProfileDraft {
        let mut draft = ProfileDraft {
            category: Some("Pet Services".into()),
            ..ProfileDraft::default()
        };
        draft.facts.buying_triggers = phrases(&[
            "new puppy adoption",
            "spring shedding season",
            "upcoming family photos",
        ]);
        draft.facts.urgency_drivers =
            phrases(&["matted coat risk", "summer heat wave", "vet referral"]);
        draft.facts.objection_handlers =
            phrases(&["price concern", "stranger anxiety", "scheduling"]);
        draft
    }

    #[test]
    fn structure_gate_passes_at_three_each() {
        assert!(structure_gate(&structural_draft()).passed);
    }

    #[test]
    fn structure_gate_reports_every_shortfall() {
        let draft = ProfileDraft::default();
        let outcome = structure_gate(&draft);
        assert!(!outcome.passed);
        assert_eq!(outcome.reasons.len(), 4);
        assert!(outcome.summary().contains("buying_triggers"));
        assert!(outcome.summary().contains("category"));
    }

    #[test]
    fn enhancement_gate_needs_five_triggers_and_ten_power_words() {
        let mut draft = structural_draft();
        assert!(!enhancement_gate(&draft).passed);

        draft
            .facts
            .buying_triggers
            .extend(phrases(&["lease renewal notice", "holiday travel booked"]));
        draft.generated.power_words = (0..10).map(|i| format!("word{i}")).collect();
        assert!(enhancement_gate(&draft).passed);
    }

    #[test]
    fn refinement_gate_uses_mean_trigger_length() {
        let mut draft = ProfileDraft::default();
        draft.facts.buying_triggers = phrases(&["needs grooming", "has dog"]);
        assert!(!refinement_gate(&draft).passed);

        draft.facts.buying_triggers = phrases(&[
            "adopted a long-haired puppy last month",
            "booked summer boarding at a kennel",
        ]);
        assert!(refinement_gate(&draft).passed);
    }

    #[test]
    fn mean_phrase_words_handles_empty_list() {
        assert_eq!(mean_phrase_words(&[]), 0.0);
    }
}
