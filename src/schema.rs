//! Shared JSON schema types for profile generation.
//!
//! These types mirror the persisted row and wire formats so the pipeline stays
//! deterministic and schema-driven without embedding heuristics in code.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum attempts per generation stage.
pub const MAX_STAGE_ATTEMPTS: u32 = 3;

/// Version tag written into every canonical profile.
pub const PROFILE_VERSION: &str = "v1";

/// Minimum validation score for a multipass run to count as successful.
pub const MIN_MULTIPASS_SCORE: u32 = 60;

/// Business profile archetypes the pipeline understands.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessProfileType {
    LocalServiceB2c,
    LocalServiceB2b,
    RegionalRetail,
    NationalEcommerce,
    GlobalSaasB2b,
    GlobalSaasB2c,
    DigitalContent,
}

impl BusinessProfileType {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessProfileType::LocalServiceB2c => "local-service-b2c",
            BusinessProfileType::LocalServiceB2b => "local-service-b2b",
            BusinessProfileType::RegionalRetail => "regional-retail",
            BusinessProfileType::NationalEcommerce => "national-ecommerce",
            BusinessProfileType::GlobalSaasB2b => "global-saas-b2b",
            BusinessProfileType::GlobalSaasB2c => "global-saas-b2c",
            BusinessProfileType::DigitalContent => "digital-content",
        }
    }
}

impl fmt::Display for BusinessProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BusinessProfileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local-service-b2c" => Ok(BusinessProfileType::LocalServiceB2c),
            "local-service-b2b" => Ok(BusinessProfileType::LocalServiceB2b),
            "regional-retail" => Ok(BusinessProfileType::RegionalRetail),
            "national-ecommerce" => Ok(BusinessProfileType::NationalEcommerce),
            "global-saas-b2b" => Ok(BusinessProfileType::GlobalSaasB2b),
            "global-saas-b2c" => Ok(BusinessProfileType::GlobalSaasB2c),
            "digital-content" => Ok(BusinessProfileType::DigitalContent),
            other => Err(format!("unknown business profile type '{other}'")),
        }
    }
}

/// Which optional presentation tabs apply to a profile.
///
/// Derived purely from [`BusinessProfileType`]; see `merge::enabled_tabs`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct EnabledTabs {
    pub local: bool,
    pub weather: bool,
    pub seasonal: bool,
    pub trends: bool,
}

/// The verbatim UVP statement bundle, propagated unchanged when present.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FullUvp {
    pub customer_statement: String,
    pub product_statement: String,
    pub benefit_statement: String,
    pub solution_statement: String,
}

/// Deterministic, already-computed business facts. Ground truth: the pipeline
/// never regenerates these sections.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct UvpDerivedFacts {
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub buying_triggers: Vec<String>,
    #[serde(default)]
    pub urgency_drivers: Vec<String>,
    #[serde(default)]
    pub competitive_advantages: Vec<String>,
    #[serde(default)]
    pub trust_builders: Vec<String>,
    #[serde(default)]
    pub objection_handlers: Vec<String>,
    #[serde(default)]
    pub transformations: Vec<String>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_uvp: Option<FullUvp>,
}

/// Flag-set naming the sections the hybrid completion call must fill.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissingFields {
    #[serde(default)]
    pub market_trends: bool,
    #[serde(default)]
    pub seasonal_patterns: bool,
    #[serde(default)]
    pub geographic_variation: bool,
    #[serde(default)]
    pub headline_templates: bool,
    #[serde(default)]
    pub hook_library: bool,
    #[serde(default)]
    pub power_words: bool,
    #[serde(default)]
    pub innovation_opportunities: bool,
    #[serde(default)]
    pub customer_journey: bool,
    #[serde(default)]
    pub language_dictionary: bool,
}

impl MissingFields {
    /// All sections missing: the default when a hybrid request omits the set.
    pub fn all() -> Self {
        MissingFields {
            market_trends: true,
            seasonal_patterns: true,
            geographic_variation: true,
            headline_templates: true,
            hook_library: true,
            power_words: true,
            innovation_opportunities: true,
            customer_journey: true,
            language_dictionary: true,
        }
    }

    /// Names of the flagged sections, for prompt assembly.
    pub fn section_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.market_trends {
            names.push("market_trends");
        }
        if self.seasonal_patterns {
            names.push("seasonal_patterns");
        }
        if self.geographic_variation {
            names.push("geographic_variation");
        }
        if self.headline_templates {
            names.push("headline_templates");
        }
        if self.hook_library {
            names.push("hook_library");
        }
        if self.power_words {
            names.push("power_words");
        }
        if self.innovation_opportunities {
            names.push("innovation_opportunities");
        }
        if self.customer_journey {
            names.push("customer_journey");
        }
        if self.language_dictionary {
            names.push("language_dictionary");
        }
        names
    }
}

/// One stage of a customer journey narrative.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct JourneyStage {
    pub name: String,
    pub description: String,
}

/// Sections produced by the completion service.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSections {
    #[serde(default)]
    pub customer_journey: Vec<JourneyStage>,
    #[serde(default)]
    pub language_dictionary: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub power_words: Vec<String>,
    #[serde(default)]
    pub avoid_words: Vec<String>,
    #[serde(default)]
    pub headline_templates: Vec<String>,
    #[serde(default)]
    pub hook_library: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub market_trends: Vec<String>,
    #[serde(default)]
    pub seasonal_patterns: Vec<String>,
    #[serde(default)]
    pub geographic_variation: Vec<String>,
    #[serde(default)]
    pub innovation_opportunities: Vec<String>,
}

impl GeneratedSections {
    /// Total words across all language-dictionary categories.
    pub fn dictionary_word_count(&self) -> usize {
        self.language_dictionary.values().map(Vec::len).sum()
    }

    /// Total hooks across all hook-library categories.
    pub fn hook_count(&self) -> usize {
        self.hook_library.values().map(Vec::len).sum()
    }
}

/// Full candidate profile as returned by a multipass completion call.
///
/// Every field defaults so a partial response still deserializes; validators
/// decide whether the draft clears the stage's quality bar.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(flatten)]
    pub facts: UvpDerivedFacts,
    #[serde(flatten)]
    pub generated: GeneratedSections,
}

/// Identity fields of a persisted profile.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProfileIdentity {
    pub slug: String,
    pub display_name: String,
    pub classification_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

/// The final merged, persisted profile shape.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CanonicalProfile {
    pub identity: ProfileIdentity,
    pub business_profile_type: BusinessProfileType,
    pub facts: UvpDerivedFacts,
    pub generated: GeneratedSections,
    pub enabled_tabs: EnabledTabs,
    pub version: String,
    pub generated_at_epoch_ms: u128,
    pub staleness_score: u32,
}

/// A generation request, immutable once submitted.
///
/// A request carrying `uvp_derived_facts` selects the hybrid strategy;
/// otherwise the multipass strategy runs from hints alone.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub specialty_name: String,
    pub specialty_description: String,
    #[serde(default)]
    pub base_classification_code: Option<String>,
    pub business_profile_type: BusinessProfileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvp_hints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvp_derived_facts: Option<UvpDerivedFacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<MissingFields>,
}

/// Attempt bookkeeping for one stage.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct StageAttempt {
    pub attempts: u32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Per-stage attempt record for a multipass run.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct StageResults {
    pub stage1: StageAttempt,
    pub stage2: StageAttempt,
    pub stage3: StageAttempt,
}

/// Which strategy produced a result.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    Multipass,
    Hybrid,
}

impl StrategyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyMode::Multipass => "multipass",
            StrategyMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_type_round_trips_kebab_case() {
        let json = "\"local-service-b2c\"";
        let parsed: BusinessProfileType = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, BusinessProfileType::LocalServiceB2c);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }

    #[test]
    fn draft_deserializes_from_partial_response() {
        let json = r#"{
            "category": "Pet Services",
            "buying_triggers": ["new puppy adoption", "shedding season"],
            "power_words": ["gentle", "certified"]
        }"#;
        let draft: ProfileDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.category.as_deref(), Some("Pet Services"));
        assert_eq!(draft.facts.buying_triggers.len(), 2);
        assert_eq!(draft.generated.power_words.len(), 2);
        assert!(draft.facts.pain_points.is_empty());
    }

    #[test]
    fn missing_fields_all_names_every_section() {
        assert_eq!(MissingFields::all().section_names().len(), 9);
        assert!(MissingFields::default().section_names().is_empty());
    }

    #[test]
    fn dictionary_and_hook_totals_sum_across_categories() {
        let mut generated = GeneratedSections::default();
        generated
            .language_dictionary
            .insert("emotional".into(), vec!["trusted".into(), "safe".into()]);
        generated
            .language_dictionary
            .insert("technical".into(), vec!["hypoallergenic".into()]);
        generated
            .hook_library
            .insert("curiosity".into(), vec!["hook a".into(), "hook b".into()]);
        assert_eq!(generated.dictionary_word_count(), 3);
        assert_eq!(generated.hook_count(), 2);
    }
}
