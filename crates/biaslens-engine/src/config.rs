//! Engine configuration
//!
//! Every weight, cap and threshold the scorer and classifier use lives here
//! so deployments can retune them from YAML without code changes.

use biaslens_core::{Category, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Label of the neutral hypothesis
pub const NEUTRAL_LABEL: &str = "neutral";

/// Label of the international / visa hypothesis
pub const INTL_LABEL: &str = "intl-bias";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub classification: ClassificationConfig,

    #[serde(default)]
    pub international: InternationalConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl EngineConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Check value ranges and label consistency
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if s.category_cap == 0 {
            return Err(Error::config("scoring.category_cap must be positive"));
        }
        check_unit("scoring.classifier_threshold", s.classifier_threshold)?;
        if s.label_weights.values().any(|w| *w < 0.0) || s.default_label_weight < 0.0 {
            return Err(Error::config("scoring.label_weights must be non-negative"));
        }
        if s.breakdown_smoothing < 0.0 {
            return Err(Error::config("scoring.breakdown_smoothing must be non-negative"));
        }
        if s.international.heuristic_scale < 0.0 {
            return Err(Error::config(
                "scoring.international.heuristic_scale must be non-negative",
            ));
        }
        if s.inclusivity.max_classifier_deduction < 0.0 || s.inclusivity.classifier_deduction_factor < 0.0
        {
            return Err(Error::config("scoring.inclusivity deductions must be non-negative"));
        }

        let c = &self.classification;
        check_unit("classification.high_confidence_threshold", c.high_confidence_threshold)?;
        if c.max_premise_chars == 0 {
            return Err(Error::config("classification.max_premise_chars must be positive"));
        }
        if c.max_insights == 0 {
            return Err(Error::config("classification.max_insights must be positive"));
        }
        if !c.labels.iter().any(|l| l.label == NEUTRAL_LABEL) {
            return Err(Error::config(
                "classification.labels must contain the 'neutral' hypothesis",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &c.labels {
            if !seen.insert(spec.label.as_str()) {
                return Err(Error::config(format!(
                    "classification.labels contains duplicate label '{}'",
                    spec.label
                )));
            }
            if spec.hypothesis.trim().is_empty() {
                return Err(Error::config(format!(
                    "classification label '{}' has an empty hypothesis",
                    spec.label
                )));
            }
        }

        let i = &self.international;
        check_unit("international.cap", i.cap)?;
        check_unit("international.override_threshold", i.override_threshold)?;
        check_unit("international.override_margin", i.override_margin)?;
        if i.triggers.iter().any(|t| t.weight < 0.0) {
            return Err(Error::config("international.triggers weights must be non-negative"));
        }

        if self.runtime.inference_timeout_ms == 0 {
            return Err(Error::config("runtime.inference_timeout_ms must be positive"));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::config(format!("{} must be within [0, 1], got {}", name, value)));
    }
    Ok(())
}

/// Weights, caps and thresholds for the scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points per keyword match, by category
    #[serde(default = "default_keyword_weights")]
    pub keyword_weights: BTreeMap<Category, u32>,

    /// Maximum points a single category can add to the bias score
    #[serde(default = "default_category_cap")]
    pub category_cap: u32,

    /// Minimum calibrated confidence before the classifier contributes
    #[serde(default = "default_classifier_threshold")]
    pub classifier_threshold: f32,

    /// Bias-score points per unit of classifier confidence, by label
    #[serde(default = "default_label_weights")]
    pub label_weights: BTreeMap<String, f32>,

    /// Weight for labels missing from `label_weights`
    #[serde(default = "default_label_weight")]
    pub default_label_weight: f32,

    #[serde(default)]
    pub international: InternationalWeights,

    #[serde(default)]
    pub inclusivity: InclusivityConfig,

    /// Added to every raw breakdown contribution before normalization
    #[serde(default = "default_smoothing")]
    pub breakdown_smoothing: f32,
}

impl ScoringConfig {
    pub fn keyword_weight(&self, category: Category) -> u32 {
        self.keyword_weights.get(&category).copied().unwrap_or(0)
    }

    pub fn label_weight(&self, label: &str) -> f32 {
        self.label_weights
            .get(label)
            .copied()
            .unwrap_or(self.default_label_weight)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_weights: default_keyword_weights(),
            category_cap: default_category_cap(),
            classifier_threshold: default_classifier_threshold(),
            label_weights: default_label_weights(),
            default_label_weight: default_label_weight(),
            international: InternationalWeights::default(),
            inclusivity: InclusivityConfig::default(),
            breakdown_smoothing: default_smoothing(),
        }
    }
}

/// Points per match for the international-student score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternationalWeights {
    pub work_authorization: u32,
    pub language: u32,
    pub student_visa: u32,
    pub location: u32,
    pub cultural_fit: u32,
    pub age: u32,
    /// Points per unit of heuristic boost
    pub heuristic_scale: f32,
}

impl Default for InternationalWeights {
    fn default() -> Self {
        Self {
            work_authorization: 30,
            language: 20,
            student_visa: 15,
            location: 15,
            cultural_fit: 12,
            age: 10,
            heuristic_scale: 50.0,
        }
    }
}

/// Per-match multiplier for an inclusivity group
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Multiplier {
    /// Used when every match in the group is coded
    pub coded: f32,
    /// Used when any match in the group is explicit
    pub explicit: f32,
}

impl Multiplier {
    const fn new(coded: f32, explicit: f32) -> Self {
        Self { coded, explicit }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusivityConfig {
    pub gender: Multiplier,
    pub age: Multiplier,
    pub disability: Multiplier,
    pub cultural_fit: Multiplier,
    pub exclusionary_language: Multiplier,
    pub appearance: Multiplier,
    /// Inclusivity points removed per unit of classifier confidence
    pub classifier_deduction_factor: f32,
    pub max_classifier_deduction: f32,
}

impl Default for InclusivityConfig {
    fn default() -> Self {
        Self {
            gender: Multiplier::new(10.0, 35.0),
            age: Multiplier::new(12.0, 40.0),
            disability: Multiplier::new(15.0, 45.0),
            cultural_fit: Multiplier::new(8.0, 20.0),
            exclusionary_language: Multiplier::new(20.0, 40.0),
            appearance: Multiplier::new(15.0, 40.0),
            classifier_deduction_factor: 25.0,
            max_classifier_deduction: 20.0,
        }
    }
}

/// Hypothesis and calibration for one candidate label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSpec {
    pub label: String,
    pub hypothesis: String,
    #[serde(default)]
    pub calibration: Calibration,
}

impl LabelSpec {
    fn new(label: &str, hypothesis: &str, calibration: Calibration) -> Self {
        Self {
            label: label.to_string(),
            hypothesis: hypothesis.to_string(),
            calibration,
        }
    }
}

/// Fixed correction applied to a raw entailment probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub scale: f32,
    pub offset: f32,
}

impl Calibration {
    pub const IDENTITY: Calibration = Calibration {
        scale: 1.0,
        offset: 0.0,
    };

    pub fn apply(&self, score: f32) -> f32 {
        (score * self.scale + self.offset).clamp(0.0, 1.0)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Zero-shot classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_labels")]
    pub labels: Vec<LabelSpec>,

    /// Document premises are cut to this many characters
    #[serde(default = "default_max_premise_chars")]
    pub max_premise_chars: usize,

    /// Sentences shorter than this are not classified
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,

    #[serde(default = "default_max_insights")]
    pub max_insights: usize,

    #[serde(default = "default_high_confidence")]
    pub high_confidence_threshold: f32,

    /// Run the per-sentence pass
    #[serde(default = "default_true")]
    pub sentence_level: bool,
}

impl ClassificationConfig {
    pub fn hypotheses(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.hypothesis.clone()).collect()
    }

    pub fn calibration(&self, label: &str) -> Calibration {
        self.labels
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.calibration)
            .unwrap_or_default()
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            labels: default_labels(),
            max_premise_chars: default_max_premise_chars(),
            min_sentence_chars: default_min_sentence_chars(),
            max_insights: default_max_insights(),
            high_confidence_threshold: default_high_confidence(),
            sentence_level: true,
        }
    }
}

/// One trigger of the international heuristic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Case-insensitive regular expression
    pub pattern: String,
    pub weight: f32,
}

impl TriggerSpec {
    fn new(pattern: &str, weight: f32) -> Self {
        Self {
            pattern: pattern.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternationalConfig {
    /// Upper bound of the summed boost
    #[serde(default = "default_boost_cap")]
    pub cap: f32,

    /// Boost at or above which `intl-bias` may be promoted to the top label
    #[serde(default = "default_override_threshold")]
    pub override_threshold: f32,

    /// Largest lead of a non-neutral top label that the promotion overrides
    #[serde(default = "default_override_margin")]
    pub override_margin: f32,

    #[serde(default = "default_triggers")]
    pub triggers: Vec<TriggerSpec>,
}

impl Default for InternationalConfig {
    fn default() -> Self {
        Self {
            cap: default_boost_cap(),
            override_threshold: default_override_threshold(),
            override_margin: default_override_margin(),
            triggers: default_triggers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Per-request inference budget for async analysis
    #[serde(default = "default_timeout_ms")]
    pub inference_timeout_ms: u64,

    /// Concurrent batch items; defaults to the CPU count
    #[serde(default = "num_cpus::get")]
    pub max_concurrency: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inference_timeout_ms: default_timeout_ms(),
            max_concurrency: num_cpus::get(),
        }
    }
}

fn default_keyword_weights() -> BTreeMap<Category, u32> {
    BTreeMap::from([
        (Category::MasculineCoded, 8),
        (Category::FeminineCoded, 8),
        (Category::AgeBiased, 10),
        (Category::ExclusionaryLanguage, 15),
        (Category::CulturalFit, 5),
        (Category::DisabilityBiased, 12),
        (Category::AppearanceBiased, 10),
    ])
}

fn default_category_cap() -> u32 {
    30
}

fn default_classifier_threshold() -> f32 {
    0.3
}

fn default_label_weights() -> BTreeMap<String, f32> {
    [
        ("exclusionary-language", 25.0),
        ("disability-bias", 25.0),
        (INTL_LABEL, 25.0),
        ("age-bias", 20.0),
        ("appearance-bias", 20.0),
        ("gender-bias", 18.0),
        ("culture-fit-bias", 10.0),
    ]
    .into_iter()
    .map(|(l, w)| (l.to_string(), w))
    .collect()
}

fn default_label_weight() -> f32 {
    15.0
}

fn default_smoothing() -> f32 {
    1.0
}

fn default_labels() -> Vec<LabelSpec> {
    vec![
        LabelSpec::new(
            "age-bias",
            "This job posting contains age-related bias or age discrimination.",
            Calibration::IDENTITY,
        ),
        LabelSpec::new(
            "gender-bias",
            "This job posting contains gender-biased or gender-coded language.",
            Calibration::IDENTITY,
        ),
        LabelSpec::new(
            "culture-fit-bias",
            "This job posting relies on vague culture-fit language that excludes some candidates.",
            Calibration {
                scale: 0.85,
                offset: 0.0,
            },
        ),
        LabelSpec::new(
            "exclusionary-language",
            "This job posting contains exclusionary language that discourages some candidates from applying.",
            Calibration::IDENTITY,
        ),
        LabelSpec::new(
            "disability-bias",
            "This job posting contains requirements that exclude people with disabilities.",
            Calibration::IDENTITY,
        ),
        LabelSpec::new(
            "appearance-bias",
            "This job posting contains requirements about physical appearance.",
            Calibration::IDENTITY,
        ),
        LabelSpec::new(
            INTL_LABEL,
            "This job posting discriminates against international students, visa holders, or non-native speakers.",
            Calibration {
                scale: 1.15,
                offset: 0.0,
            },
        ),
        LabelSpec::new(
            NEUTRAL_LABEL,
            "This job posting is neutral and inclusive with no biased language.",
            Calibration::IDENTITY,
        ),
    ]
}

fn default_max_premise_chars() -> usize {
    1000
}

fn default_min_sentence_chars() -> usize {
    25
}

fn default_max_insights() -> usize {
    5
}

fn default_high_confidence() -> f32 {
    0.4
}

fn default_true() -> bool {
    true
}

fn default_boost_cap() -> f32 {
    0.35
}

fn default_override_threshold() -> f32 {
    0.05
}

fn default_override_margin() -> f32 {
    0.1
}

fn default_triggers() -> Vec<TriggerSpec> {
    vec![
        TriggerSpec::new(r"\bno\s+(?:work\s+)?(?:visa\s+)?sponsorship\b", 0.12),
        TriggerSpec::new(
            r"\b(?:will\s+not|won't|cannot|can't|unable\s+to|does\s+not|do\s+not)\s+(?:provide\s+)?sponsor",
            0.12,
        ),
        TriggerSpec::new(r"\bvisas?\b", 0.08),
        TriggerSpec::new(r"\bopt\b", 0.10),
        TriggerSpec::new(r"\bcpt\b", 0.10),
        TriggerSpec::new(r"\bu\.?s\.?\s+citizens?\b", 0.12),
        TriggerSpec::new(r"\bcitizens?\s+only\b", 0.10),
        TriggerSpec::new(r"\bgreen\s+card\b", 0.08),
        TriggerSpec::new(r"\bwork\s+authori[sz]ation\b", 0.06),
        TriggerSpec::new(r"\bauthori[sz]ed\s+to\s+work\b", 0.06),
        TriggerSpec::new(r"\bnative\s+(?:english\s+)?speakers?\b", 0.10),
        TriggerSpec::new(r"\binternational\s+(?:students?|applicants?|candidates?)\b", 0.06),
        TriggerSpec::new(r"\baccents?\b", 0.06),
    ]
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
scoring:
  category_cap: 40
  classifier_threshold: 0.25
runtime:
  inference_timeout_ms: 500
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.scoring.category_cap, 40);
        assert_eq!(config.scoring.keyword_weight(Category::ExclusionaryLanguage), 15);
        assert_eq!(config.runtime.inference_timeout_ms, 500);
        assert_eq!(config.classification.max_insights, 5);
        assert!(config.classification.labels.iter().any(|l| l.label == INTL_LABEL));
    }

    #[test]
    fn test_keyword_weights_from_yaml() {
        let yaml = r#"
scoring:
  keyword_weights:
    exclusionary_language: 20
    cultural_fit: 2
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.scoring.keyword_weight(Category::ExclusionaryLanguage), 20);
        assert_eq!(config.scoring.keyword_weight(Category::MasculineCoded), 0);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.yaml");
        std::fs::write(&path, "international:\n  cap: 0.5\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.international.cap, 0.5);
        assert!(!config.international.triggers.is_empty());

        let missing = EngineConfig::from_file(temp_dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn test_rejects_missing_neutral() {
        let yaml = r#"
classification:
  labels:
    - label: age-bias
      hypothesis: "This posting is ageist."
"#;
        let err = EngineConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("neutral"));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = EngineConfig::default();
        config.international.override_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.international.override_margin = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_premise() {
        let err = EngineConfig::from_yaml("classification:\n  max_premise_chars: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_premise_chars"));
    }

    #[test]
    fn test_calibration_clamps() {
        let c = Calibration {
            scale: 1.5,
            offset: 0.1,
        };
        assert_eq!(c.apply(0.9), 1.0);
        assert!((c.apply(0.2) - 0.4).abs() < 1e-6);
        assert_eq!(Calibration::IDENTITY.apply(0.33), 0.33);
    }

    #[test]
    fn test_unknown_label_uses_default_weight() {
        let scoring = ScoringConfig::default();
        assert_eq!(scoring.label_weight("something-else"), 15.0);
        assert_eq!(scoring.label_weight(INTL_LABEL), 25.0);
    }
}
