//! Core types for BiasLens

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keyword bias category a phrase belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    MasculineCoded,
    FeminineCoded,
    AgeBiased,
    ExclusionaryLanguage,
    CulturalFit,
    DisabilityBiased,
    AppearanceBiased,
}

impl Category {
    /// Every category, in reporting order
    pub const ALL: [Category; 7] = [
        Category::MasculineCoded,
        Category::FeminineCoded,
        Category::AgeBiased,
        Category::ExclusionaryLanguage,
        Category::CulturalFit,
        Category::DisabilityBiased,
        Category::AppearanceBiased,
    ];

    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MasculineCoded => "masculine_coded",
            Self::FeminineCoded => "feminine_coded",
            Self::AgeBiased => "age_biased",
            Self::ExclusionaryLanguage => "exclusionary_language",
            Self::CulturalFit => "cultural_fit",
            Self::DisabilityBiased => "disability_biased",
            Self::AppearanceBiased => "appearance_biased",
        }
    }
}

/// How overt a phrase is, decided when the dictionary is authored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhraseSeverity {
    /// Overt restriction or discriminatory statement
    Explicit,
    /// Mildly coded wording
    #[default]
    Coded,
}

/// Finer-grained topic of a phrase, used by international scoring,
/// red-flag labelling and issue counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// Visa, sponsorship, citizenship, work eligibility
    WorkAuthorization,
    /// Native-speaker or accent requirements
    Language,
    /// OPT / CPT and student-visa exclusion
    StudentVisa,
    /// Explicit gender words
    Gender,
    /// Numeric or explicit age limits
    AgeCutoff,
    /// Refusal to accommodate disabilities
    Accommodation,
    /// Looks, grooming, height, weight
    Appearance,
    /// Local-only / local-experience restrictions
    Location,
}

/// One entry of the phrase dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseEntry {
    /// Lower-case phrase to match
    pub phrase: String,

    /// Bias category
    pub category: Category,

    /// Inclusive replacement (may be empty)
    #[serde(default)]
    pub replacement: String,

    /// Explicit vs coded
    #[serde(default)]
    pub severity: PhraseSeverity,

    /// Optional topic tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet: Option<Facet>,
}

impl PhraseEntry {
    /// Create a coded entry without facet
    pub fn new(phrase: impl Into<String>, category: Category, replacement: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            category,
            replacement: replacement.into(),
            severity: PhraseSeverity::Coded,
            facet: None,
        }
    }

    /// Mark the entry as explicit
    pub fn explicit(mut self) -> Self {
        self.severity = PhraseSeverity::Explicit;
        self
    }

    /// Attach a facet
    pub fn with_facet(mut self, facet: Facet) -> Self {
        self.facet = Some(facet);
        self
    }

    /// Whether the phrase is a single word (matched with word boundaries)
    pub fn is_single_word(&self) -> bool {
        !self.phrase.contains(char::is_whitespace)
    }

    pub fn is_explicit(&self) -> bool {
        self.severity == PhraseSeverity::Explicit
    }
}

/// Matches for one category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub count: usize,
    pub matches: Vec<String>,
}

impl CategoryResult {
    /// Record a matched phrase. Returns false if it was already recorded.
    pub fn record(&mut self, phrase: &str) -> bool {
        if self.matches.iter().any(|m| m == phrase) {
            return false;
        }
        self.matches.push(phrase.to_string());
        self.count += 1;
        true
    }
}

/// Per-category keyword matches. Every category is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    pub masculine_coded: CategoryResult,
    pub feminine_coded: CategoryResult,
    pub age_biased: CategoryResult,
    pub exclusionary_language: CategoryResult,
    pub cultural_fit: CategoryResult,
    pub disability_biased: CategoryResult,
    pub appearance_biased: CategoryResult,
}

impl KeywordAnalysis {
    /// Get the result for a category
    pub fn get(&self, category: Category) -> &CategoryResult {
        match category {
            Category::MasculineCoded => &self.masculine_coded,
            Category::FeminineCoded => &self.feminine_coded,
            Category::AgeBiased => &self.age_biased,
            Category::ExclusionaryLanguage => &self.exclusionary_language,
            Category::CulturalFit => &self.cultural_fit,
            Category::DisabilityBiased => &self.disability_biased,
            Category::AppearanceBiased => &self.appearance_biased,
        }
    }

    /// Get a mutable result for a category
    pub fn get_mut(&mut self, category: Category) -> &mut CategoryResult {
        match category {
            Category::MasculineCoded => &mut self.masculine_coded,
            Category::FeminineCoded => &mut self.feminine_coded,
            Category::AgeBiased => &mut self.age_biased,
            Category::ExclusionaryLanguage => &mut self.exclusionary_language,
            Category::CulturalFit => &mut self.cultural_fit,
            Category::DisabilityBiased => &mut self.disability_biased,
            Category::AppearanceBiased => &mut self.appearance_biased,
        }
    }

    /// Iterate over all categories in reporting order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryResult)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Total matches across categories
    pub fn total_count(&self) -> usize {
        self.iter().map(|(_, r)| r.count).sum()
    }
}

/// Confidence partition of a sentence-level finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Low,
}

/// A sentence the classifier flagged as non-neutral
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceInsight {
    pub sentence: String,

    /// Char offset into the original text
    pub start: usize,

    /// Char offset (exclusive) into the original text
    pub end: usize,

    pub label: String,
    pub score: f32,
    pub confidence_level: ConfidenceLevel,
}

/// Zero-shot classification outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Candidate labels, highest score first
    pub labels: Vec<String>,

    /// Raw scores parallel to `labels`
    pub scores: Vec<f32>,

    /// Calibrated scores parallel to `labels`
    pub calibrated_scores: Vec<f32>,

    /// Name of the entailment provider, or the fallback marker
    pub provider: String,

    #[serde(default)]
    pub sentence_insights: Vec<SentenceInsight>,

    /// True when the result was inferred from keywords only
    #[serde(default)]
    pub fallback: bool,

    /// Diagnostic text of the error that forced a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassificationResult {
    pub const NEUTRAL: &'static str = "neutral";

    /// Top label with its calibrated score
    pub fn top(&self) -> Option<(&str, f32)> {
        let label = self.labels.first()?;
        let score = self
            .calibrated_scores
            .first()
            .or_else(|| self.scores.first())
            .copied()
            .unwrap_or(0.0);
        Some((label.as_str(), score))
    }

    /// Top label when it is a bias label whose calibrated confidence
    /// exceeds `threshold`
    pub fn triggered(&self, threshold: f32) -> Option<(&str, f32)> {
        self.top()
            .filter(|(label, score)| *label != Self::NEUTRAL && *score > threshold)
    }

    /// Calibrated score of a label, if present
    pub fn calibrated_score_of(&self, label: &str) -> Option<f32> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|idx| self.calibrated_scores.get(idx).copied())
    }
}

/// Category key of the normalized percentage breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownCategory {
    MasculineCoded,
    FeminineCoded,
    AgeBiased,
    ExclusionaryLanguage,
    CulturalFit,
    DisabilityBiased,
    AppearanceBiased,
    InternationalBias,
}

impl BreakdownCategory {
    pub const ALL: [BreakdownCategory; 8] = [
        BreakdownCategory::MasculineCoded,
        BreakdownCategory::FeminineCoded,
        BreakdownCategory::AgeBiased,
        BreakdownCategory::ExclusionaryLanguage,
        BreakdownCategory::CulturalFit,
        BreakdownCategory::DisabilityBiased,
        BreakdownCategory::AppearanceBiased,
        BreakdownCategory::InternationalBias,
    ];
}

impl From<Category> for BreakdownCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::MasculineCoded => Self::MasculineCoded,
            Category::FeminineCoded => Self::FeminineCoded,
            Category::AgeBiased => Self::AgeBiased,
            Category::ExclusionaryLanguage => Self::ExclusionaryLanguage,
            Category::CulturalFit => Self::CulturalFit,
            Category::DisabilityBiased => Self::DisabilityBiased,
            Category::AppearanceBiased => Self::AppearanceBiased,
        }
    }
}

/// Integer percentages per category, summing to exactly 100
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiasScoreBreakdown(pub BTreeMap<BreakdownCategory, u32>);

impl BiasScoreBreakdown {
    pub fn get(&self, category: BreakdownCategory) -> u32 {
        self.0.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

/// Severity of a red flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSeverity {
    High,
    Medium,
}

/// Explained finding shown to the end user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlag {
    pub text: String,
    pub severity: FlagSeverity,
    pub category: String,
    pub explanation: String,
    pub suggestion: String,
}

/// Ordinal band of the inclusivity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InclusivityBand {
    #[serde(rename = "Highly Inclusive")]
    HighlyInclusive,
    #[serde(rename = "Moderately Inclusive")]
    ModeratelyInclusive,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    #[serde(rename = "Low Inclusivity")]
    LowInclusivity,
}

impl InclusivityBand {
    pub fn from_score(score: f32) -> Self {
        if score >= 80.0 {
            Self::HighlyInclusive
        } else if score >= 60.0 {
            Self::ModeratelyInclusive
        } else if score >= 40.0 {
            Self::NeedsImprovement
        } else {
            Self::LowInclusivity
        }
    }
}

/// Per-group inclusivity, 100 meaning no signal in that group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InclusivityBreakdown {
    pub gender: f32,
    pub age: f32,
    pub disability: f32,
    pub cultural_fit: f32,
    pub exclusionary_language: f32,
    pub appearance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InclusivityScore {
    pub overall: f32,
    pub breakdown: InclusivityBreakdown,
    pub interpretation: InclusivityBand,
}

/// Coarse issue counts kept for older clients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub visa_requirements: usize,
    pub language_bias: usize,
    pub cultural_assumptions: usize,
    pub other_exclusionary: usize,
}

/// Which path produced the classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Entailment model and keywords
    Full,
    /// Entailment model requested but unavailable or failed
    KeywordFallback,
    /// Entailment model not requested
    KeywordOnly,
}

/// Complete analysis of one posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub bias_score: u32,
    pub international_student_bias_score: u32,
    pub inclusivity_score: InclusivityScore,
    pub keyword_analysis: KeywordAnalysis,
    pub classification: ClassificationResult,
    pub bias_breakdown: BiasScoreBreakdown,
    pub red_flags: Vec<RedFlag>,
    pub issue_counts: IssueCounts,
    pub analysis_type: AnalysisType,
    pub nlp_used: bool,
}

/// One posting of a batch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub use_nlp: bool,
}

/// Condensed per-posting batch result, paired with the job id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub id: String,
    pub title: String,
    pub bias_score: u32,
    pub international_student_bias_score: u32,
    pub inclusivity_score: InclusivityScore,
}
