//! Score blending
//!
//! Combines keyword evidence and classification into the bias score, the
//! international-student score, the inclusivity score and the percentage
//! breakdown. All weights come from [`ScoringConfig`].

use crate::breakdown::apportion;
use crate::config::{Multiplier, ScoringConfig, INTL_LABEL, NEUTRAL_LABEL};
use crate::dictionary::PhraseDictionary;
use crate::international::InternationalBiasHeuristic;
use biaslens_core::{
    BiasScoreBreakdown, BreakdownCategory, Category, CategoryResult, ClassificationResult, Facet,
    InclusivityBand, InclusivityBreakdown, InclusivityScore, IssueCounts, KeywordAnalysis,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// All scores for one posting
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    pub bias_score: u32,
    pub international_score: u32,
    pub inclusivity: InclusivityScore,
    pub breakdown: BiasScoreBreakdown,
}

/// Matches per facet, looked up from the dictionary
#[derive(Debug, Default, Clone, Copy)]
struct FacetCounts {
    work_authorization: u32,
    language: u32,
    student_visa: u32,
    location: u32,
}

pub struct BiasScorer {
    config: ScoringConfig,
    dictionary: Arc<PhraseDictionary>,
    heuristic: Arc<InternationalBiasHeuristic>,
}

impl BiasScorer {
    pub fn new(
        config: ScoringConfig,
        dictionary: Arc<PhraseDictionary>,
        heuristic: Arc<InternationalBiasHeuristic>,
    ) -> Self {
        Self {
            config,
            dictionary,
            heuristic,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compute every score. `source_text` is the raw posting, scanned by the
    /// international heuristic.
    pub fn score(
        &self,
        keywords: &KeywordAnalysis,
        classification: &ClassificationResult,
        source_text: &str,
    ) -> Scores {
        let boost = self.heuristic.boost(source_text);
        Scores {
            bias_score: self.bias_score(keywords, classification),
            international_score: self.international_score_with_boost(keywords, boost),
            inclusivity: self.inclusivity_score(keywords, classification),
            breakdown: self.breakdown_with_boost(keywords, classification, boost),
        }
    }

    fn keyword_points(&self, category: Category, result: &CategoryResult) -> u32 {
        (result.count as u32)
            .saturating_mul(self.config.keyword_weight(category))
            .min(self.config.category_cap)
    }

    pub fn bias_score(&self, keywords: &KeywordAnalysis, classification: &ClassificationResult) -> u32 {
        let keyword_total: u32 = keywords
            .iter()
            .map(|(category, result)| self.keyword_points(category, result))
            .sum();

        let classifier = classification
            .triggered(self.config.classifier_threshold)
            .map(|(label, confidence)| (confidence * self.config.label_weight(label)) as u32)
            .unwrap_or(0);

        (keyword_total + classifier).min(100)
    }

    pub fn international_score(&self, keywords: &KeywordAnalysis, source_text: &str) -> u32 {
        self.international_score_with_boost(keywords, self.heuristic.boost(source_text))
    }

    fn international_score_with_boost(&self, keywords: &KeywordAnalysis, boost: f32) -> u32 {
        let w = &self.config.international;
        let facets = self.facet_counts(keywords);

        let keyword_points = facets.work_authorization * w.work_authorization
            + facets.language * w.language
            + facets.student_visa * w.student_visa
            + facets.location * w.location
            + keywords.cultural_fit.count as u32 * w.cultural_fit
            + keywords.age_biased.count as u32 * w.age;
        let heuristic_points = (boost * w.heuristic_scale).round() as u32;

        (keyword_points + heuristic_points).min(100)
    }

    pub fn inclusivity_score(
        &self,
        keywords: &KeywordAnalysis,
        classification: &ClassificationResult,
    ) -> InclusivityScore {
        let m = &self.config.inclusivity;

        let gender = self.group_penalty(
            keywords,
            &[Category::MasculineCoded, Category::FeminineCoded],
            m.gender,
        );
        let age = self.group_penalty(keywords, &[Category::AgeBiased], m.age);
        let disability = self.group_penalty(keywords, &[Category::DisabilityBiased], m.disability);
        let cultural_fit = self.group_penalty(keywords, &[Category::CulturalFit], m.cultural_fit);
        let exclusionary = self.group_penalty(
            keywords,
            &[Category::ExclusionaryLanguage],
            m.exclusionary_language,
        );
        let appearance = self.group_penalty(keywords, &[Category::AppearanceBiased], m.appearance);

        let penalties = [gender, age, disability, cultural_fit, exclusionary, appearance];
        let average = penalties.iter().sum::<f32>() / penalties.len() as f32;
        let mut overall = 100.0 - average;

        if let Some((_, confidence)) = classification.triggered(self.config.classifier_threshold) {
            overall -= (confidence * m.classifier_deduction_factor).min(m.max_classifier_deduction);
        }

        let overall = round1(overall.clamp(0.0, 100.0));
        InclusivityScore {
            overall,
            breakdown: InclusivityBreakdown {
                gender: round1(100.0 - gender),
                age: round1(100.0 - age),
                disability: round1(100.0 - disability),
                cultural_fit: round1(100.0 - cultural_fit),
                exclusionary_language: round1(100.0 - exclusionary),
                appearance: round1(100.0 - appearance),
            },
            interpretation: InclusivityBand::from_score(overall),
        }
    }

    /// `min(count * multiplier, 100)`, with the explicit multiplier when any
    /// matched phrase in the group is tagged explicit
    fn group_penalty(&self, keywords: &KeywordAnalysis, group: &[Category], multiplier: Multiplier) -> f32 {
        let count: usize = group.iter().map(|c| keywords.get(*c).count).sum();
        let explicit = group.iter().any(|c| {
            keywords
                .get(*c)
                .matches
                .iter()
                .filter_map(|phrase| self.dictionary.get(phrase))
                .any(|entry| entry.is_explicit())
        });
        let per_match = if explicit {
            multiplier.explicit
        } else {
            multiplier.coded
        };
        (count as f32 * per_match).min(100.0)
    }

    pub fn breakdown(
        &self,
        keywords: &KeywordAnalysis,
        classification: &ClassificationResult,
        source_text: &str,
    ) -> BiasScoreBreakdown {
        self.breakdown_with_boost(keywords, classification, self.heuristic.boost(source_text))
    }

    fn breakdown_with_boost(
        &self,
        keywords: &KeywordAnalysis,
        classification: &ClassificationResult,
        boost: f32,
    ) -> BiasScoreBreakdown {
        let mut raw: BTreeMap<BreakdownCategory, f32> =
            BreakdownCategory::ALL.into_iter().map(|c| (c, 0.0)).collect();

        for (category, result) in keywords.iter() {
            *raw.entry(category.into()).or_default() += self.keyword_points(category, result) as f32;
        }
        *raw.entry(BreakdownCategory::InternationalBias).or_default() +=
            boost * self.config.international.heuristic_scale;

        for (label, score) in classification
            .labels
            .iter()
            .zip(&classification.calibrated_scores)
        {
            if label == NEUTRAL_LABEL || *score <= self.config.classifier_threshold {
                continue;
            }
            let points = score * self.config.label_weight(label);
            for (category, share) in label_categories(label) {
                *raw.entry(*category).or_default() += points * share;
            }
        }

        let raw: Vec<_> = raw.into_iter().collect();
        apportion(&raw, self.config.breakdown_smoothing)
    }

    /// Legacy coarse issue counts
    pub fn issue_counts(&self, keywords: &KeywordAnalysis) -> IssueCounts {
        let facets = self.facet_counts(keywords);
        IssueCounts {
            visa_requirements: (facets.work_authorization + facets.student_visa) as usize,
            language_bias: facets.language as usize,
            cultural_assumptions: keywords.cultural_fit.count,
            other_exclusionary: keywords.masculine_coded.count + keywords.age_biased.count,
        }
    }

    fn facet_counts(&self, keywords: &KeywordAnalysis) -> FacetCounts {
        let mut counts = FacetCounts::default();
        for (_, result) in keywords.iter() {
            for phrase in &result.matches {
                match self.dictionary.get(phrase).and_then(|e| e.facet) {
                    Some(Facet::WorkAuthorization) => counts.work_authorization += 1,
                    Some(Facet::Language) => counts.language += 1,
                    Some(Facet::StudentVisa) => counts.student_visa += 1,
                    Some(Facet::Location) => counts.location += 1,
                    _ => {}
                }
            }
        }
        counts
    }
}

/// Breakdown categories a classifier label contributes to, with shares
fn label_categories(label: &str) -> &'static [(BreakdownCategory, f32)] {
    match label {
        "gender-bias" => &[
            (BreakdownCategory::MasculineCoded, 0.5),
            (BreakdownCategory::FeminineCoded, 0.5),
        ],
        "age-bias" => &[(BreakdownCategory::AgeBiased, 1.0)],
        "culture-fit-bias" => &[(BreakdownCategory::CulturalFit, 1.0)],
        "exclusionary-language" => &[(BreakdownCategory::ExclusionaryLanguage, 1.0)],
        "disability-bias" => &[(BreakdownCategory::DisabilityBiased, 1.0)],
        "appearance-bias" => &[(BreakdownCategory::AppearanceBiased, 1.0)],
        INTL_LABEL => &[(BreakdownCategory::InternationalBias, 1.0)],
        _ => &[],
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::keyword_fallback;
    use crate::config::InternationalConfig;
    use crate::keywords::KeywordDetector;

    struct Fixture {
        detector: KeywordDetector,
        scorer: BiasScorer,
    }

    impl Fixture {
        fn new() -> Self {
            let dictionary = PhraseDictionary::builtin();
            let heuristic =
                Arc::new(InternationalBiasHeuristic::new(&InternationalConfig::default()).unwrap());
            Self {
                detector: KeywordDetector::new(Arc::clone(&dictionary)).unwrap(),
                scorer: BiasScorer::new(ScoringConfig::default(), dictionary, heuristic),
            }
        }

        fn score(&self, text: &str) -> (KeywordAnalysis, Scores) {
            let keywords = self.detector.detect(text);
            let classification = keyword_fallback(&keywords, None);
            let scores = self.scorer.score(&keywords, &classification, text);
            (keywords, scores)
        }
    }

    fn classified(label: &str, score: f32) -> ClassificationResult {
        ClassificationResult {
            labels: vec![label.to_string(), NEUTRAL_LABEL.to_string()],
            scores: vec![score, 0.1],
            calibrated_scores: vec![score, 0.1],
            provider: "test".to_string(),
            sentence_insights: Vec::new(),
            fallback: false,
            error: None,
        }
    }

    #[test]
    fn test_neutral_text() {
        let (_, scores) = Fixture::new().score("We welcome applicants from all backgrounds and identities.");
        assert_eq!(scores.bias_score, 0);
        assert_eq!(scores.international_score, 0);
        assert_eq!(scores.inclusivity.overall, 100.0);
        assert_eq!(scores.inclusivity.interpretation, InclusivityBand::HighlyInclusive);
        assert_eq!(scores.breakdown.total(), 100);
    }

    #[test]
    fn test_empty_text() {
        let (_, scores) = Fixture::new().score("");
        assert_eq!(scores.bias_score, 0);
        assert_eq!(scores.inclusivity.overall, 100.0);
        assert_eq!(scores.breakdown.total(), 100);
    }

    #[test]
    fn test_citizenship_international_score() {
        let (_, scores) =
            Fixture::new().score("Only U.S. citizens will be considered; no visa sponsorship.");
        // two work-authorization phrases at 30 plus 0.32 * 50
        assert_eq!(scores.international_score, 76);
    }

    #[test]
    fn test_category_cap() {
        let fixture = Fixture::new();
        let keywords = fixture
            .detector
            .detect("aggressive ambitious assertive competitive decisive dominant ninja");
        assert_eq!(keywords.masculine_coded.count, 7);
        let neutral = keyword_fallback(&KeywordAnalysis::default(), None);
        assert_eq!(fixture.scorer.bias_score(&keywords, &neutral), 30);
    }

    #[test]
    fn test_classifier_contribution_requires_threshold() {
        let fixture = Fixture::new();
        let keywords = KeywordAnalysis::default();
        assert_eq!(fixture.scorer.bias_score(&keywords, &classified("age-bias", 0.3)), 0);
        // int(0.5 * 20)
        assert_eq!(fixture.scorer.bias_score(&keywords, &classified("age-bias", 0.5)), 10);
        assert_eq!(fixture.scorer.bias_score(&keywords, &classified(NEUTRAL_LABEL, 0.9)), 0);
    }

    #[test]
    fn test_explicit_marker_raises_penalty() {
        let fixture = Fixture::new();
        let neutral = keyword_fallback(&KeywordAnalysis::default(), None);

        let coded = fixture.detector.detect("We want energetic people.");
        let explicit = fixture.detector.detect("Applicants no older than 35.");
        assert_eq!(coded.age_biased.count, 1);
        assert_eq!(explicit.age_biased.count, 1);

        let coded_score = fixture.scorer.inclusivity_score(&coded, &neutral);
        let explicit_score = fixture.scorer.inclusivity_score(&explicit, &neutral);
        assert_eq!(coded_score.breakdown.age, 88.0);
        assert_eq!(explicit_score.breakdown.age, 60.0);
        assert!(explicit_score.overall < coded_score.overall);
    }

    #[test]
    fn test_classifier_deduction_capped() {
        let fixture = Fixture::new();
        let keywords = KeywordAnalysis::default();
        let score = fixture
            .scorer
            .inclusivity_score(&keywords, &classified("exclusionary-language", 1.0));
        assert_eq!(score.overall, 80.0);
        let score = fixture
            .scorer
            .inclusivity_score(&keywords, &classified("exclusionary-language", 0.4));
        assert_eq!(score.overall, 90.0);
    }

    #[test]
    fn test_breakdown_follows_signal() {
        let (_, scores) = Fixture::new().score("Native English speaker required.");
        let breakdown = &scores.breakdown;
        assert_eq!(breakdown.total(), 100);
        let exclusionary = breakdown.get(BreakdownCategory::ExclusionaryLanguage);
        for category in BreakdownCategory::ALL {
            assert!(breakdown.get(category) >= 1);
            assert!(breakdown.get(category) <= exclusionary);
        }
    }

    #[test]
    fn test_issue_counts() {
        let fixture = Fixture::new();
        let keywords = fixture.detector.detect(
            "Native English speaker, no visa sponsorship, no OPT/CPT. Young ninja with culture fit.",
        );
        let counts = fixture.scorer.issue_counts(&keywords);
        assert_eq!(counts.visa_requirements, 2);
        assert_eq!(counts.language_bias, 1);
        assert_eq!(counts.cultural_assumptions, 1);
        assert_eq!(counts.other_exclusionary, 2);
    }
}
