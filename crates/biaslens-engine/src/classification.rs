//! Zero-shot bias classification
//!
//! Every candidate label is phrased as a hypothesis and scored with an
//! [`EntailmentProvider`]. Scores are the raw entailment probabilities of
//! each hypothesis; they are not renormalized across labels. The
//! international heuristic boosts `intl-bias` before ranking, and a
//! per-sentence pass pinpoints where the bias occurs.

use crate::config::{ClassificationConfig, INTL_LABEL, NEUTRAL_LABEL};
use crate::entailment::EntailmentProvider;
use crate::international::InternationalBiasHeuristic;
use crate::segmenter::{segment, truncate_chars, CharOffsets};
use biaslens_core::{
    Category, ClassificationResult, ConfidenceLevel, Error, KeywordAnalysis, Result,
    SentenceInsight,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Provider name reported when classification was inferred from keywords
pub const FALLBACK_PROVIDER: &str = "keyword-fallback";

/// Ranked labels with raw and calibrated scores
#[derive(Debug, Clone, PartialEq)]
struct Ranking {
    labels: Vec<String>,
    scores: Vec<f32>,
    calibrated: Vec<f32>,
}

pub struct ZeroShotClassifier {
    config: ClassificationConfig,
    hypotheses: Vec<String>,
    heuristic: Arc<InternationalBiasHeuristic>,
}

impl ZeroShotClassifier {
    pub fn new(config: ClassificationConfig, heuristic: Arc<InternationalBiasHeuristic>) -> Self {
        let hypotheses = config.hypotheses();
        Self {
            config,
            hypotheses,
            heuristic,
        }
    }

    /// Classify a document and its sentences.
    ///
    /// Any provider error aborts the whole classification; the analyzer
    /// turns that into a keyword fallback.
    #[instrument(skip_all, fields(provider = provider.name(), chars = text.len()))]
    pub fn classify(
        &self,
        provider: &dyn EntailmentProvider,
        text: &str,
    ) -> Result<ClassificationResult> {
        if text.trim().is_empty() {
            return Ok(ClassificationResult {
                labels: vec![NEUTRAL_LABEL.to_string()],
                scores: vec![1.0],
                calibrated_scores: vec![1.0],
                provider: provider.name().to_string(),
                sentence_insights: Vec::new(),
                fallback: false,
                error: None,
            });
        }

        let premise = truncate_chars(text, self.config.max_premise_chars);
        let probs = self.entail(provider, premise)?;
        let ranking = self.rank(probs, self.heuristic.boost(text));

        let sentence_insights = if self.config.sentence_level {
            self.sentence_insights(provider, text)?
        } else {
            Vec::new()
        };

        debug!(
            top = ranking.labels.first().map(String::as_str).unwrap_or(""),
            insights = sentence_insights.len(),
            "Zero-shot classification complete"
        );

        Ok(ClassificationResult {
            labels: ranking.labels,
            scores: ranking.scores,
            calibrated_scores: ranking.calibrated,
            provider: provider.name().to_string(),
            sentence_insights,
            fallback: false,
            error: None,
        })
    }

    fn entail(&self, provider: &dyn EntailmentProvider, premise: &str) -> Result<Vec<f32>> {
        let probs = provider.entailment_probs(premise, &self.hypotheses)?;
        if probs.len() != self.hypotheses.len() {
            return Err(Error::inference(format!(
                "provider returned {} probabilities for {} hypotheses",
                probs.len(),
                self.hypotheses.len()
            )));
        }
        if let Some(bad) = probs.iter().find(|p| !p.is_finite()) {
            return Err(Error::inference(format!(
                "provider returned non-finite probability {}",
                bad
            )));
        }
        Ok(probs.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
    }

    /// Apply the international boost, sort descending and calibrate.
    ///
    /// A boosted `intl-bias` trailing a non-neutral top label by no more
    /// than the override margin is moved to the front with its own score,
    /// so only the first two scores may be out of order.
    fn rank(&self, probs: Vec<f32>, boost: f32) -> Ranking {
        let mut pairs: Vec<(&str, f32)> = self
            .config
            .labels
            .iter()
            .map(|l| l.label.as_str())
            .zip(probs)
            .map(|(label, p)| {
                if label == INTL_LABEL && boost > 0.0 {
                    (label, (p + boost).min(1.0))
                } else {
                    (label, p)
                }
            })
            .collect();

        // Stable: equal scores keep label order
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        if let Some(pos) = pairs.iter().position(|(l, _)| *l == INTL_LABEL) {
            let (top_label, top_score) = pairs[0];
            if pos > 0
                && top_label != NEUTRAL_LABEL
                && self.heuristic.should_override(boost, top_score - pairs[pos].1)
            {
                let intl = pairs.remove(pos);
                pairs.insert(0, intl);
            }
        }

        let calibrated = pairs
            .iter()
            .map(|(label, score)| self.config.calibration(label).apply(*score))
            .collect();

        Ranking {
            labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
            scores: pairs.iter().map(|(_, s)| *s).collect(),
            calibrated,
        }
    }

    fn sentence_insights(
        &self,
        provider: &dyn EntailmentProvider,
        text: &str,
    ) -> Result<Vec<SentenceInsight>> {
        let mut high = Vec::new();
        let mut low = Vec::new();
        let mut offsets = CharOffsets::new(text);

        for seg in segment(text) {
            if seg.text.chars().count() < self.config.min_sentence_chars {
                continue;
            }
            let probs = self.entail(provider, seg.text)?;
            let ranking = self.rank(probs, self.heuristic.boost(seg.text));

            let (Some(label), Some(&score)) = (ranking.labels.first(), ranking.calibrated.first())
            else {
                continue;
            };
            if label == NEUTRAL_LABEL {
                continue;
            }

            let confidence_level = if score >= self.config.high_confidence_threshold {
                ConfidenceLevel::High
            } else {
                ConfidenceLevel::Low
            };
            let insight = SentenceInsight {
                sentence: seg.text.to_string(),
                start: offsets.char_offset(seg.start),
                end: offsets.char_offset(seg.end),
                label: label.clone(),
                score,
                confidence_level,
            };
            match confidence_level {
                ConfidenceLevel::High => high.push(insight),
                ConfidenceLevel::Low => low.push(insight),
            }
        }

        let by_score = |a: &SentenceInsight, b: &SentenceInsight| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
        };
        high.sort_by(by_score);
        low.sort_by(by_score);

        Ok(high
            .into_iter()
            .chain(low)
            .take(self.config.max_insights)
            .collect())
    }
}

/// Classification inferred from keyword matches when no model result is
/// available
pub fn keyword_fallback(analysis: &KeywordAnalysis, error: Option<String>) -> ClassificationResult {
    let mut pairs: Vec<(&str, f32)> = vec![(NEUTRAL_LABEL, 0.5)];

    if analysis.get(Category::ExclusionaryLanguage).count > 0 {
        pairs.insert(0, ("exclusionary-language", 0.8));
    }
    if analysis.get(Category::MasculineCoded).count > 0
        || analysis.get(Category::FeminineCoded).count > 0
    {
        pairs.insert(0, ("gender-bias", 0.7));
    }
    if analysis.get(Category::AgeBiased).count > 0 {
        pairs.insert(0, ("age-bias", 0.7));
    }

    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let scores: Vec<f32> = pairs.iter().map(|(_, s)| *s).collect();
    ClassificationResult {
        labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
        calibrated_scores: scores.clone(),
        scores,
        provider: FALLBACK_PROVIDER.to_string(),
        sentence_insights: Vec::new(),
        fallback: true,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InternationalConfig;

    /// Scores hypotheses by keyword: the listed label's hypothesis gets
    /// `hit`, everything else `miss`.
    struct Scripted {
        hit_label: &'static str,
        hit: f32,
        miss: f32,
        hypotheses: Vec<String>,
    }

    impl Scripted {
        fn new(hit_label: &'static str, hit: f32, miss: f32) -> Self {
            let config = ClassificationConfig::default();
            let hypotheses = config
                .labels
                .iter()
                .filter(|l| l.label == hit_label)
                .map(|l| l.hypothesis.clone())
                .collect();
            Self {
                hit_label,
                hit,
                miss,
                hypotheses,
            }
        }
    }

    impl EntailmentProvider for Scripted {
        fn entailment_probs(&self, _premise: &str, hypotheses: &[String]) -> Result<Vec<f32>> {
            Ok(hypotheses
                .iter()
                .map(|h| {
                    if self.hypotheses.contains(h) {
                        self.hit
                    } else {
                        self.miss
                    }
                })
                .collect())
        }

        fn name(&self) -> &str {
            self.hit_label
        }
    }

    /// Scores `label` by the first cue found in the premise; every other
    /// hypothesis gets 0.05. Premises without a cue are neutral.
    struct PerSentence {
        label: &'static str,
        rules: Vec<(&'static str, f32)>,
        hypothesis: String,
    }

    impl PerSentence {
        fn new(label: &'static str, rules: Vec<(&'static str, f32)>) -> Self {
            let hypothesis = ClassificationConfig::default()
                .labels
                .iter()
                .find(|l| l.label == label)
                .map(|l| l.hypothesis.clone())
                .unwrap();
            Self {
                label,
                rules,
                hypothesis,
            }
        }
    }

    impl EntailmentProvider for PerSentence {
        fn entailment_probs(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f32>> {
            let score = self
                .rules
                .iter()
                .find(|(cue, _)| premise.contains(cue))
                .map(|(_, s)| *s);
            Ok(hypotheses
                .iter()
                .map(|h| match score {
                    Some(score) if *h == self.hypothesis => score,
                    None if h.contains("neutral") => 0.6,
                    _ => 0.05,
                })
                .collect())
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct ShortProvider;

    impl EntailmentProvider for ShortProvider {
        fn entailment_probs(&self, _premise: &str, _hypotheses: &[String]) -> Result<Vec<f32>> {
            Ok(vec![0.5])
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    fn classifier() -> ZeroShotClassifier {
        let heuristic = InternationalBiasHeuristic::new(&InternationalConfig::default()).unwrap();
        ZeroShotClassifier::new(ClassificationConfig::default(), Arc::new(heuristic))
    }

    fn assert_descending(scores: &[f32]) {
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "not descending: {:?}", scores);
        }
    }

    #[test]
    fn test_neutral_document() {
        let result = classifier()
            .classify(
                &Scripted::new(NEUTRAL_LABEL, 0.9, 0.05),
                "We welcome applicants from all backgrounds and identities.",
            )
            .unwrap();
        assert_eq!(result.labels[0], NEUTRAL_LABEL);
        assert_eq!(result.labels.len(), 8);
        assert_descending(&result.scores);
        assert!(result.sentence_insights.is_empty());
        assert!(!result.fallback);
    }

    fn chars(text: &str, start: usize, end: usize) -> String {
        text.chars().skip(start).take(end - start).collect()
    }

    #[test]
    fn test_intl_override_within_margin() {
        // boost 0.32: intl-bias 0.1 + 0.32 = 0.42 trails age-bias 0.5 by 0.08
        let text = "Only U.S. citizens will be considered; no visa sponsorship.";
        let result = classifier()
            .classify(&Scripted::new("age-bias", 0.5, 0.1), text)
            .unwrap();
        assert_eq!(result.labels[0], INTL_LABEL);
        assert!((result.scores[0] - 0.42).abs() < 1e-6);
        assert_eq!(result.labels[1], "age-bias");
        assert_eq!(result.scores[1], 0.5);
        assert_descending(&result.scores[1..]);
    }

    #[test]
    fn test_intl_override_outside_margin() {
        let text = "Only U.S. citizens will be considered; no visa sponsorship.";
        let result = classifier()
            .classify(&Scripted::new("age-bias", 0.95, 0.01), text)
            .unwrap();
        assert_eq!(result.labels[0], "age-bias");
        assert_eq!(result.scores[0], 0.95);
        assert_eq!(result.labels[1], INTL_LABEL);
        assert!((result.scores[1] - 0.33).abs() < 1e-6);
        assert_descending(&result.scores);
    }

    #[test]
    fn test_intl_never_overrides_neutral() {
        let text = "We are happy to sponsor visas for all qualified candidates.";
        let result = classifier()
            .classify(&Scripted::new(NEUTRAL_LABEL, 0.9, 0.05), text)
            .unwrap();
        assert_eq!(result.labels[0], NEUTRAL_LABEL);
        assert_eq!(result.scores[0], 0.9);
        let intl = result.labels.iter().position(|l| l == INTL_LABEL).unwrap();
        assert!((result.scores[intl] - 0.13).abs() < 1e-6);
        assert_descending(&result.scores);
        assert!(result.triggered(0.3).is_none());
        assert!(result.sentence_insights.is_empty());
    }

    #[test]
    fn test_boost_added_and_clamped() {
        let text = "No visa sponsorship is available for this role.";
        let result = classifier()
            .classify(&Scripted::new(INTL_LABEL, 0.9, 0.1), text)
            .unwrap();
        assert_eq!(result.labels[0], INTL_LABEL);
        assert_eq!(result.scores[0], 1.0);
        assert_eq!(result.calibrated_scores[0], 1.0);
    }

    #[test]
    fn test_calibration_applied() {
        let result = classifier()
            .classify(
                &Scripted::new("culture-fit-bias", 0.6, 0.1),
                "You must be a great culture fit for our team of engineers.",
            )
            .unwrap();
        assert_eq!(result.labels[0], "culture-fit-bias");
        assert_eq!(result.scores[0], 0.6);
        assert!((result.calibrated_scores[0] - 0.51).abs() < 1e-6);
    }

    #[test]
    fn test_sentence_insights_offsets() {
        let text = "Great benefits. We need young and energetic people who love long hours.";
        let result = classifier()
            .classify(&Scripted::new("age-bias", 0.8, 0.1), text)
            .unwrap();
        assert_eq!(result.sentence_insights.len(), 1);
        let insight = &result.sentence_insights[0];
        assert_eq!(insight.label, "age-bias");
        assert_eq!(insight.confidence_level, ConfidenceLevel::High);
        assert_eq!(chars(text, insight.start, insight.end), insight.sentence);
    }

    #[test]
    fn test_sentence_insights_char_offsets() {
        let text = "Équipe café à Zürich, très sympathique. \
                    Wir suchen junge, dynamische Entwickler für unser Büro.";
        let result = classifier()
            .classify(&PerSentence::new("age-bias", vec![("junge", 0.8)]), text)
            .unwrap();
        assert_eq!(result.sentence_insights.len(), 1);
        let insight = &result.sentence_insights[0];
        assert_eq!(insight.start, 40);
        assert_eq!(insight.end, text.chars().count());
        assert_eq!(chars(text, insight.start, insight.end), insight.sentence);
    }

    #[test]
    fn test_sentence_insights_high_before_low() {
        let cues = [
            ("alpha", 0.3),
            ("bravo", 0.9),
            ("charlie", 0.2),
            ("delta", 0.5),
            ("echo", 0.35),
            ("foxtrot", 0.1),
            ("golf", 0.7),
            ("hotel", 0.15),
        ];
        let text = cues
            .iter()
            .map(|(cue, _)| format!("The {} team describes the ideal candidate here.", cue))
            .collect::<Vec<_>>()
            .join(" ");
        let result = classifier()
            .classify(&PerSentence::new("age-bias", cues.to_vec()), &text)
            .unwrap();

        let scores: Vec<f32> = result.sentence_insights.iter().map(|i| i.score).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.5, 0.35, 0.3]);
        let levels: Vec<ConfidenceLevel> = result
            .sentence_insights
            .iter()
            .map(|i| i.confidence_level)
            .collect();
        assert_eq!(
            levels,
            vec![
                ConfidenceLevel::High,
                ConfidenceLevel::High,
                ConfidenceLevel::High,
                ConfidenceLevel::Low,
                ConfidenceLevel::Low,
            ]
        );
        assert!(result.sentence_insights[0].sentence.contains("bravo"));
    }

    #[test]
    fn test_sentence_insights_capped() {
        let text = (0..8)
            .map(|i| format!("Sentence number {} describes the ideal candidate here.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let result = classifier()
            .classify(&Scripted::new("gender-bias", 0.3, 0.1), &text)
            .unwrap();
        assert_eq!(result.sentence_insights.len(), 5);
        assert!(result
            .sentence_insights
            .iter()
            .all(|i| i.confidence_level == ConfidenceLevel::Low));
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = classifier()
            .classify(&ShortProvider, "A reasonably long job posting text.")
            .unwrap_err();
        assert!(err.to_string().contains("1 probabilities for 8 hypotheses"));
    }

    #[test]
    fn test_empty_text_is_neutral() {
        let result = classifier()
            .classify(&Scripted::new("age-bias", 0.9, 0.1), "   ")
            .unwrap();
        assert_eq!(result.labels, vec![NEUTRAL_LABEL.to_string()]);
        assert_eq!(result.scores, vec![1.0]);
    }

    #[test]
    fn test_keyword_fallback_order() {
        let mut analysis = KeywordAnalysis::default();
        analysis.exclusionary_language.record("no sponsorship");
        analysis.masculine_coded.record("ninja");
        analysis.age_biased.record("young");

        let result = keyword_fallback(&analysis, Some("model unavailable".to_string()));
        assert_eq!(
            result.labels,
            vec!["exclusionary-language", "age-bias", "gender-bias", NEUTRAL_LABEL]
        );
        assert_eq!(result.scores, vec![0.8, 0.7, 0.7, 0.5]);
        assert_eq!(result.calibrated_scores, result.scores);
        assert!(result.fallback);
        assert_eq!(result.provider, FALLBACK_PROVIDER);
        assert_eq!(result.error.as_deref(), Some("model unavailable"));
    }

    #[test]
    fn test_keyword_fallback_neutral() {
        let result = keyword_fallback(&KeywordAnalysis::default(), None);
        assert_eq!(result.labels, vec![NEUTRAL_LABEL]);
        assert!(result.triggered(0.3).is_none());
    }
}
