//! Analysis orchestration
//!
//! [`BiasAnalyzer`] wires the detector, classifier, scorer and red-flag
//! generator together. `analyze` never fails: when the entailment provider
//! is missing, fails or times out, classification falls back to a
//! keyword-inferred result and the outcome is marked accordingly.

use crate::classification::{keyword_fallback, ZeroShotClassifier};
use crate::config::EngineConfig;
use crate::dictionary::PhraseDictionary;
use crate::entailment::{EntailmentLoader, EntailmentProvider, LazyEntailmentProvider};
use crate::international::InternationalBiasHeuristic;
use crate::keywords::KeywordDetector;
use crate::red_flags::RedFlagGenerator;
use crate::scorer::BiasScorer;
use biaslens_core::{
    AnalysisResult, AnalysisType, BatchItemResult, BatchJob, ClassificationResult, Error,
    KeywordAnalysis, RedFlag, Result,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Batch titles are cut to this many characters
const MAX_TITLE_CHARS: usize = 120;

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    metrics::describe_counter!(
        "biaslens_analyses_total",
        "Total number of analyses by classification mode"
    );
    metrics::describe_counter!(
        "biaslens_fallbacks_total",
        "Total number of keyword fallbacks by reason"
    );
    metrics::describe_histogram!(
        "biaslens_analysis_latency_us",
        metrics::Unit::Microseconds,
        "End-to-end analysis latency in microseconds"
    );
}

/// Builder for [`BiasAnalyzer`]
pub struct BiasAnalyzerBuilder {
    config: EngineConfig,
    dictionary: Option<Arc<PhraseDictionary>>,
    provider: Option<Arc<dyn EntailmentProvider>>,
}

impl BiasAnalyzerBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom dictionary instead of the built-in one
    pub fn dictionary(mut self, dictionary: Arc<PhraseDictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Inject a ready entailment provider
    pub fn provider(mut self, provider: Arc<dyn EntailmentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Load the provider lazily on first NLI request
    pub fn loader(mut self, loader: impl EntailmentLoader + 'static) -> Self {
        self.provider = Some(Arc::new(LazyEntailmentProvider::new(loader)));
        self
    }

    pub fn build(self) -> Result<BiasAnalyzer> {
        self.config.validate()?;

        let dictionary = self.dictionary.unwrap_or_else(PhraseDictionary::builtin);
        let heuristic = Arc::new(InternationalBiasHeuristic::new(&self.config.international)?);

        let detector = KeywordDetector::new(Arc::clone(&dictionary))?;
        let classifier =
            ZeroShotClassifier::new(self.config.classification.clone(), Arc::clone(&heuristic));
        let scorer = BiasScorer::new(
            self.config.scoring.clone(),
            Arc::clone(&dictionary),
            Arc::clone(&heuristic),
        );
        let red_flags = RedFlagGenerator::new(Arc::clone(&dictionary));
        let inference_slots = Arc::new(Semaphore::new(self.config.runtime.max_concurrency.max(1)));

        info!(
            phrases = dictionary.len(),
            provider = self.provider.as_ref().map(|p| p.name()).unwrap_or("none"),
            "Bias analyzer initialized"
        );

        Ok(BiasAnalyzer {
            config: self.config,
            detector,
            classifier,
            scorer,
            inference_slots,
            red_flags,
            provider: self.provider,
        })
    }
}

/// Entry point for bias analysis
pub struct BiasAnalyzer {
    config: EngineConfig,
    detector: KeywordDetector,
    classifier: ZeroShotClassifier,
    scorer: BiasScorer,
    red_flags: RedFlagGenerator,
    provider: Option<Arc<dyn EntailmentProvider>>,
    /// Bounds blocking inference, including runs whose caller timed out
    inference_slots: Arc<Semaphore>,
}

impl BiasAnalyzer {
    pub fn builder() -> BiasAnalyzerBuilder {
        BiasAnalyzerBuilder {
            config: EngineConfig::default(),
            dictionary: None,
            provider: None,
        }
    }

    /// Keyword-only analyzer with the given configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Keyword matches only
    pub fn detect(&self, text: &str) -> KeywordAnalysis {
        self.detector.detect(text)
    }

    /// Red flags for keyword matches
    pub fn red_flags(&self, keywords: &KeywordAnalysis) -> Vec<RedFlag> {
        self.red_flags.generate(keywords)
    }

    /// Classification only. Falls back to keyword inference like `analyze`.
    pub fn classify(&self, text: &str, use_nlp: bool) -> ClassificationResult {
        let keywords = self.detector.detect(text);
        self.classify_with(text, &keywords, use_nlp).0
    }

    /// Full analysis, running inference on the calling thread
    pub fn analyze(&self, text: &str, use_nlp: bool) -> AnalysisResult {
        let start = Instant::now();
        let keywords = self.detector.detect(text);
        let (classification, analysis_type) = self.classify_with(text, &keywords, use_nlp);
        self.finish(text, keywords, classification, analysis_type, start)
    }

    /// Full analysis with inference on the blocking pool, bounded by
    /// `runtime.inference_timeout_ms`. Expiry falls back to keywords.
    ///
    /// A blocking task cannot be cancelled, so a timed-out inference keeps
    /// running to completion. Each run holds one of
    /// `runtime.max_concurrency` slots until it finishes, and waiting for a
    /// slot counts against the timeout, so abandoned runs cannot pile up on
    /// the blocking pool.
    pub async fn analyze_async(self: &Arc<Self>, text: String, use_nlp: bool) -> AnalysisResult {
        let start = Instant::now();
        let keywords = self.detector.detect(&text);

        let provider = match (&self.provider, use_nlp) {
            (Some(provider), true) => Arc::clone(provider),
            _ => {
                let (classification, analysis_type) = self.classify_with(&text, &keywords, use_nlp);
                return self.finish(&text, keywords, classification, analysis_type, start);
            }
        };

        let timeout_ms = self.config.runtime.inference_timeout_ms;
        let this = Arc::clone(self);
        let premise = text.clone();
        let slots = Arc::clone(&self.inference_slots);
        let inference = async move {
            let permit = slots
                .acquire_owned()
                .await
                .map_err(|_| Error::internal("inference slots closed"))?;
            let outcome: Result<ClassificationResult> = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                this.classifier.classify(provider.as_ref(), &premise)
            })
            .await
            .map_err(|e| Error::inference(format!("inference task failed: {}", e)))?;
            outcome
        };

        let outcome = match tokio::time::timeout(Duration::from_millis(timeout_ms), inference).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(timeout_ms)),
        };

        let (classification, analysis_type) = self.resolve(outcome, &keywords);
        self.finish(&text, keywords, classification, analysis_type, start)
    }

    /// Analyze independent postings concurrently, up to
    /// `runtime.max_concurrency` at a time. Results keep input order.
    pub async fn analyze_batch(self: &Arc<Self>, jobs: Vec<BatchJob>) -> Vec<BatchItemResult> {
        let concurrency = self.config.runtime.max_concurrency.max(1);
        info!(jobs = jobs.len(), concurrency, "Starting batch analysis");

        stream::iter(jobs)
            .map(|job| {
                let this = Arc::clone(self);
                async move {
                    let title = title_of(&job.text);
                    let result = this.analyze_async(job.text, job.use_nlp).await;
                    BatchItemResult {
                        id: job.id,
                        title,
                        bias_score: result.bias_score,
                        international_student_bias_score: result.international_student_bias_score,
                        inclusivity_score: result.inclusivity_score,
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    fn classify_with(
        &self,
        text: &str,
        keywords: &KeywordAnalysis,
        use_nlp: bool,
    ) -> (ClassificationResult, AnalysisType) {
        if !use_nlp {
            return (keyword_fallback(keywords, None), AnalysisType::KeywordOnly);
        }
        let outcome = match &self.provider {
            Some(provider) => self.classifier.classify(provider.as_ref(), text),
            None => Err(Error::model_unavailable("no entailment provider configured")),
        };
        self.resolve(outcome, keywords)
    }

    fn resolve(
        &self,
        outcome: Result<ClassificationResult>,
        keywords: &KeywordAnalysis,
    ) -> (ClassificationResult, AnalysisType) {
        match outcome {
            Ok(classification) => (classification, AnalysisType::Full),
            Err(e) => {
                let reason = fallback_reason(&e);
                warn!(error = %e, reason, "Entailment failed, using keyword fallback");
                metrics::counter!("biaslens_fallbacks_total", "reason" => reason).increment(1);
                (
                    keyword_fallback(keywords, Some(e.to_string())),
                    AnalysisType::KeywordFallback,
                )
            }
        }
    }

    fn finish(
        &self,
        text: &str,
        keywords: KeywordAnalysis,
        classification: ClassificationResult,
        analysis_type: AnalysisType,
        start: Instant,
    ) -> AnalysisResult {
        let scores = self.scorer.score(&keywords, &classification, text);
        let red_flags = self.red_flags.generate(&keywords);
        let issue_counts = self.scorer.issue_counts(&keywords);

        let mode = match analysis_type {
            AnalysisType::Full => "full",
            AnalysisType::KeywordFallback => "keyword_fallback",
            AnalysisType::KeywordOnly => "keyword_only",
        };
        let latency = start.elapsed();
        metrics::counter!("biaslens_analyses_total", "mode" => mode).increment(1);
        metrics::histogram!("biaslens_analysis_latency_us").record(latency.as_micros() as f64);

        debug!(
            mode,
            bias_score = scores.bias_score,
            international_score = scores.international_score,
            inclusivity = scores.inclusivity.overall,
            red_flags = red_flags.len(),
            latency_us = latency.as_micros() as u64,
            "Analysis complete"
        );

        AnalysisResult {
            bias_score: scores.bias_score,
            international_student_bias_score: scores.international_score,
            inclusivity_score: scores.inclusivity,
            keyword_analysis: keywords,
            nlp_used: !classification.fallback,
            classification,
            bias_breakdown: scores.breakdown,
            red_flags,
            issue_counts,
            analysis_type,
        }
    }
}

/// Metric label for the error behind a keyword fallback
fn fallback_reason(error: &Error) -> &'static str {
    match error {
        Error::ModelUnavailable(_) => "model_unavailable",
        Error::Timeout(_) => "timeout",
        _ => "inference_error",
    }
}

/// First non-empty line, cut to [`MAX_TITLE_CHARS`]
fn title_of(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    line.chars().take(MAX_TITLE_CHARS).collect()
}
