//! BiasLens Engine
//!
//! Hybrid bias detection and scoring for job postings.
//!
//! - [`KeywordDetector`] matches the curated [`PhraseDictionary`]
//! - [`ZeroShotClassifier`] scores bias hypotheses with any
//!   [`EntailmentProvider`], boosted by the [`InternationalBiasHeuristic`]
//! - [`BiasScorer`] blends both signals into bounded scores
//! - [`RedFlagGenerator`] explains each match
//! - [`BiasAnalyzer`] runs the pipeline and never fails; without a working
//!   provider it falls back to keyword-inferred classification
//!
//! ```no_run
//! use biaslens_engine::{BiasAnalyzer, EngineConfig};
//!
//! let analyzer = BiasAnalyzer::new(EngineConfig::default())?;
//! let result = analyzer.analyze("Native English speaker required.", false);
//! assert!(result.bias_score > 0);
//! # Ok::<(), biaslens_core::Error>(())
//! ```

pub mod analyzer;
pub mod breakdown;
pub mod classification;
pub mod config;
pub mod dictionary;
pub mod entailment;
pub mod international;
pub mod keywords;
pub mod red_flags;
pub mod scorer;
pub mod segmenter;

pub use analyzer::{describe_metrics, BiasAnalyzer, BiasAnalyzerBuilder};
pub use classification::{keyword_fallback, ZeroShotClassifier, FALLBACK_PROVIDER};
pub use config::{EngineConfig, INTL_LABEL, NEUTRAL_LABEL};
pub use dictionary::PhraseDictionary;
pub use entailment::{
    resolve_entailment_index, EntailmentLoader, EntailmentProvider,
    LazyEntailmentProvider,
};
pub use international::InternationalBiasHeuristic;
pub use keywords::KeywordDetector;
pub use red_flags::RedFlagGenerator;
pub use scorer::{BiasScorer, Scores};
pub use segmenter::{segment, Segment};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analyzer::BiasAnalyzer;
    pub use crate::config::EngineConfig;
    pub use crate::entailment::{EntailmentLoader, EntailmentProvider};
    pub use biaslens_core::prelude::*;
}
