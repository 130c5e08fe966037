//! BiasLens Core
//!
//! Core types and error handling shared across BiasLens components.
//!
//! This crate provides:
//! - Typed records for keyword analysis, classification, scores and red flags
//! - The phrase dictionary entry model with authoring-time severity tags
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    AnalysisResult, AnalysisType, BatchItemResult, BatchJob, BiasScoreBreakdown,
    BreakdownCategory, Category, CategoryResult, ClassificationResult, ConfidenceLevel, Facet,
    FlagSeverity, InclusivityBand, InclusivityBreakdown, InclusivityScore, IssueCounts,
    KeywordAnalysis, PhraseEntry, PhraseSeverity, RedFlag, SentenceInsight,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        AnalysisResult, Category, ClassificationResult, KeywordAnalysis, PhraseEntry, RedFlag,
    };
}
