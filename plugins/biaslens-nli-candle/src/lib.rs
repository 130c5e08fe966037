//! Candle/HuggingFace NLI entailment provider for `biaslens-engine`.
//!
//! [`CandleNliLoader`] is handed to
//! `biaslens_engine::BiasAnalyzerBuilder::loader`; the model is fetched and
//! loaded on the first NLI analysis, not at startup.

pub mod config;
pub mod provider;

pub use config::{ModelSource, NliArchitecture, NliModelConfig};
pub use provider::{CandleNliLoader, CandleNliProvider};
