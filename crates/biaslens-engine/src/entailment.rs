//! Entailment provider abstraction
//!
//! The classifier only needs one capability from a model: given a premise
//! and a list of hypotheses, return the probability that the premise
//! entails each hypothesis. Model-backed providers live in plugin crates so
//! the engine stays free of inference dependencies.

use biaslens_core::{Error, Result};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

/// Natural-language-inference backend.
///
/// Implementations are blocking; the async analyzer runs them on the
/// blocking pool.
pub trait EntailmentProvider: Send + Sync {
    /// Entailment probability for each hypothesis, in input order.
    ///
    /// The returned vector must have the same length as `hypotheses`.
    fn entailment_probs(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f32>>;

    /// Provider name reported in classification results
    fn name(&self) -> &str;
}

impl<T: EntailmentProvider + ?Sized> EntailmentProvider for Arc<T> {
    fn entailment_probs(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f32>> {
        (**self).entailment_probs(premise, hypotheses)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Extension point for constructing a provider, usually by loading a model.
pub trait EntailmentLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn EntailmentProvider>>;

    /// Human-readable description of what will be loaded
    fn describe(&self) -> String;
}

/// Index of the entailment class in a model's label map.
///
/// Models disagree on label order, so the index is looked up by name.
pub fn resolve_entailment_index<'a, I>(id2label: I) -> Result<usize>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    id2label
        .into_iter()
        .find(|(_, label)| label.eq_ignore_ascii_case("entailment"))
        .map(|(idx, _)| idx)
        .ok_or_else(|| Error::model_unavailable("model config has no entailment label"))
}

/// Provider that loads its inner provider on first use.
///
/// Exactly one load is attempted however many callers race on first use;
/// the others wait for it. A failed load is cached and reported on every
/// later call without retrying.
pub struct LazyEntailmentProvider {
    loader: Box<dyn EntailmentLoader>,
    name: String,
    cell: OnceLock<std::result::Result<Arc<dyn EntailmentProvider>, String>>,
}

impl LazyEntailmentProvider {
    pub fn new(loader: impl EntailmentLoader + 'static) -> Self {
        let name = loader.describe();
        Self {
            loader: Box::new(loader),
            name,
            cell: OnceLock::new(),
        }
    }

    /// The loaded provider, loading it if needed
    pub fn get(&self) -> Result<Arc<dyn EntailmentProvider>> {
        let slot = self.cell.get_or_init(|| {
            info!(provider = %self.name, "Loading entailment provider");
            match self.loader.load() {
                Ok(provider) => {
                    info!(provider = provider.name(), "Entailment provider ready");
                    Ok(provider)
                }
                Err(e) => {
                    error!(provider = %self.name, error = %e, "Entailment provider failed to load");
                    Err(match e {
                        Error::ModelUnavailable(msg) => msg,
                        other => other.to_string(),
                    })
                }
            }
        });

        match slot {
            Ok(provider) => Ok(Arc::clone(provider)),
            Err(msg) => Err(Error::model_unavailable(msg.clone())),
        }
    }

    /// Whether a load has been attempted and succeeded
    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}

impl EntailmentProvider for LazyEntailmentProvider {
    fn entailment_probs(&self, premise: &str, hypotheses: &[String]) -> Result<Vec<f32>> {
        self.get()?.entailment_probs(premise, hypotheses)
    }

    fn name(&self) -> &str {
        match self.cell.get() {
            Some(Ok(provider)) => provider.name(),
            _ => &self.name,
        }
    }
}
