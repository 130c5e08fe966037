//! Rule-based international-student bias heuristic
//!
//! Case-insensitive triggers over the raw text. The summed weight of the
//! triggers that fire, capped, boosts the `intl-bias` label and feeds the
//! international score.

use crate::config::InternationalConfig;
use biaslens_core::{Error, Result};
use regex::{Regex, RegexBuilder};

struct Trigger {
    regex: Regex,
    weight: f32,
}

pub struct InternationalBiasHeuristic {
    triggers: Vec<Trigger>,
    cap: f32,
    override_threshold: f32,
    override_margin: f32,
}

impl InternationalBiasHeuristic {
    pub fn new(config: &InternationalConfig) -> Result<Self> {
        let triggers = config
            .triggers
            .iter()
            .map(|spec| {
                let regex = RegexBuilder::new(&spec.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        Error::config(format!(
                            "Invalid international trigger '{}': {}",
                            spec.pattern, e
                        ))
                    })?;
                Ok(Trigger {
                    regex,
                    weight: spec.weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            triggers,
            cap: config.cap,
            override_threshold: config.override_threshold,
            override_margin: config.override_margin,
        })
    }

    /// Summed weight of firing triggers, in `[0, cap]`. Each trigger
    /// counts once.
    pub fn boost(&self, text: &str) -> f32 {
        let total: f32 = self
            .triggers
            .iter()
            .filter(|t| t.regex.is_match(text))
            .map(|t| t.weight)
            .sum();
        total.clamp(0.0, self.cap)
    }

    /// Whether `intl-bias`, trailing the top label by `gap` after the boost
    /// was applied, should be promoted over it
    pub fn should_override(&self, boost: f32, gap: f32) -> bool {
        boost > 0.0 && boost >= self.override_threshold && gap <= self.override_margin
    }

    pub fn cap(&self) -> f32 {
        self.cap
    }
}
