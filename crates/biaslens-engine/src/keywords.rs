//! Keyword detector
//!
//! A single Aho-Corasick automaton over every dictionary phrase. Text is
//! normalized (lower-cased, whitespace collapsed) before matching.
//! Single-word phrases only count at word boundaries; multi-word phrases
//! match as substrings of the normalized text.

use crate::dictionary::{normalize_text, PhraseDictionary};
use aho_corasick::{AhoCorasick, MatchKind};
use biaslens_core::{Error, KeywordAnalysis, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub struct KeywordDetector {
    dictionary: Arc<PhraseDictionary>,
    matcher: AhoCorasick,
}

impl KeywordDetector {
    pub fn new(dictionary: Arc<PhraseDictionary>) -> Result<Self> {
        let phrases: Vec<&str> = dictionary
            .entries()
            .iter()
            .map(|e| e.phrase.as_str())
            .collect();

        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .ascii_case_insensitive(true)
            .build(&phrases)
            .map_err(|e| Error::dictionary(format!("Failed to build phrase matcher: {}", e)))?;

        Ok(Self {
            dictionary,
            matcher,
        })
    }

    pub fn dictionary(&self) -> &Arc<PhraseDictionary> {
        &self.dictionary
    }

    /// Find every dictionary phrase in `text`.
    ///
    /// Each phrase is recorded at most once however often it occurs.
    /// Matches within a category are reported in dictionary order.
    pub fn detect(&self, text: &str) -> KeywordAnalysis {
        let start = Instant::now();
        let mut analysis = KeywordAnalysis::default();

        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return analysis;
        }

        let entries = self.dictionary.entries();
        let mut hit = vec![false; entries.len()];

        for m in self.matcher.find_overlapping_iter(&normalized) {
            let idx = m.pattern().as_usize();
            if hit[idx] {
                continue;
            }
            if entries[idx].is_single_word()
                && !(is_boundary(&normalized, m.start()) && is_boundary(&normalized, m.end()))
            {
                continue;
            }
            hit[idx] = true;
        }

        for (entry, _) in entries.iter().zip(&hit).filter(|(_, h)| **h) {
            analysis.get_mut(entry.category).record(&entry.phrase);
        }

        debug!(
            matches = analysis.total_count(),
            latency_us = start.elapsed().as_micros() as u64,
            "Keyword detection complete"
        );
        analysis
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Word boundary in the regex sense: word-ness differs on the two sides
fn is_boundary(text: &str, pos: usize) -> bool {
    let before = text[..pos].chars().next_back().is_some_and(is_word_char);
    let after = text[pos..].chars().next().is_some_and(is_word_char);
    before != after
}
