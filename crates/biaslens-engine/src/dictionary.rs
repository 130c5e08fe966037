//! Curated phrase dictionary
//!
//! Maps each biased phrase to its category, inclusive replacement,
//! explicit/coded severity and optional facet. The built-in dictionary is
//! constructed once per process and shared read-only.

use biaslens_core::{Category, Error, Facet, PhraseEntry, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Read-only phrase dictionary
#[derive(Debug, Clone)]
pub struct PhraseDictionary {
    entries: Vec<PhraseEntry>,
    index: HashMap<String, usize>,
}

impl PhraseDictionary {
    /// Build a dictionary from entries.
    ///
    /// Phrases are lower-cased with whitespace collapsed. Empty and duplicate
    /// phrases are rejected.
    pub fn from_entries(entries: Vec<PhraseEntry>) -> Result<Self> {
        let mut normalized = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for mut entry in entries {
            entry.phrase = normalize_text(&entry.phrase);
            entry.replacement = entry.replacement.trim().to_string();

            if entry.phrase.is_empty() {
                return Err(Error::dictionary("phrase must not be empty"));
            }
            if index.contains_key(&entry.phrase) {
                return Err(Error::dictionary(format!(
                    "duplicate phrase '{}'",
                    entry.phrase
                )));
            }

            index.insert(entry.phrase.clone(), normalized.len());
            normalized.push(entry);
        }

        debug!(entries = normalized.len(), "Built phrase dictionary");
        Ok(Self {
            entries: normalized,
            index,
        })
    }

    /// Parse a YAML list of entries
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let entries: Vec<PhraseEntry> = serde_yaml::from_str(yaml)
            .map_err(|e| Error::dictionary(format!("Failed to parse dictionary: {}", e)))?;
        Self::from_entries(entries)
    }

    /// Load a YAML dictionary file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// The built-in dictionary, shared across the process
    pub fn builtin() -> Arc<PhraseDictionary> {
        static BUILTIN: OnceLock<Arc<PhraseDictionary>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                // Built-in entries are unique and non-empty; see tests.
                let dictionary = Self::from_entries(builtin_entries())
                    .unwrap_or_else(|e| panic!("built-in dictionary is invalid: {}", e));
                Arc::new(dictionary)
            })
            .clone()
    }

    /// Look up an entry by its normalized phrase
    pub fn get(&self, phrase: &str) -> Option<&PhraseEntry> {
        self.index.get(phrase).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[PhraseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one category
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &PhraseEntry> + '_ {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Entries with a non-empty replacement, longest phrase first so that
    /// rewriting never replaces a phrase nested inside a longer one first
    pub fn replacements(&self) -> Vec<&PhraseEntry> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .filter(|e| !e.replacement.is_empty())
            .collect();
        out.sort_by(|a, b| {
            b.phrase
                .chars()
                .count()
                .cmp(&a.phrase.chars().count())
                .then_with(|| a.phrase.cmp(&b.phrase))
        });
        out
    }
}

/// Lower-case and collapse runs of whitespace to a single space
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn coded(phrase: &str, category: Category, replacement: &str) -> PhraseEntry {
    PhraseEntry::new(phrase, category, replacement)
}

fn explicit(phrase: &str, category: Category, replacement: &str, facet: Facet) -> PhraseEntry {
    PhraseEntry::new(phrase, category, replacement)
        .explicit()
        .with_facet(facet)
}

fn builtin_entries() -> Vec<PhraseEntry> {
    use Category::*;

    vec![
        // Masculine-coded
        coded("aggressive", MasculineCoded, "proactive"),
        coded("ambitious", MasculineCoded, "motivated"),
        coded("assertive", MasculineCoded, "clear and direct"),
        coded("competitive", MasculineCoded, "goal-oriented"),
        coded("confident", MasculineCoded, "self-assured"),
        coded("decisive", MasculineCoded, "thoughtful decision-maker"),
        coded("dominant", MasculineCoded, "leading"),
        coded("dominate", MasculineCoded, "lead"),
        coded("driven", MasculineCoded, "motivated"),
        coded("fearless", MasculineCoded, "willing to take on challenges"),
        coded("forceful", MasculineCoded, "persuasive"),
        coded("headstrong", MasculineCoded, "determined"),
        coded("independent", MasculineCoded, "self-directed"),
        coded("outspoken", MasculineCoded, "articulate"),
        coded("rockstar", MasculineCoded, "skilled professional"),
        coded("ninja", MasculineCoded, "expert"),
        coded("guru", MasculineCoded, "specialist"),
        coded("hustle", MasculineCoded, "dedication"),
        coded("crush it", MasculineCoded, "excel"),
        coded("killer instinct", MasculineCoded, "results-focused"),
        coded("leader", MasculineCoded, "team lead"),
        coded("logical", MasculineCoded, "analytical"),
        coded("salesman", MasculineCoded, "salesperson").with_facet(Facet::Gender),
        coded("chairman", MasculineCoded, "chairperson").with_facet(Facet::Gender),
        coded("manpower", MasculineCoded, "workforce").with_facet(Facet::Gender),
        explicit("male candidates only", MasculineCoded, "all candidates", Facet::Gender),
        explicit("men only", MasculineCoded, "all candidates", Facet::Gender),
        explicit("must be male", MasculineCoded, "", Facet::Gender),
        // Feminine-coded
        coded("nurturing", FeminineCoded, "mentoring"),
        coded("empathetic", FeminineCoded, ""),
        coded("supportive", FeminineCoded, ""),
        coded("collaborative", FeminineCoded, ""),
        coded("caring", FeminineCoded, ""),
        coded("compassionate", FeminineCoded, ""),
        coded("gentle", FeminineCoded, "considerate"),
        coded("sensitive", FeminineCoded, "perceptive"),
        coded("bubbly", FeminineCoded, "enthusiastic"),
        coded("warm", FeminineCoded, "approachable"),
        coded("waitress", FeminineCoded, "server").with_facet(Facet::Gender),
        explicit("female candidates only", FeminineCoded, "all candidates", Facet::Gender),
        explicit("women only", FeminineCoded, "all candidates", Facet::Gender),
        explicit("must be female", FeminineCoded, "", Facet::Gender),
        // Age
        coded("young", AgeBiased, ""),
        coded("youthful", AgeBiased, "enthusiastic"),
        coded("energetic", AgeBiased, "enthusiastic"),
        coded("digital native", AgeBiased, "comfortable with digital tools"),
        coded("recent graduate", AgeBiased, "early-career professional"),
        coded("recent college graduate", AgeBiased, "early-career professional"),
        coded("fresh graduate", AgeBiased, "early-career professional"),
        coded("young and dynamic", AgeBiased, "dynamic"),
        coded("millennial", AgeBiased, ""),
        coded("gen z", AgeBiased, ""),
        coded("entry-level only", AgeBiased, "early-career candidates welcome"),
        explicit("under the age of", AgeBiased, "", Facet::AgeCutoff),
        explicit("no older than", AgeBiased, "", Facet::AgeCutoff),
        explicit("maximum age", AgeBiased, "", Facet::AgeCutoff),
        explicit("age limit", AgeBiased, "", Facet::AgeCutoff),
        explicit("between the ages of", AgeBiased, "", Facet::AgeCutoff),
        explicit("years old or younger", AgeBiased, "", Facet::AgeCutoff),
        // Exclusionary: work authorization
        explicit("only u.s. citizens", ExclusionaryLanguage, "candidates authorized to work in the U.S.", Facet::WorkAuthorization),
        explicit("u.s. citizens only", ExclusionaryLanguage, "candidates authorized to work in the U.S.", Facet::WorkAuthorization),
        explicit("u.s. citizen only", ExclusionaryLanguage, "candidates authorized to work in the U.S.", Facet::WorkAuthorization),
        explicit("must be a u.s. citizen", ExclusionaryLanguage, "must be authorized to work in the U.S.", Facet::WorkAuthorization),
        explicit("us citizens only", ExclusionaryLanguage, "candidates authorized to work in the U.S.", Facet::WorkAuthorization),
        explicit("no visa sponsorship", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("no work visa sponsorship", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("no sponsorship", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("will not sponsor", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("unable to sponsor", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("does not sponsor", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("green card holders only", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("us-born", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("must be eligible to work in the u.s.", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        explicit("must be authorized to work in the united states", ExclusionaryLanguage, "", Facet::WorkAuthorization),
        // Exclusionary: language
        explicit("native english speaker", ExclusionaryLanguage, "fluent in English", Facet::Language),
        explicit("native speaker", ExclusionaryLanguage, "fluent speaker", Facet::Language),
        explicit("native-level english", ExclusionaryLanguage, "professional proficiency in English", Facet::Language),
        explicit("no accent", ExclusionaryLanguage, "clear communication skills", Facet::Language),
        explicit("no strong accent", ExclusionaryLanguage, "clear communication skills", Facet::Language),
        explicit("without an accent", ExclusionaryLanguage, "with clear communication skills", Facet::Language),
        explicit("english as a first language", ExclusionaryLanguage, "fluent in English", Facet::Language),
        explicit("mother tongue", ExclusionaryLanguage, "fluent", Facet::Language),
        explicit("strong north american communication", ExclusionaryLanguage, "strong communication", Facet::Language),
        // Exclusionary: student visas
        explicit("opt/cpt", ExclusionaryLanguage, "", Facet::StudentVisa),
        explicit("opt or cpt", ExclusionaryLanguage, "", Facet::StudentVisa),
        explicit("cpt or opt", ExclusionaryLanguage, "", Facet::StudentVisa),
        explicit("no international students", ExclusionaryLanguage, "", Facet::StudentVisa),
        explicit("f-1 students", ExclusionaryLanguage, "", Facet::StudentVisa),
        explicit("international students need not apply", ExclusionaryLanguage, "", Facet::StudentVisa),
        // Exclusionary: location
        explicit("local candidates only", ExclusionaryLanguage, "candidates able to work on site", Facet::Location),
        explicit("local experience required", ExclusionaryLanguage, "relevant experience", Facet::Location),
        explicit("must currently reside in the u.s.", ExclusionaryLanguage, "", Facet::Location),
        explicit("grew up in north america", ExclusionaryLanguage, "", Facet::Location),
        explicit("must have work experience in canadian", ExclusionaryLanguage, "relevant work experience", Facet::Location),
        explicit("must have work experience in american", ExclusionaryLanguage, "relevant work experience", Facet::Location),
        // Cultural fit
        coded("culture fit", CulturalFit, "values alignment"),
        coded("cultural fit", CulturalFit, "values alignment"),
        coded("work hard play hard", CulturalFit, "committed to doing great work"),
        coded("beer fridays", CulturalFit, "team social events"),
        coded("like a family", CulturalFit, "supportive team"),
        coded("startup culture", CulturalFit, "collaborative environment"),
        coded("fast-paced environment", CulturalFit, "dynamic environment"),
        coded("thick skin", CulturalFit, "resilient"),
        coded("north american business culture", CulturalFit, "our business practices"),
        coded("western business norms", CulturalFit, "our business practices"),
        coded("american values", CulturalFit, "our values"),
        // Disability
        coded("must be able to lift", DisabilityBiased, "able to move with or without accommodation"),
        coded("must be able to stand", DisabilityBiased, "able to remain at a workstation with or without accommodation"),
        coded("must be able to walk", DisabilityBiased, "able to move around the site with or without accommodation"),
        coded("physically fit", DisabilityBiased, "able to perform the essential functions"),
        coded("perfect vision", DisabilityBiased, ""),
        coded("perfect hearing", DisabilityBiased, ""),
        coded("high stamina", DisabilityBiased, ""),
        coded("physical requirements", DisabilityBiased, "essential job functions"),
        coded("must be able to travel", DisabilityBiased, "travel is part of the role"),
        explicit("able-bodied", DisabilityBiased, "able to perform the essential functions", Facet::Accommodation),
        explicit("no accommodations", DisabilityBiased, "reasonable accommodations available", Facet::Accommodation),
        explicit("without accommodation", DisabilityBiased, "with or without reasonable accommodation", Facet::Accommodation),
        explicit("cannot accommodate", DisabilityBiased, "reasonable accommodations available", Facet::Accommodation),
        explicit("free of disabilities", DisabilityBiased, "", Facet::Accommodation),
        // Appearance
        coded("well-groomed", AppearanceBiased, "professional"),
        coded("presentable", AppearanceBiased, "professional"),
        coded("professional appearance", AppearanceBiased, "professional conduct"),
        explicit("attractive appearance", AppearanceBiased, "", Facet::Appearance),
        explicit("good-looking", AppearanceBiased, "", Facet::Appearance),
        explicit("pleasant appearance", AppearanceBiased, "", Facet::Appearance),
        explicit("clean-shaven", AppearanceBiased, "", Facet::Appearance),
        explicit("height requirement", AppearanceBiased, "", Facet::Appearance),
        explicit("weight requirement", AppearanceBiased, "", Facet::Appearance),
        explicit("no visible tattoos", AppearanceBiased, "", Facet::Appearance),
    ]
}
