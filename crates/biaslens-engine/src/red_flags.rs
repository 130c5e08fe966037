//! Explained, severity-tagged findings from keyword matches

use crate::dictionary::PhraseDictionary;
use biaslens_core::{Category, Facet, FlagSeverity, KeywordAnalysis, PhraseEntry, RedFlag};
use std::collections::HashSet;
use std::sync::Arc;

pub struct RedFlagGenerator {
    dictionary: Arc<PhraseDictionary>,
}

/// Label and wording for one kind of finding
struct FlagKind {
    label: &'static str,
    why: &'static str,
    fallback_suggestion: &'static str,
}

impl RedFlagGenerator {
    pub fn new(dictionary: Arc<PhraseDictionary>) -> Self {
        Self { dictionary }
    }

    /// One flag per distinct matched phrase, in category order.
    pub fn generate(&self, keywords: &KeywordAnalysis) -> Vec<RedFlag> {
        let mut seen = HashSet::new();
        let mut flags = Vec::new();

        for (category, result) in keywords.iter() {
            for phrase in &result.matches {
                if !seen.insert(phrase.as_str()) {
                    continue;
                }
                let entry = self.dictionary.get(phrase);
                flags.push(build_flag(phrase, category, entry));
            }
        }
        flags
    }
}

fn build_flag(phrase: &str, category: Category, entry: Option<&PhraseEntry>) -> RedFlag {
    let facet = entry.and_then(|e| e.facet);
    let kind = flag_kind(category, facet);

    let severity = match (entry.map(PhraseEntry::is_explicit), facet) {
        (Some(true), _) => FlagSeverity::High,
        (
            _,
            Some(
                Facet::WorkAuthorization
                | Facet::StudentVisa
                | Facet::Language
                | Facet::Accommodation
                | Facet::Appearance,
            ),
        ) => FlagSeverity::High,
        _ => FlagSeverity::Medium,
    };

    let suggestion = match entry.map(|e| e.replacement.as_str()) {
        Some(replacement) if !replacement.is_empty() => {
            format!("Replace \"{}\" with \"{}\".", phrase, replacement)
        }
        _ => kind.fallback_suggestion.to_string(),
    };

    RedFlag {
        text: phrase.to_string(),
        severity,
        category: kind.label.to_string(),
        explanation: format!("\"{}\" {}", phrase, kind.why),
        suggestion,
    }
}

fn flag_kind(category: Category, facet: Option<Facet>) -> FlagKind {
    match facet {
        Some(Facet::WorkAuthorization) => FlagKind {
            label: "Visa/Citizenship Restriction",
            why: "restricts eligibility by citizenship or visa status and shuts out qualified international candidates.",
            fallback_suggestion: "Remove the restriction unless it is legally required, and state the actual work-authorization requirement neutrally.",
        },
        Some(Facet::Language) => FlagKind {
            label: "Language Discrimination",
            why: "ties the role to native-speaker status or accent rather than the communication skills the job needs.",
            fallback_suggestion: "Describe the required language proficiency, for example \"fluent in English\".",
        },
        Some(Facet::StudentVisa) => FlagKind {
            label: "International Student Exclusion",
            why: "excludes international students on OPT, CPT or F-1 status.",
            fallback_suggestion: "Remove the exclusion or explain the specific authorization the role requires.",
        },
        Some(Facet::Location) => FlagKind {
            label: "Location Restriction",
            why: "favours local background over the skills the role requires.",
            fallback_suggestion: "Ask for the relevant experience without tying it to a country or region.",
        },
        Some(Facet::Gender) => FlagKind {
            label: "Gender Discrimination",
            why: "names or implies a gender for the role.",
            fallback_suggestion: "Use gender-neutral wording that addresses all candidates.",
        },
        Some(Facet::AgeCutoff) => FlagKind {
            label: "Age Discrimination",
            why: "sets an age limit, which is discriminatory in most jurisdictions.",
            fallback_suggestion: "Remove the age requirement and describe the experience level instead.",
        },
        Some(Facet::Accommodation) => FlagKind {
            label: "Disability Discrimination",
            why: "refuses accommodation and excludes candidates with disabilities.",
            fallback_suggestion: "State that reasonable accommodations are available.",
        },
        Some(Facet::Appearance) => FlagKind {
            label: "Appearance Requirement",
            why: "judges candidates on looks rather than ability to do the job.",
            fallback_suggestion: "Remove appearance requirements that are not essential to the role.",
        },
        None => category_kind(category),
    }
}

fn category_kind(category: Category) -> FlagKind {
    match category {
        Category::MasculineCoded => FlagKind {
            label: "Gendered Language",
            why: "is masculine-coded and discourages many women from applying.",
            fallback_suggestion: "Use neutral wording that describes the behaviour you need.",
        },
        Category::FeminineCoded => FlagKind {
            label: "Gendered Language",
            why: "is feminine-coded; balance it with neutral descriptions of the work.",
            fallback_suggestion: "Pair it with neutral, skill-based wording.",
        },
        Category::AgeBiased => FlagKind {
            label: "Age-Coded Language",
            why: "signals a preference for younger candidates.",
            fallback_suggestion: "Describe the skills or experience level instead of age-linked traits.",
        },
        Category::ExclusionaryLanguage => FlagKind {
            label: "Exclusionary Language",
            why: "discourages qualified candidates from applying.",
            fallback_suggestion: "Rephrase around the skills the role actually requires.",
        },
        Category::CulturalFit => FlagKind {
            label: "Cultural Fit Bias",
            why: "is vague culture-fit language that tends to favour people like the existing team.",
            fallback_suggestion: "Name the specific values or working style you are looking for.",
        },
        Category::DisabilityBiased => FlagKind {
            label: "Physical Ability Requirement",
            why: "may exclude people with disabilities if it is not essential to the role.",
            fallback_suggestion: "Keep only essential physical requirements and add \"with or without reasonable accommodation\".",
        },
        Category::AppearanceBiased => FlagKind {
            label: "Appearance Requirement",
            why: "focuses on appearance rather than job performance.",
            fallback_suggestion: "Describe professional conduct instead of appearance.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordDetector;

    fn flags_for(text: &str) -> Vec<RedFlag> {
        let dictionary = PhraseDictionary::builtin();
        let detector = KeywordDetector::new(Arc::clone(&dictionary)).unwrap();
        RedFlagGenerator::new(dictionary).generate(&detector.detect(text))
    }

    #[test]
    fn test_native_speaker_is_language_discrimination() {
        let flags = flags_for("Native English speaker required.");
        assert_eq!(flags.len(), 1);
        let flag = &flags[0];
        assert_eq!(flag.text, "native english speaker");
        assert_eq!(flag.category, "Language Discrimination");
        assert_eq!(flag.severity, FlagSeverity::High);
        assert!(flag.explanation.contains("\"native english speaker\""));
        assert!(flag.suggestion.contains("fluent in English"));
    }

    #[test]
    fn test_coded_language_is_medium() {
        let flags = flags_for("Join our rockstar team and be a great culture fit.");
        let rockstar = flags.iter().find(|f| f.text == "rockstar").unwrap();
        assert_eq!(rockstar.severity, FlagSeverity::Medium);
        assert_eq!(rockstar.category, "Gendered Language");
        let culture = flags.iter().find(|f| f.text == "culture fit").unwrap();
        assert_eq!(culture.severity, FlagSeverity::Medium);
        assert_eq!(culture.category, "Cultural Fit Bias");
    }

    #[test]
    fn test_citizenship_flags() {
        let flags = flags_for("Only U.S. citizens will be considered; no visa sponsorship.");
        assert_eq!(flags.len(), 2);
        assert!(flags
            .iter()
            .all(|f| f.severity == FlagSeverity::High && f.category == "Visa/Citizenship Restriction"));
    }

    #[test]
    fn test_dedup_across_categories() {
        let mut keywords = KeywordAnalysis::default();
        keywords.masculine_coded.record("driven");
        keywords.age_biased.record("driven");
        let flags = RedFlagGenerator::new(PhraseDictionary::builtin()).generate(&keywords);
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn test_unknown_phrase_uses_category_defaults() {
        let mut keywords = KeywordAnalysis::default();
        keywords.disability_biased.record("must climb ladders");
        let flags = RedFlagGenerator::new(PhraseDictionary::builtin()).generate(&keywords);
        assert_eq!(flags[0].category, "Physical Ability Requirement");
        assert_eq!(flags[0].severity, FlagSeverity::Medium);
        assert!(flags[0].suggestion.contains("reasonable accommodation"));
    }

    #[test]
    fn test_no_matches_no_flags() {
        assert!(flags_for("We welcome applicants from all backgrounds and identities.").is_empty());
    }
}
