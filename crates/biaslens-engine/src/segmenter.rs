//! Sentence segmentation with byte offsets into the source text

use regex::Regex;
use std::sync::OnceLock;

/// A sentence slice of the original text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    /// Byte offset into the original text
    pub start: usize,
    /// Exclusive byte offset into the original text
    pub end: usize,
}

fn sentence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Runs of non-terminal characters plus any trailing terminators.
    // Newlines end a sentence even without punctuation.
    RE.get_or_init(|| Regex::new(r"[^.!?\r\n]+[.!?]*").expect("valid sentence regex"))
}

fn is_bullet(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '*' | '•' | '·' | '–' | '>')
}

/// Split `text` into sentences.
///
/// Each segment is trimmed of whitespace and leading bullet markers, and
/// `&text[seg.start..seg.end] == seg.text` always holds. Segments with no
/// alphanumeric content are dropped.
pub fn segment(text: &str) -> Vec<Segment<'_>> {
    sentence_regex()
        .find_iter(text)
        .filter_map(|m| {
            let raw = m.as_str();
            let lead = raw.len() - raw.trim_start_matches(is_bullet).len();
            let body = raw[lead..].trim_end();
            if !body.chars().any(char::is_alphanumeric) {
                return None;
            }
            let start = m.start() + lead;
            Some(Segment {
                text: body,
                start,
                end: start + body.len(),
            })
        })
        .collect()
}

/// Maps byte offsets of one text to char offsets, scanning forward from
/// the previous lookup
pub struct CharOffsets<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharOffsets<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    /// Char offset of `byte`, which must lie on a char boundary
    pub fn char_offset(&mut self, byte: usize) -> usize {
        if byte < self.byte {
            self.byte = 0;
            self.chars = 0;
        }
        self.chars += self.text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

/// Cut `text` to at most `max_chars` characters, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_reproduce_text() {
        let text = "We are hiring!  You will lead a team.\n- Must be a culture fit\nApply now?";
        let segments = segment(text);
        let sentences: Vec<_> = segments.iter().map(|s| s.text).collect();
        assert_eq!(
            sentences,
            vec![
                "We are hiring!",
                "You will lead a team.",
                "Must be a culture fit",
                "Apply now?"
            ]
        );
        for s in &segments {
            assert_eq!(&text[s.start..s.end], s.text);
        }
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "Équipe très soudée. Café gratuit…";
        for s in segment(text) {
            assert_eq!(&text[s.start..s.end], s.text);
        }
    }

    #[test]
    fn test_skips_punctuation_only() {
        assert!(segment("... !!! \n - \n").is_empty());
        assert!(segment("").is_empty());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
