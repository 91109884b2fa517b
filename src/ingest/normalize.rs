//! Narrative text normalization.
//!
//! Complaint narratives arrive with inconsistent casing, whitespace and
//! punctuation noise. Normalization is lossless enough for semantic search:
//! collapse whitespace, strip characters outside a small allowed set,
//! lowercase. Queries pass through the same function so index-time and
//! query-time text agree.

use std::sync::OnceLock;

use regex::Regex;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[^A-Za-z0-9.,!?'" ]+"#).expect("static regex"))
}

/// Normalizes a narrative or question for chunking and embedding.
///
/// Stripping a disallowed run can leave two adjacent spaces behind, so
/// whitespace is collapsed again afterwards.
pub fn normalize_text(text: &str) -> String {
    let collapsed = whitespace_re().replace_all(text, " ");
    let stripped = disallowed_re().replace_all(collapsed.trim(), "");
    let recollapsed = whitespace_re().replace_all(&stripped, " ");
    recollapsed.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_lowercases() {
        let input = "My   card\twas\ncharged  TWICE";
        assert_eq!(normalize_text(input), "my card was charged twice");
    }

    #[test]
    fn strips_disallowed_characters() {
        let input = "Charged $500.00 (twice!) — on 2023-01-05?";
        assert_eq!(normalize_text(input), "charged 500.00 twice! on 20230105?");
    }

    #[test]
    fn keeps_quotes_and_sentence_punctuation() {
        let input = r#"They said "pending review," but didn't act."#;
        assert_eq!(
            normalize_text(input),
            r#"they said "pending review," but didn't act."#
        );
    }

    #[test]
    fn empty_and_whitespace_only_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n\t  "), "");
    }
}
