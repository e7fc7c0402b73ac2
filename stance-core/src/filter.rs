//! Comment content filter
//!
//! Validation runs before any write reaches the backend: URL-bearing text is
//! rejected outright, empty and over-length text is rejected, and
//! dictionary-blocked words are masked with asterisks in the returned text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

/// Maximum accepted comment length, in characters.
pub const MAX_COMMENT_LEN: usize = 140;

// Matches http(s) URLs and domains embedded in comment text.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)",
    )
    .expect("URL pattern is valid")
});

/// Words masked out of comment text. Matching is case-insensitive and
/// whole-word.
const BLOCKED_WORDS: &[&str] = &[
    "arse",
    "arsehole",
    "ass",
    "asses",
    "asshole",
    "bastard",
    "bitch",
    "bollocks",
    "bullshit",
    "crap",
    "damn",
    "dick",
    "dickhead",
    "douche",
    "fuck",
    "fucker",
    "fucking",
    "jackass",
    "piss",
    "prick",
    "shit",
    "shitty",
    "slut",
    "twat",
    "wanker",
];

static BLOCKED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternation = BLOCKED_WORDS.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("blocklist pattern is valid")
});

/// Validate and clean comment text.
///
/// Returns the text with blocked words masked, or a [`ValidationError`] when
/// the text is empty, too long, or contains a URL/domain. Callers must not
/// send anything to the backend until this has succeeded.
pub fn clean_comment(text: &str) -> Result<String, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    let length = text.chars().count();
    if length > MAX_COMMENT_LEN {
        return Err(ValidationError::TooLong {
            length,
            max: MAX_COMMENT_LEN,
        });
    }

    if URL_PATTERN.is_match(text) {
        return Err(ValidationError::UrlNotAllowed);
    }

    let cleaned = BLOCKED_PATTERN.replace_all(text, |caps: &regex::Captures<'_>| {
        "*".repeat(caps[0].len())
    });
    Ok(cleaned.into_owned())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let cleaned = clean_comment("really helpful article, thanks").expect("clean");
        assert_eq!(cleaned, "really helpful article, thanks");
    }

    #[test]
    fn test_url_is_rejected() {
        let result = clean_comment("check out http://example.com now");
        assert_eq!(result, Err(ValidationError::UrlNotAllowed));
    }

    #[test]
    fn test_https_url_with_path_is_rejected() {
        let result = clean_comment("see https://spam.example.org/buy?now=1 please");
        assert_eq!(result, Err(ValidationError::UrlNotAllowed));
    }

    #[test]
    fn test_bare_domain_without_scheme_passes() {
        // The pattern requires a scheme; "example.com" alone is allowed.
        assert!(clean_comment("example.com has more detail").is_ok());
    }

    #[test]
    fn test_empty_text_is_rejected() {
        assert_eq!(clean_comment("   "), Err(ValidationError::Empty));
    }

    #[test]
    fn test_over_length_text_is_rejected() {
        let text = "a".repeat(MAX_COMMENT_LEN + 1);
        assert_eq!(
            clean_comment(&text),
            Err(ValidationError::TooLong {
                length: MAX_COMMENT_LEN + 1,
                max: MAX_COMMENT_LEN,
            })
        );
    }

    #[test]
    fn test_max_length_text_is_accepted() {
        let text = "a".repeat(MAX_COMMENT_LEN);
        assert!(clean_comment(&text).is_ok());
    }

    #[test]
    fn test_blocked_words_are_masked() {
        let cleaned = clean_comment("what a crap take").expect("clean");
        assert_eq!(cleaned, "what a **** take");
    }

    #[test]
    fn test_masking_is_case_insensitive() {
        let cleaned = clean_comment("CRAP opinion").expect("clean");
        assert_eq!(cleaned, "**** opinion");
    }

    #[test]
    fn test_blocked_word_inside_word_is_kept() {
        // "class" contains "ass" but is not a whole-word match.
        let cleaned = clean_comment("first class write-up").expect("clean");
        assert_eq!(cleaned, "first class write-up");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Property: cleaning never changes text length.
        #[test]
        fn prop_cleaning_preserves_length(text in "[a-zA-Z ]{1,140}") {
            if let Ok(cleaned) = clean_comment(&text) {
                prop_assert_eq!(cleaned.chars().count(), text.chars().count());
            }
        }

        /// Property: anything containing an http(s) URL is rejected.
        #[test]
        fn prop_urls_always_rejected(
            prefix in "[a-z ]{0,20}",
            host in "[a-z]{1,10}",
            tld in "(com|org|net)",
        ) {
            let text = format!("{prefix}https://{host}.{tld}");
            prop_assert_eq!(clean_comment(&text), Err(ValidationError::UrlNotAllowed));
        }

        /// Property: accepted output never exceeds the maximum length.
        #[test]
        fn prop_output_within_bounds(text in "\\PC{0,300}") {
            if let Ok(cleaned) = clean_comment(&text) {
                prop_assert!(cleaned.chars().count() <= MAX_COMMENT_LEN);
            }
        }
    }
}
