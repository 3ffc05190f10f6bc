//! Guess normalization: deterministic cleanup of recognition output.
//!
//! ## Why is normalization necessary?
//!
//! The recognizer reads photographed lettering, so its guesses arrive with
//! OCR artefacts that are *plausible text* but *bad query input* — for
//! example:
//!
//! - Stray newlines and doubled spaces where a title wraps across a spine
//! - The whole guess wrapped in quotation marks lifted from the cover
//! - Author guesses prefixed with the cover's "by " credit line
//! - Zero-width characters from the OCR layer
//!
//! These rules run between recognition and search so the query the search
//! endpoint sees matches what a human would have typed. Each rule is a pure
//! function and independently testable.
//!
//! ## Rule Order
//!
//! Invisible characters are stripped before whitespace collapsing so a
//! zero-width-joiner between two spaces still collapses to one, and quotes
//! are stripped after trimming so a quote hugging trailing whitespace is
//! still recognised as wrapping.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest guess forwarded to the search endpoint.
///
/// A shelf photo occasionally makes the recognizer transcribe an entire
/// blurb; queries beyond this length only slow the search down.
const MAX_GUESS_LEN: usize = 256;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static RE_LEADING_BY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^by(\s+|$)").unwrap());

const INVISIBLE: [char; 5] = ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'];

/// Clean a title guess: strip invisibles, collapse whitespace, unwrap
/// quotes, cap length.
pub fn clean_guess(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = collapse_whitespace(&s);
    let s = strip_wrapping_quotes(&s);
    truncate_guess(s)
}

/// Clean an author guess: everything [`clean_guess`] does, plus stripping a
/// leading "by " credit line.
pub fn clean_author(input: &str) -> String {
    let s = clean_guess(input);
    let s = RE_LEADING_BY.replace(&s, "").to_string();
    s.trim().to_string()
}

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input.trim(), " ").to_string()
}

/// Strip one layer of matching wrapping quotes.
fn strip_wrapping_quotes(input: &str) -> String {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('“', '”'), ('«', '»')];
    let mut chars = input.chars();
    let (first, last) = match (chars.next(), chars.next_back()) {
        (Some(f), Some(l)) => (f, l),
        _ => return input.to_string(),
    };
    for (open, close) in PAIRS {
        if first == open && last == close {
            return input[first.len_utf8()..input.len() - last.len_utf8()]
                .trim()
                .to_string();
        }
    }
    input.to_string()
}

fn truncate_guess(mut input: String) -> String {
    if input.chars().count() > MAX_GUESS_LEN {
        input = input.chars().take(MAX_GUESS_LEN).collect();
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(clean_guess("The  Left Hand\n of Darkness"), "The Left Hand of Darkness");
        assert_eq!(clean_guess("  Dune  "), "Dune");
    }

    #[test]
    fn strips_wrapping_quotes() {
        assert_eq!(clean_guess("\"Dune\""), "Dune");
        assert_eq!(clean_guess("“Dune Messiah”"), "Dune Messiah");
        assert_eq!(clean_guess("«Solaris»"), "Solaris");
        // An apostrophe inside the guess is not a wrapping quote.
        assert_eq!(clean_guess("Ender's Game"), "Ender's Game");
    }

    #[test]
    fn strips_invisible_characters() {
        assert_eq!(clean_guess("Du\u{200B}ne"), "Dune");
        assert_eq!(clean_guess("\u{FEFF}Dune"), "Dune");
    }

    #[test]
    fn author_drops_leading_by_credit() {
        assert_eq!(clean_author("by Frank Herbert"), "Frank Herbert");
        assert_eq!(clean_author("BY  Ursula K. Le Guin"), "Ursula K. Le Guin");
        // "by" must be a standalone prefix word.
        assert_eq!(clean_author("Byron Quill"), "Byron Quill");
    }

    #[test]
    fn empty_and_whitespace_guesses_come_out_empty() {
        assert_eq!(clean_guess(""), "");
        assert_eq!(clean_guess("   \n\t"), "");
        assert_eq!(clean_author("by "), "");
    }

    #[test]
    fn overlong_guesses_are_capped() {
        let long = "x".repeat(1000);
        assert_eq!(clean_guess(&long).chars().count(), MAX_GUESS_LEN);
    }
}
