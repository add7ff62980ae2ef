//! Post-extraction cleanup pipeline for plain text.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! PDF text layers in particular come out with stray control characters,
//! words split across line breaks, and ragged spacing.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw extracted text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = normalize_line_endings(text);

    result = strip_control_chars(&result);
    result = rejoin_hyphenated(&result);
    result = collapse_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Control characters
// ---------------------------------------------------------------------------

/// Replace control characters (form feeds, NULs, BOMs) with a space.
/// Newlines and tabs survive.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .map(|c| {
            if (c.is_control() && c != '\n' && c != '\t') || c == '\u{feff}' {
                ' '
            } else {
                c
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 3: Hyphenation across line breaks
// ---------------------------------------------------------------------------

/// Rejoin `topi-\ncal` into `topical`.
///
/// Only fires when letters sit on both sides of the break, so list dashes
/// and numeric ranges are left alone.
fn rejoin_hyphenated(text: &str) -> String {
    static HYPHEN_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(\p{Alphabetic})-[ \t]*\n[ \t]*(\p{Lowercase})").expect("valid regex")
    });

    HYPHEN_BREAK_RE.replace_all(text, "${1}${2}").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Whitespace
// ---------------------------------------------------------------------------

/// Collapse horizontal whitespace runs, trim lines, and keep at most one
/// blank line between paragraphs.
fn collapse_whitespace(text: &str) -> String {
    static SPACE_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let lines: Vec<String> = text
        .lines()
        .map(|line| SPACE_RUN_RE.replace_all(line, " ").trim().to_string())
        .collect();

    let joined = lines.join("\n");
    MULTI_BLANK_RE
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let raw = "alpha\u{0c}beta\u{0}gamma\tdelta";
        assert_eq!(strip_control_chars(raw), "alpha beta gamma\tdelta");
    }

    #[test]
    fn rejoins_words_split_across_lines() {
        assert_eq!(rejoin_hyphenated("topi-\ncal models"), "topical models");
        assert_eq!(rejoin_hyphenated("latent-  \n  dirichlet"), "latentdirichlet");
    }

    #[test]
    fn keeps_list_dashes_and_ranges() {
        let text = "items:\n- first\n- second\npages 10-\n12";
        assert_eq!(rejoin_hyphenated(text), text);
    }

    #[test]
    fn keeps_capitalized_continuations() {
        // "Anglo-\nSaxon" is a real compound, not a broken word.
        assert_eq!(rejoin_hyphenated("Anglo-\nSaxon"), "Anglo-\nSaxon");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let text = "  one   two\t\tthree  \n\n\n\n four ";
        assert_eq!(collapse_whitespace(text), "one two three\n\nfour");
    }

    #[test]
    fn full_pipeline() {
        let raw = "\u{feff}Intro-\r\nduction  to\r\n\r\n\r\n\r\ntopic\u{0c}models\r\n";
        assert_eq!(run_pipeline(raw), "Introduction to\n\ntopic models");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(run_pipeline(""), "");
        assert_eq!(run_pipeline(" \n\t\n "), "");
    }
}
