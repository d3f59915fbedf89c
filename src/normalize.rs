//! Text canonicalization shared by the scorer and the embedder.

use regex::Regex;
use std::sync::OnceLock;

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s]").expect("static regex"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Lowercases, blanks out everything but `[a-z0-9]` and whitespace, then collapses
/// whitespace runs to a single space and trims the ends.
///
/// Total and idempotent: the output only ever contains `[a-z0-9 ]`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let blanked = non_alphanumeric().replace_all(&lowered, " ");
    whitespace_run().replace_all(&blanked, " ").trim().to_string()
}

/// Terms of already-normalized text. Single-character fragments carry no signal
/// and are dropped, so "c" in "c and c++" does not count as a term.
pub fn terms(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|term| term.len() >= 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
    }

    #[test]
    fn punctuation_becomes_single_spaces() {
        assert_eq!(
            normalize("  Senior Rust/C++ Engineer -- AWS, GCP!  "),
            "senior rust c engineer aws gcp"
        );
    }

    #[test]
    fn non_ascii_letters_are_blanked() {
        assert_eq!(normalize("Café Zürich"), "caf z rich");
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let once = normalize("Node.js\u{00A0}& TypeScript\r\n(5+ yrs)");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn terms_skip_single_characters() {
        let text = normalize("C and C++ or Go, R");
        assert_eq!(terms(&text).collect::<Vec<_>>(), vec!["and", "or", "go"]);
    }

    #[test]
    fn terms_of_empty_text() {
        assert_eq!(terms("").count(), 0);
    }
}
