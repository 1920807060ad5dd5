use itertools::Itertools;
use std::ops::Index;
use std::sync::Arc;

/// Collapse whitespace inside every line and drop the lines left empty.
///
/// Surviving lines are joined with a single `\n`, so every pair of
/// neighbouring words ends up separated by exactly one character. The
/// highlight offsets depend on that.
pub fn normalize(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().join(" "))
        .filter(|line| !line.is_empty())
        .join("\n")
}

/// Split normalized text into words. Line breaks are separators, not tokens.
pub fn tokenize(normalized: &str) -> WordSequence {
    normalized.split_whitespace().map(str::to_owned).collect()
}

/// Ordered, immutable list of non-empty words for one reveal session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordSequence {
    words: Arc<[String]>,
}

impl WordSequence {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// The words joined by single spaces.
    pub fn joined(&self) -> String {
        self.words.join(" ")
    }
}

impl Index<usize> for WordSequence {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.words[index]
    }
}

impl FromIterator<String> for WordSequence {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        // empty tokens would break the offset arithmetic
        let words: Vec<String> = iter.into_iter().filter(|w| !w.is_empty()).collect();
        Self {
            words: words.into(),
        }
    }
}

impl<'a> FromIterator<&'a str> for WordSequence {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_owned).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_and_drops_blank_lines() {
        assert_eq!(normalize("Hello   world\n\nfoo bar"), "Hello world\nfoo bar");
    }

    #[test]
    fn test_normalize_trims_lines_and_tabs() {
        assert_eq!(
            normalize("  \tone\t two  \r\n   \r\n three   "),
            "one two\nthree"
        );
    }

    #[test]
    fn test_normalize_whitespace_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t\n  "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "",
            "a",
            "  a  b\n\n\n c ",
            "line one\r\nline   two\n\n\tline three\t",
            "ünïcödé   wörds\n  ok",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn test_tokenize_example() {
        let words = tokenize(&normalize("Hello   world\n\nfoo bar"));
        assert_eq!(words.iter().collect::<Vec<_>>(), ["Hello", "world", "foo", "bar"]);
        assert_eq!(words.len(), 4);
        assert_eq!(&words[2], "foo");
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert!(tokenize(&normalize("   \n  ")).is_empty());
        assert_eq!(tokenize("").get(0), None);
    }

    #[test]
    fn test_joined_matches_normalized_text() {
        let samples = ["Hello   world\n\nfoo bar", "  x\ny\n\nz  w ", "single"];
        for s in samples {
            let normalized = normalize(s);
            assert_eq!(tokenize(&normalized).joined(), normalized.replace('\n', " "));
        }
    }

    #[test]
    fn test_collect_skips_empty_tokens() {
        let words: WordSequence = ["a", "", "b"].into_iter().collect();
        assert_eq!(words.len(), 2);
        assert_eq!(words.joined(), "a b");
    }
}
