//! Issue reference extraction from commit messages.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// One issue-reference shape, e.g. `closes #12`.
///
/// The first capture group must hold the issue number.
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    /// Short name used in logs and tests.
    pub name: &'static str,
    /// Compiled pattern.
    pub regex: Regex,
}

impl ReferencePattern {
    /// Returns true if the pattern occurs in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Returns every issue number this pattern captures in `text`.
    pub fn numbers<'a>(&'a self, text: &'a str) -> impl Iterator<Item = u64> + 'a {
        self.regex
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .filter_map(|m| m.as_str().parse().ok())
    }
}

const DEFAULT_PATTERN_SOURCES: &[(&str, &str)] = &[
    ("hash", r"#(\d+)"),
    ("issue", r"(?i)issue\s*#(\d+)"),
    ("fixes", r"(?i)fix(?:es|ed)?\s*#(\d+)"),
    ("closes", r"(?i)close[sd]?\s*#(\d+)"),
    ("resolves", r"(?i)resolve[sd]?\s*#(\d+)"),
    ("addresses", r"(?i)address(?:es|ed)?\s*#(\d+)"),
    ("related-to", r"(?i)related\s+to\s*#(\d+)"),
    ("see", r"(?i)see\s*#(\d+)"),
    ("trailing-number", r"(\d+)\s*$"),
];

#[allow(clippy::unwrap_used)] // Compile-time constant regex patterns
static DEFAULT_PATTERNS: LazyLock<Vec<ReferencePattern>> = LazyLock::new(|| {
    DEFAULT_PATTERN_SOURCES
        .iter()
        .map(|&(name, source)| ReferencePattern {
            name,
            regex: Regex::new(source).unwrap(),
        })
        .collect()
});

/// Ordered list of independent reference patterns.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    patterns: Vec<ReferencePattern>,
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.clone())
    }
}

impl ReferenceExtractor {
    /// Creates an extractor over the given patterns.
    pub fn new(patterns: Vec<ReferencePattern>) -> Self {
        Self { patterns }
    }

    /// Returns the patterns in evaluation order.
    pub fn patterns(&self) -> &[ReferencePattern] {
        &self.patterns
    }

    /// Returns true if any pattern matches the subject.
    pub fn has_reference(&self, subject: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(subject))
    }

    /// Collects the distinct issue numbers referenced by the subject.
    pub fn extract(&self, subject: &str) -> BTreeSet<u64> {
        self.patterns
            .iter()
            .flat_map(|p| p.numbers(subject))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn pattern(name: &str) -> ReferencePattern {
        ReferenceExtractor::default()
            .patterns()
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn each_pattern_matches_its_shape() {
        assert!(pattern("hash").is_match("add form #3"));
        assert!(pattern("issue").is_match("Issue #3 done"));
        assert!(pattern("fixes").is_match("Fixes #3"));
        assert!(pattern("fixes").is_match("fix #3"));
        assert!(pattern("closes").is_match("closed #3"));
        assert!(pattern("resolves").is_match("RESOLVES #3"));
        assert!(pattern("addresses").is_match("addresses #3"));
        assert!(pattern("related-to").is_match("related to #3"));
        assert!(pattern("see").is_match("see #3"));
        assert!(pattern("trailing-number").is_match("finish task 7"));
    }

    #[test]
    fn keyword_patterns_need_a_hash() {
        assert!(!pattern("fixes").is_match("fixes the login bug"));
        assert!(!pattern("related-to").is_match("related to login"));
    }

    #[test]
    fn trailing_number_ignores_inner_numbers() {
        assert!(!pattern("trailing-number").is_match("upgrade to v2 of the api"));
        assert_eq!(
            pattern("trailing-number").numbers("step 12  ").collect::<Vec<_>>(),
            vec![12]
        );
    }

    #[test]
    fn extraction_deduplicates() {
        let extractor = ReferenceExtractor::default();
        let numbers = extractor.extract("Fixes #4, see #4 and closes #9");
        assert_eq!(numbers.into_iter().collect::<Vec<_>>(), vec![4, 9]);
    }

    #[test]
    fn no_reference() {
        let extractor = ReferenceExtractor::default();
        assert!(!extractor.has_reference("Initial commit"));
        assert!(extractor.extract("Initial commit").is_empty());
    }

    #[test]
    fn substituted_patterns() {
        let extractor = ReferenceExtractor::new(vec![ReferencePattern {
            name: "jira",
            regex: Regex::new(r"PROJ-(\d+)").unwrap(),
        }]);
        assert!(extractor.has_reference("PROJ-17 add cart"));
        assert!(!extractor.has_reference("Fixes #4 tidy"));
        assert_eq!(extractor.extract("PROJ-17").into_iter().collect::<Vec<_>>(), vec![17]);
    }
}
