// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic subscription filter.
//!
//! Topics are `/`-separated levels. Filters use the usual bus wildcards:
//! - `+` matches exactly one level
//! - `#` matches the remaining levels (zero or more) and must come last
//! - anything else matches the level literally

/// Set of subscribed topic filters; a topic passes if any filter matches.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    patterns: Vec<String>,
}

impl TopicFilter {
    /// Build a filter from subscription patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter accepting every topic.
    pub fn all() -> Self {
        Self::new(["#"])
    }

    /// Check if a topic matches any subscribed pattern.
    pub fn matches(&self, topic: &str) -> bool {
        self.patterns.iter().any(|p| Self::pattern_match(p, topic))
    }

    fn pattern_match(pattern: &str, topic: &str) -> bool {
        let mut levels = topic.split('/');

        for filter_level in pattern.split('/') {
            match filter_level {
                "#" => return true,
                "+" => {
                    if levels.next().is_none() {
                        return false;
                    }
                }
                literal => {
                    if levels.next() != Some(literal) {
                        return false;
                    }
                }
            }
        }

        levels.next().is_none()
    }

    /// Get the patterns in this filter.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let filter = TopicFilter::new(["iot/testing"]);
        assert!(filter.matches("iot/testing"));
        assert!(!filter.matches("iot/testing/extra"));
        assert!(!filter.matches("iot"));
        assert!(!filter.matches("iot/other"));
    }

    #[test]
    fn test_single_level_wildcard() {
        let filter = TopicFilter::new(["plant/+/temp"]);
        assert!(filter.matches("plant/line1/temp"));
        assert!(filter.matches("plant//temp"));
        assert!(!filter.matches("plant/line1/cell2/temp"));
        assert!(!filter.matches("plant/temp"));
    }

    #[test]
    fn test_multi_level_wildcard() {
        let filter = TopicFilter::new(["plant/#"]);
        assert!(filter.matches("plant"));
        assert!(filter.matches("plant/a"));
        assert!(filter.matches("plant/a/b/c"));
        assert!(!filter.matches("other/a"));

        assert!(TopicFilter::all().matches("anything/at/all"));
    }

    #[test]
    fn test_any_of_several() {
        let filter = TopicFilter::new(["a/b", "c/+"]);
        assert!(filter.matches("a/b"));
        assert!(filter.matches("c/d"));
        assert!(!filter.matches("c/d/e"));
        assert_eq!(filter.patterns().len(), 2);
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = TopicFilter::default();
        assert!(!filter.matches("iot/testing"));
    }
}
