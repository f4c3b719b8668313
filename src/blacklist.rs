//! Path-blacklist (C5): regex match against a configurable deny-list, plus the two
//! fixed gates (`OneDrive` substring, temp-directory regex) that the Scanner applies
//! alongside it at the top of `Enumerate`.

use regex::Regex;

/// Part of the canonical contract per the resolved open question (temp-directory
/// regex is not an optional extra revision detail).
const TEMP_DIR_PATTERN: &str = r"(?i)[/\\](temp|tmp|\.tmp)[/\\]";

pub struct Blacklist {
    patterns: Vec<Regex>,
    temp_dir: Regex,
}

impl Blacklist {
    /// Compile `patterns`; an invalid pattern is logged once and treated as a
    /// non-match rather than aborting construction (error kind 6).
    pub fn new(patterns: &[String]) -> Self {
        let compiled = patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("invalid blacklist pattern {p:?}: {e}");
                    None
                }
            })
            .collect();
        Self {
            patterns: compiled,
            temp_dir: Regex::new(TEMP_DIR_PATTERN).unwrap(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }

    pub fn matches_temp_dir(&self, path: &str) -> bool {
        self.temp_dir.is_match(path)
    }

    /// Combined gate used by `Enumerate` step 1: OneDrive substring, temp-dir regex,
    /// or an explicit blacklist pattern.
    pub fn should_skip(&self, path: &str) -> bool {
        path.contains("OneDrive") || self.matches_temp_dir(path) || self.matches(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onedrive_substring_is_skipped() {
        let bl = Blacklist::new(&[]);
        assert!(bl.should_skip("/home/alice/OneDrive/Documents"));
    }

    #[test]
    fn temp_dir_is_skipped() {
        let bl = Blacklist::new(&[]);
        assert!(bl.should_skip("/var/tmp/build"));
        assert!(bl.should_skip("/home/alice/Temp/scratch"));
    }

    #[test]
    fn ordinary_path_is_not_skipped() {
        let bl = Blacklist::new(&crate::config::default_blacklist_patterns());
        assert!(!bl.should_skip("/home/alice/projects/fdex"));
    }

    #[test]
    fn invalid_pattern_is_ignored_not_fatal() {
        let bl = Blacklist::new(&["(unclosed".to_string()]);
        assert!(!bl.matches("anything"));
    }
}
