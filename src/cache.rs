//! Parse-once storage for rule text.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use crate::{ast::Rule, parser::ParseError};

/// Parsed rules keyed by their text.
///
/// Failures are remembered too: a malformed rule reports the same error on
/// every use and is never parsed twice.
#[derive(Default)]
pub struct RuleCache {
    rules: Mutex<HashMap<String, Result<Arc<Rule>, ParseError>>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_parse(&self, text: &str) -> Result<Arc<Rule>, ParseError> {
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        rules
            .entry(text.to_string())
            .or_insert_with(|| Rule::parse(text).map(Arc::new))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rules.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A rule declared in a `static`, parsed on first use.
///
/// ```
/// use validif_lang::cache::LazyRule;
///
/// static RANGE: LazyRule = LazyRule::new("['lte','RangeMax']");
///
/// assert_eq!(RANGE.get().unwrap().call_count(), 1);
/// ```
pub struct LazyRule {
    text: &'static str,
    cell: OnceLock<Result<Arc<Rule>, ParseError>>,
}

impl LazyRule {
    pub const fn new(text: &'static str) -> Self {
        LazyRule {
            text,
            cell: OnceLock::new(),
        }
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    pub fn get(&self) -> Result<Arc<Rule>, ParseError> {
        self.cell
            .get_or_init(|| Rule::parse(self.text).map(Arc::new))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_once_and_shares() {
        let cache = RuleCache::new();
        let first = cache.get_or_parse("['present','One']").unwrap();
        let second = cache.get_or_parse("['present','One']").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_remembered() {
        let cache = RuleCache::new();
        let first = cache.get_or_parse("['frobnicate']").unwrap_err();
        let second = cache.get_or_parse("['frobnicate']").unwrap_err();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lazy_rule_reports_parse_errors() {
        static BROKEN: LazyRule = LazyRule::new("['eq'");
        assert!(BROKEN.get().is_err());
        assert_eq!(BROKEN.text(), "['eq'");
    }
}
