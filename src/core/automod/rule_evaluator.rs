// Rule evaluation - walks rules in order and stops at the first keyword hit.

use super::automod_models::{MatchResult, Pattern, Rule, RuleMatch};
use super::token_matcher;

/// Seam between the evaluator and the keyword matcher.
pub trait KeywordMatcher {
    /// Return the span of `text` that `pattern` matched, if any.
    fn find<'t>(
        &self,
        text: &'t str,
        pattern: &Pattern,
        allow_list: &[String],
    ) -> Option<&'t str>;
}

/// The token-boundary matcher used for real rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMatcher;

impl KeywordMatcher for TokenMatcher {
    fn find<'t>(
        &self,
        text: &'t str,
        pattern: &Pattern,
        allow_list: &[String],
    ) -> Option<&'t str> {
        token_matcher::find_match(text, pattern, allow_list)
    }
}

/// Find the first enabled rule with a keyword matching `text`.
pub fn evaluate<'a>(text: &'a str, rules: &'a [Rule]) -> MatchResult<'a> {
    evaluate_with(&TokenMatcher, text, rules)
}

/// [`evaluate`] with a caller-supplied matcher.
///
/// Rules are tried in order, keywords within a rule in order. Disabled rules
/// and rules without keywords are skipped without touching the matcher.
pub fn evaluate_with<'a, M: KeywordMatcher + ?Sized>(
    matcher: &M,
    text: &'a str,
    rules: &'a [Rule],
) -> MatchResult<'a> {
    rules
        .iter()
        .filter(|rule| rule.enabled && !rule.keyword_filter.is_empty())
        .find_map(|rule| {
            rule.keyword_filter.iter().find_map(|keyword| {
                matcher
                    .find(text, keyword, &rule.allow_list)
                    .map(|matched| RuleMatch {
                        rule,
                        keyword,
                        matched,
                    })
            })
        })
}

// ============================================================================
// TESTS
// ============================================================================
