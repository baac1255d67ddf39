// Keyword matching against free-form message text.
//
// Tokens are runs of non-space characters. Only the ASCII space counts as
// a boundary, which is how the platform filter behaves; tabs, newlines and
// punctuation are ordinary token characters here.
//
// Pure functions only: no I/O, no logging, no shared state.

use super::automod_models::{MatchMode, Pattern};

const BOUNDARY: char = ' ';

/// Check whether `pattern` occurs in `text` at a valid token boundary,
/// ignoring hits whose whole token is on the allow list.
pub fn matches(text: &str, pattern: &str, allow_list: &[String]) -> bool {
    find_match(text, &Pattern::new(pattern), allow_list).is_some()
}

/// Like [`matches`], but returns the span of `text` that triggered the hit.
///
/// The span is the entire token around the occurrence, or the whole text
/// when the text equals the keyword exactly.
pub fn find_match<'t>(
    text: &'t str,
    pattern: &Pattern,
    allow_list: &[String],
) -> Option<&'t str> {
    scan(text, pattern.text(), pattern.mode(), allow_list)
}

fn scan<'t>(
    text: &'t str,
    literal: &str,
    mode: MatchMode,
    allow_list: &[String],
) -> Option<&'t str> {
    if literal.is_empty() {
        return None;
    }

    if text == literal {
        return Some(text);
    }

    if text.len() < literal.len() {
        return None;
    }

    // Occurrences inside an allow-listed token can be skipped wholesale.
    let mut resume_at = 0;

    for (start, _) in text.char_indices() {
        if start < resume_at || !text[start..].starts_with(literal) {
            continue;
        }
        let end = start + literal.len();

        if mode.anchored_start() && !is_token_start(text, start) {
            continue;
        }
        if mode.anchored_end() && !is_token_end(text, end) {
            continue;
        }

        let token_start = text[..start].rfind(BOUNDARY).map_or(0, |i| i + 1);
        let token_end = text[end..].find(BOUNDARY).map_or(text.len(), |i| end + i);

        let token = &text[token_start..token_end];
        if is_allowed(token, allow_list) {
            resume_at = token_end;
            continue;
        }

        return Some(token);
    }

    None
}

fn is_token_start(text: &str, at: usize) -> bool {
    at == 0 || text[..at].ends_with(BOUNDARY)
}

fn is_token_end(text: &str, at: usize) -> bool {
    at == text.len() || text[at..].starts_with(BOUNDARY)
}

/// Allow-list entries are whole-token literals; a `*` in an entry is just a character.
fn is_allowed(token: &str, allow_list: &[String]) -> bool {
    allow_list
        .iter()
        .any(|entry| scan(token, entry, MatchMode::WholeToken, &[]).is_some())
}

// ============================================================================
// TESTS
// ============================================================================
