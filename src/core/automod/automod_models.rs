// AutoMod domain models - keyword patterns, rules, and match results.
//
// These are pure domain types with no Discord dependencies.
// The JSON shape of `Rule` mirrors the platform's keyword rule schema
// so rules pulled from Discord can be exported and re-imported as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wildcard marker used on either end of a keyword.
pub const WILDCARD: char = '*';

/// Where a keyword has to line up with the token it is found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// `word` - must be an entire token
    WholeToken,
    /// `word*` - must start a token
    Prefix,
    /// `*word` - must end a token
    Suffix,
    /// `*word*` - anywhere inside a token
    Substring,
}

impl MatchMode {
    fn from_markers(leading: bool, trailing: bool) -> Self {
        match (leading, trailing) {
            (false, false) => MatchMode::WholeToken,
            (false, true) => MatchMode::Prefix,
            (true, false) => MatchMode::Suffix,
            (true, true) => MatchMode::Substring,
        }
    }

    /// The literal must begin exactly at a token start.
    pub fn anchored_start(self) -> bool {
        matches!(self, MatchMode::WholeToken | MatchMode::Prefix)
    }

    /// The literal must end exactly at a token end.
    pub fn anchored_end(self) -> bool {
        matches!(self, MatchMode::WholeToken | MatchMode::Suffix)
    }
}

/// A keyword as authored by a moderator, e.g. `spam`, `spam*`, `*spam*`.
///
/// The mode and stripped literal are derived once at construction.
/// Serializes back to the source string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Pattern {
    source: String,
    literal: String,
    mode: MatchMode,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let leading = source.starts_with(WILDCARD);
        let without_leading = source.strip_prefix(WILDCARD).unwrap_or(source.as_str());
        let trailing = without_leading.ends_with(WILDCARD);
        let literal = without_leading
            .strip_suffix(WILDCARD)
            .unwrap_or(without_leading)
            .to_string();

        // A lone "*" counts as both markers.
        let trailing = trailing || (leading && source.len() == WILDCARD.len_utf8());

        Self {
            mode: MatchMode::from_markers(leading, trailing),
            literal,
            source,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.literal
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// True when nothing is left to search for once the markers are gone.
    pub fn is_empty(&self) -> bool {
        self.literal.is_empty()
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::new(source)
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Pattern::new(source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// A keyword moderation rule.
///
/// Only `enabled`, `keyword_filter`, and `allow_list` take part in matching.
/// The remaining fields are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Platform rule id. `None` for drafts authored locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub keyword_filter: Vec<Pattern>,
    #[serde(default)]
    pub allow_list: Vec<String>,
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
    #[serde(default)]
    pub exempt_roles: Vec<String>,
    #[serde(default)]
    pub exempt_channels: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Create an enabled local draft with no metadata.
    pub fn draft(
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<Pattern>>,
        allow_list: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            enabled: true,
            keyword_filter: keywords.into_iter().map(Into::into).collect(),
            allow_list: allow_list.into_iter().map(Into::into).collect(),
            actions: Vec::new(),
            exempt_roles: Vec::new(),
            exempt_channels: Vec::new(),
        }
    }

    /// Whether this rule came from the platform rather than a local draft.
    pub fn is_platform_rule(&self) -> bool {
        self.id.is_some()
    }
}

/// The first rule that matched a piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch<'a> {
    pub rule: &'a Rule,
    pub keyword: &'a Pattern,
    /// The token span of the input text that triggered the match
    pub matched: &'a str,
}

/// `None` means no enabled rule matched.
pub type MatchResult<'a> = Option<RuleMatch<'a>>;

/// Owned copy of a `RuleMatch`, safe to hold across awaits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomodHit {
    pub rule_name: String,
    pub keyword: String,
    pub matched: String,
}

impl From<RuleMatch<'_>> for AutomodHit {
    fn from(m: RuleMatch<'_>) -> Self {
        Self {
            rule_name: m.rule.name.clone(),
            keyword: m.keyword.source().to_string(),
            matched: m.matched.to_string(),
        }
    }
}

/// Per-guild settings for the live preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildAutomodSettings {
    pub guild_id: u64,
    /// Post a preview whenever a live message would be flagged
    pub preview_enabled: bool,
    /// Where previews go; `None` replies in the message's channel
    pub log_channel_id: Option<u64>,
    /// Last time platform rules were pulled in
    pub last_synced: Option<DateTime<Utc>>,
}

impl GuildAutomodSettings {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            preview_enabled: false,
            log_channel_id: None,
            last_synced: None,
        }
    }
}
