// Converts the platform's AutoMod rules into core rules.
//
// Only keyword-triggered rules are relevant to the matcher. Spam, preset
// and mention-spam triggers are skipped.

use crate::core::automod::{Pattern, Rule};
use anyhow::{Context as _, Result};
use poise::serenity_prelude as serenity;
use ::serenity::model::guild::automod::{Rule as PlatformRule, Trigger};

/// Map one platform rule to a core rule, or `None` if it isn't a keyword rule.
pub fn to_core_rule(rule: &PlatformRule) -> Result<Option<Rule>> {
    let (strings, allow_list) = match &rule.trigger {
        Trigger::Keyword {
            strings,
            allow_list,
            ..
        } => (strings, allow_list),
        _ => return Ok(None),
    };

    let actions = rule
        .actions
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to encode actions of rule `{}`", rule.name))?;

    Ok(Some(Rule {
        id: Some(rule.id.to_string()),
        name: rule.name.clone(),
        enabled: rule.enabled,
        keyword_filter: strings.iter().map(|s| Pattern::new(s.as_str())).collect(),
        allow_list: allow_list.clone(),
        actions,
        exempt_roles: rule.exempt_roles.iter().map(|id| id.to_string()).collect(),
        exempt_channels: rule.exempt_channels.iter().map(|id| id.to_string()).collect(),
    }))
}

/// Fetch a guild's keyword rules from the platform, in platform order.
pub async fn fetch_keyword_rules(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
) -> Result<Vec<Rule>> {
    let platform_rules = http
        .get_automod_rules(guild_id)
        .await
        .with_context(|| format!("Failed to fetch AutoMod rules for guild {}", guild_id))?;

    let mut rules = Vec::new();
    for platform_rule in &platform_rules {
        match to_core_rule(platform_rule)? {
            Some(rule) => rules.push(rule),
            None => tracing::debug!(
                guild_id = guild_id.get(),
                rule = %platform_rule.name,
                "Skipping non-keyword AutoMod rule"
            ),
        }
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn platform_rule(trigger_type: u8, trigger_metadata: serde_json::Value) -> PlatformRule {
        serde_json::from_value(json!({
            "id": "969707018069872670",
            "guild_id": "613425648685547541",
            "name": "Keyword Filter 1",
            "creator_id": "423457898095789043",
            "event_type": 1,
            "trigger_type": trigger_type,
            "trigger_metadata": trigger_metadata,
            "actions": [
                {"type": 1, "metadata": {"custom_message": "Please keep it civil"}}
            ],
            "enabled": true,
            "exempt_roles": ["323456789123456789", "423456789123456789"],
            "exempt_channels": ["523456789123456789"]
        }))
        .unwrap()
    }

    #[test]
    fn test_keyword_rule_is_converted() {
        let rule = platform_rule(
            1,
            json!({
                "keyword_filter": ["cat*", "*dog", "*ana*", "i like c++"],
                "regex_patterns": [],
                "allow_list": ["catalog"]
            }),
        );

        let core = to_core_rule(&rule).unwrap().unwrap();

        assert_eq!(core.id.as_deref(), Some("969707018069872670"));
        assert!(core.is_platform_rule());
        assert_eq!(core.name, "Keyword Filter 1");
        assert!(core.enabled);
        let keywords: Vec<&str> = core.keyword_filter.iter().map(Pattern::source).collect();
        assert_eq!(keywords, vec!["cat*", "*dog", "*ana*", "i like c++"]);
        assert_eq!(core.allow_list, vec!["catalog".to_string()]);
        assert_eq!(core.actions.len(), 1);
        assert_eq!(core.actions[0]["type"], 1);
        assert_eq!(core.actions[0]["metadata"]["custom_message"], "Please keep it civil");
        assert_eq!(
            core.exempt_roles,
            vec!["323456789123456789".to_string(), "423456789123456789".to_string()]
        );
        assert_eq!(core.exempt_channels, vec!["523456789123456789".to_string()]);
    }

    #[test]
    fn test_converted_rule_matches_like_the_platform() {
        let rule = platform_rule(
            1,
            json!({"keyword_filter": ["cat*"], "regex_patterns": [], "allow_list": ["catalog"]}),
        );
        let core = to_core_rule(&rule).unwrap().unwrap();
        let rules = [core];

        assert!(crate::core::automod::evaluate("my cats", &rules).is_some());
        assert!(crate::core::automod::evaluate("the catalog", &rules).is_none());
    }

    #[test]
    fn test_spam_rule_is_skipped() {
        let rule = platform_rule(3, json!({}));

        assert!(to_core_rule(&rule).unwrap().is_none());
    }
}
