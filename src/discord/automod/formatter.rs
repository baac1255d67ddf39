use crate::core::automod::{AutomodHit, GuildAutomodSettings, Rule};
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter};

// Discord caps embeds at 25 fields and 1024 chars per field value.
const MAX_RULE_FIELDS: usize = 25;
const MAX_FIELD_LEN: usize = 1000;

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

fn code_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let list = items
        .into_iter()
        .map(|item| format!("`{}`", item))
        .collect::<Vec<_>>()
        .join(", ");
    if list.is_empty() {
        "None".to_string()
    } else {
        truncate(&list, MAX_FIELD_LEN)
    }
}

/// Result of `/automod test`.
pub fn test_result_embed(text: &str, hit: Option<&AutomodHit>) -> CreateEmbed {
    let embed = CreateEmbed::default()
        .title("🧪 AutoMod Test")
        .field("Message", truncate(text, MAX_FIELD_LEN), false);

    match hit {
        Some(hit) => embed
            .color(serenity::Color::RED)
            .description("This message **would be flagged**.")
            .field("Rule", &hit.rule_name, true)
            .field("Keyword", format!("`{}`", hit.keyword), true)
            .field("Matched", format!("`{}`", truncate(&hit.matched, 200)), true),
        None => embed
            .color(serenity::Color::DARK_GREEN)
            .description("No rule matched this message."),
    }
}

/// Result of `/automod test` with a single keyword.
pub fn keyword_test_embed(text: &str, keyword: &str, flagged: bool) -> CreateEmbed {
    let embed = CreateEmbed::default()
        .title("🧪 AutoMod Keyword Test")
        .field("Message", truncate(text, MAX_FIELD_LEN), false)
        .field("Keyword", format!("`{}`", truncate(keyword, 200)), true);

    if flagged {
        embed
            .color(serenity::Color::RED)
            .description("This keyword **would flag** the message.")
    } else {
        embed
            .color(serenity::Color::DARK_GREEN)
            .description("This keyword does not match the message.")
    }
}

/// Posted when a live message would have been flagged.
pub fn preview_embed(hit: &AutomodHit, msg: &serenity::Message) -> CreateEmbed {
    CreateEmbed::default()
        .title("🛡️ AutoMod Preview")
        .description(format!(
            "A message from <@{}> in <#{}> would be flagged. [Jump]({})",
            msg.author.id,
            msg.channel_id,
            msg.link()
        ))
        .color(serenity::Color::ORANGE)
        .field("Rule", &hit.rule_name, true)
        .field("Keyword", format!("`{}`", hit.keyword), true)
        .field("Matched", format!("`{}`", truncate(&hit.matched, 200)), true)
        .field("Content", truncate(&msg.content, MAX_FIELD_LEN), false)
        .footer(CreateEmbedFooter::new("Preview only - no action was taken"))
        .timestamp(serenity::Timestamp::now())
}

/// Listing for `/automod rules`.
pub fn rule_list_embed(rules: &[Rule], settings: &GuildAutomodSettings) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 AutoMod Rules")
        .color(serenity::Color::BLURPLE);

    if rules.is_empty() {
        embed = embed.description("No rules yet. Use `/automod add` or `/automod sync`.");
    }

    for rule in rules.iter().take(MAX_RULE_FIELDS) {
        let status = if rule.enabled { "✅" } else { "❌" };
        let origin = if rule.is_platform_rule() { "synced" } else { "draft" };

        let mut value = format!(
            "Keywords: {}",
            code_list(rule.keyword_filter.iter().map(|k| k.source()))
        );
        if !rule.allow_list.is_empty() {
            value.push_str(&format!(
                "\nAllowed: {}",
                code_list(rule.allow_list.iter().map(String::as_str))
            ));
        }

        embed = embed.field(
            format!("{} {} ({})", status, rule.name, origin),
            truncate(&value, MAX_FIELD_LEN),
            false,
        );
    }

    let mut footer = match settings.last_synced {
        Some(at) => format!("Last synced {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => "Never synced".to_string(),
    };
    if rules.len() > MAX_RULE_FIELDS {
        footer.push_str(&format!(" • showing {} of {}", MAX_RULE_FIELDS, rules.len()));
    }

    embed.footer(CreateEmbedFooter::new(footer))
}
