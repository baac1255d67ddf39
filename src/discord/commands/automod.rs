// AutoMod slash commands - author, test and sync keyword rules.
//
// Same shape as the other command files:
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result

use crate::core::automod::matches;
use crate::discord::automod::formatter::{keyword_test_embed, rule_list_embed, test_result_embed};
use crate::discord::automod::platform_rules::fetch_keyword_rules;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const EXPORT_FILE_NAME: &str = "automod-rules.json";

/// Split a comma separated option into trimmed, non-empty entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// AutoMod rule testing commands.
///
/// Test messages against your keyword rules before they go live.
#[poise::command(
    slash_command,
    subcommands("test", "rules", "add", "remove", "toggle", "sync", "export", "import", "preview"),
    required_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn automod(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Check whether a message would be flagged by this server's rules.
///
/// With `keyword`, only that keyword is tried, so it can be checked before
/// it goes into a rule.
#[poise::command(slash_command, guild_only)]
pub async fn test(
    ctx: Context<'_>,
    #[description = "Message text to test"] text: String,
    #[description = "Try a single keyword instead of the saved rules"] keyword: Option<String>,
    #[description = "Comma separated allow list for the keyword"] allow_list: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    if let Some(keyword) = keyword {
        let allow_list = allow_list.as_deref().map(split_list).unwrap_or_default();
        let flagged = matches(&text, keyword.trim(), &allow_list);

        ctx.send(
            poise::CreateReply::default()
                .embed(keyword_test_embed(&text, keyword.trim(), flagged))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let hit = ctx.data().automod.check_message(guild_id.get(), &text).await?;

    ctx.send(
        poise::CreateReply::default()
            .embed(test_result_embed(&text, hit.as_ref()))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// List this server's rules in evaluation order.
#[poise::command(slash_command, guild_only)]
pub async fn rules(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    let automod = &ctx.data().automod;
    let rules = automod.list_rules(guild_id).await?;
    let settings = automod.get_settings(guild_id).await?;

    ctx.send(poise::CreateReply::default().embed(rule_list_embed(&rules, &settings)))
        .await?;
    Ok(())
}

/// Add a local draft rule.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Rule name"] name: String,
    #[description = "Comma separated keywords, e.g. bad, spam*, *scam*"] keywords: String,
    #[description = "Comma separated words that are always allowed"] allow_list: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let rule = ctx
        .data()
        .automod
        .add_rule(
            guild_id.get(),
            &name,
            split_list(&keywords),
            allow_list.as_deref().map(split_list).unwrap_or_default(),
        )
        .await?;

    ctx.say(format!(
        "✅ Added rule **{}** with {} keyword{}.",
        rule.name,
        rule.keyword_filter.len(),
        if rule.keyword_filter.len() == 1 { "" } else { "s" }
    ))
    .await?;
    Ok(())
}

/// Remove a rule by name.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Rule name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let removed = ctx.data().automod.remove_rule(guild_id.get(), &name).await?;

    let note = if removed.is_platform_rule() {
        " It still exists on Discord and comes back on the next `/automod sync`."
    } else {
        ""
    };
    ctx.say(format!("🗑️ Removed rule **{}**.{}", removed.name, note))
        .await?;
    Ok(())
}

/// Enable or disable a rule for local testing.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "Rule name"] name: String,
    #[description = "Whether the rule takes part in tests"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    ctx.data()
        .automod
        .set_rule_enabled(guild_id.get(), &name, enabled)
        .await?;

    ctx.say(format!(
        "{} Rule **{}** is now **{}**.",
        if enabled { "✅" } else { "❌" },
        name.trim(),
        if enabled { "enabled" } else { "disabled" }
    ))
    .await?;
    Ok(())
}

/// Pull this server's keyword rules from Discord AutoMod.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn sync(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    ctx.defer().await?;

    let platform_rules = fetch_keyword_rules(ctx.http(), guild_id).await?;
    let synced = ctx
        .data()
        .automod
        .sync_platform_rules(guild_id.get(), platform_rules)
        .await?;

    ctx.say(format!(
        "🔄 Synced {} keyword rule{} from Discord. Local drafts were kept.",
        synced,
        if synced == 1 { "" } else { "s" }
    ))
    .await?;
    Ok(())
}

/// Download this server's rules as JSON.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn export(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let json = ctx.data().automod.export_rules(guild_id.get()).await?;

    ctx.send(
        poise::CreateReply::default()
            .content("📦 Here are this server's AutoMod rules.")
            .attachment(serenity::CreateAttachment::bytes(
                json.into_bytes(),
                EXPORT_FILE_NAME,
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Replace this server's rules with a JSON export.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn import(
    ctx: Context<'_>,
    #[description = "A file created by /automod export"] file: serenity::Attachment,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    ctx.defer_ephemeral().await?;

    let bytes = file.download().await?;
    let json = String::from_utf8(bytes).map_err(|_| "The file is not valid UTF-8 text")?;

    let count = ctx.data().automod.import_rules(guild_id.get(), &json).await?;

    ctx.say(format!(
        "📥 Imported {} rule{}. The previous rule set was replaced.",
        count,
        if count == 1 { "" } else { "s" }
    ))
    .await?;
    Ok(())
}

/// Preview live messages against this server's rules.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn preview(
    ctx: Context<'_>,
    #[description = "Post a preview when a message would be flagged"] enabled: bool,
    #[description = "Where previews go (defaults to replying in place)"] channel: Option<
        serenity::Channel,
    >,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let settings = ctx
        .data()
        .automod
        .set_preview(guild_id.get(), enabled, channel.map(|c| c.id().get()))
        .await?;

    let message = match (settings.preview_enabled, settings.log_channel_id) {
        (false, _) => "❌ Live preview is **disabled**.".to_string(),
        (true, Some(channel_id)) => format!(
            "✅ Live preview is **enabled**. Results go to <#{}>.",
            channel_id
        ),
        (true, None) => "✅ Live preview is **enabled**. Results are posted as replies."
            .to_string(),
    };

    ctx.say(message).await?;
    Ok(())
}
