// Discord-specific automod preview - runs live messages through the guild's
// rules and reports what would have been flagged. Never deletes anything.

use super::formatter::preview_embed;
use crate::core::automod::{AutomodService, RuleStore};
use crate::discord::Error;
use poise::serenity_prelude as serenity;

/// Check a message against the guild's rules and post a preview on a hit.
///
/// Returns `true` if a preview was posted.
pub async fn handle_message_for_automod<S: RuleStore>(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    automod: &AutomodService<S>,
) -> Result<bool, Error> {
    // Skip bots (including our own previews)
    if msg.author.bot {
        return Ok(false);
    }

    // Only check guild messages
    let guild_id = match msg.guild_id {
        Some(id) => id.get(),
        None => return Ok(false),
    };

    let settings = automod.get_settings(guild_id).await?;
    if !settings.preview_enabled {
        return Ok(false);
    }

    let Some(hit) = automod.check_message(guild_id, &msg.content).await? else {
        return Ok(false);
    };

    tracing::info!(
        guild_id,
        message_id = msg.id.get(),
        rule = %hit.rule_name,
        keyword = %hit.keyword,
        "AutoMod preview hit"
    );

    let target = settings
        .log_channel_id
        .map(serenity::ChannelId::new)
        .unwrap_or(msg.channel_id);

    let mut message = serenity::CreateMessage::new().embed(preview_embed(&hit, msg));
    if target == msg.channel_id {
        message = message.reference_message(msg);
    }

    if let Err(e) = target.send_message(&ctx.http, message).await {
        tracing::warn!("Failed to send AutoMod preview: {}", e);
        return Ok(false);
    }

    Ok(true)
}
