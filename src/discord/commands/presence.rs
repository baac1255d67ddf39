// This module handles bot presence and lifecycle events.
//
// Discord-layer glue only: it works with Discord SDK types (Context,
// ActivityData, OnlineStatus) and keeps the logic short.

use poise::serenity_prelude as serenity;

/// Resets the bot's status to the default message.
pub fn reset_status(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::watching("for /automod test");
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready so the default presence is set in one place.
pub fn on_ready(ctx: &serenity::Context) {
    reset_status(ctx);
}
