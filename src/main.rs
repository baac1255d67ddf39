// This is the entry point of the AutoMod preview bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): keyword matcher, rule evaluator, rule sets
// - `infra/` = Implementations of core traits (SQLite rule store)
// - `discord/` = Discord-specific adapters (commands, message hook, platform rules)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::automod::AutomodService;
use crate::discord::automod::message_hook::handle_message_for_automod;
use crate::discord::automod::platform_rules::fetch_keyword_rules;
use crate::discord::commands::presence;
use crate::discord::{Data, Error};
use crate::infra::automod::SqliteRuleStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

const DEFAULT_DATA_DIR: &str = "data";

/// Re-pull a guild's platform rules after Discord tells us they changed.
async fn resync_guild(ctx: &serenity::Context, data: &Data, guild_id: serenity::GuildId) {
    let rules = match fetch_keyword_rules(&ctx.http, guild_id).await {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!("AutoMod resync failed for guild {}: {:#}", guild_id, e);
            return;
        }
    };

    match data.automod.sync_platform_rules(guild_id.get(), rules).await {
        Ok(count) => tracing::info!(
            guild_id = guild_id.get(),
            rules = count,
            "Resynced AutoMod keyword rules"
        ),
        Err(e) => tracing::error!("Failed to store resynced rules for {}: {}", guild_id, e),
    }
}

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = handle_message_for_automod(ctx, new_message, &*data.automod).await {
                tracing::error!("Error running AutoMod preview: {}", e);
            }
        }
        serenity::FullEvent::AutoModRuleCreate { rule }
        | serenity::FullEvent::AutoModRuleUpdate { rule }
        | serenity::FullEvent::AutoModRuleDelete { rule } => {
            resync_guild(ctx, data, rule.guild_id).await;
        }

        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir =
        std::env::var("AUTOMOD_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory for SQLite files");
    let automod_db_path = format!("{}/automod.db", data_dir);

    // Optional guild for instant command registration during development
    let dev_guild_id = std::env::var("AUTOMOD_DEV_GUILD_ID")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", automod_db_path))
        .await
        .expect("Failed to connect to AutoMod DB");
    let rule_store = SqliteRuleStore::new(pool);
    rule_store
        .migrate()
        .await
        .expect("Failed to migrate AutoMod DB");
    let automod_service = Arc::new(AutomodService::new(rule_store));

    // Create the data structure that will be shared across all commands
    let data = Data {
        automod: Arc::clone(&automod_service),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::AUTO_MODERATION_CONFIGURATION;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![discord::commands::automod::automod()],
            // Event handler for messages and AutoMod rule changes
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            tracing::warn!(
                                command = %ctx.command().qualified_name,
                                "Command failed: {}",
                                error
                            );
                            let _ = ctx.say(format!("⚠️ {}", error)).await;
                        }
                        other => {
                            if let Err(e) = poise::builtins::on_error(other).await {
                                tracing::error!("Error while handling error: {}", e);
                            }
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("🤖 Bot is starting up...");

                match dev_guild_id {
                    // Guild registration shows up immediately; global can take up to an hour
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            guild_id,
                        )
                        .await?
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?
                    }
                }

                tracing::info!("✅ Commands registered!");
                presence::on_ready(ctx);
                tracing::info!("🚀 Bot is ready!");

                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
