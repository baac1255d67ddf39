// Discord layer - commands and event handlers.

#[path = "automod/mod.rs"]
pub mod automod;

#[path = "commands/command_catalog.rs"]
pub mod commands;

use crate::core::automod::AutomodService;
use crate::infra::automod::SqliteRuleStore;
use std::sync::Arc;

/// Shared state handed to every command and event.
pub struct Data {
    pub automod: Arc<AutomodService<SqliteRuleStore>>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
