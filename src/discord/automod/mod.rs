// Discord adapters for the automod core.

pub mod formatter;
pub mod message_hook;
pub mod platform_rules;
