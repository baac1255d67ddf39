// Core automod module - keyword matching and rule-set management.
// Following the same pattern as the moderation module.

pub mod automod_models;
pub mod automod_service;
pub mod rule_evaluator;
pub mod token_matcher;

pub use automod_models::*;
pub use automod_service::*;
pub use rule_evaluator::{evaluate, evaluate_with, KeywordMatcher, TokenMatcher};
pub use token_matcher::{find_match, matches};
