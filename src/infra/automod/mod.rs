pub mod sqlite_rule_store;

pub use sqlite_rule_store::SqliteRuleStore;
