// AutoMod rule-set service - keeps each guild's keyword rules and runs
// the evaluator against them.
//
// This service handles:
// - Local rule drafts (add / remove / enable / disable)
// - Pulling in rules that already exist on the platform
// - JSON import / export of a guild's rule set
// - Preview settings (whether live messages get checked, where results go)
//
// NO Discord dependencies here - just pure domain logic.

use super::automod_models::{AutomodHit, GuildAutomodSettings, Pattern, Rule};
use super::rule_evaluator::evaluate;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AutomodError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("No rule named `{0}`")]
    RuleNotFound(String),

    #[error("Invalid rule JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting rule sets and preview settings.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Get a guild's rules in evaluation order.
    async fn get_rules(&self, guild_id: u64) -> Result<Vec<Rule>, AutomodError>;

    /// Replace a guild's whole rule set, keeping the given order.
    async fn save_rules(&self, guild_id: u64, rules: &[Rule]) -> Result<(), AutomodError>;

    /// Get preview settings for a guild (defaults when never saved).
    async fn get_settings(&self, guild_id: u64) -> Result<GuildAutomodSettings, AutomodError>;

    /// Save preview settings for a guild.
    async fn save_settings(&self, settings: GuildAutomodSettings) -> Result<(), AutomodError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Per-guild rule management and message checking.
pub struct AutomodService<S: RuleStore> {
    store: S,
    // Guild ID -> rules as last loaded from the store
    cache: DashMap<u64, Arc<Vec<Rule>>>,
    // Guild ID -> lock held while loading or rewriting that guild's rules
    guild_locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl<S: RuleStore> AutomodService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            guild_locks: DashMap::new(),
        }
    }

    async fn lock_guild(&self, guild_id: u64) -> OwnedMutexGuard<()> {
        let lock = self.guild_locks.entry(guild_id).or_default().clone();
        lock.lock_owned().await
    }

    fn cached(&self, guild_id: u64) -> Option<Arc<Vec<Rule>>> {
        self.cache.get(&guild_id).map(|rules| Arc::clone(rules.value()))
    }

    async fn rules(&self, guild_id: u64) -> Result<Arc<Vec<Rule>>, AutomodError> {
        if let Some(rules) = self.cached(guild_id) {
            return Ok(rules);
        }

        let _guard = self.lock_guild(guild_id).await;
        self.load_rules(guild_id).await
    }

    /// Cache or store lookup. Caller must hold the guild lock.
    async fn load_rules(&self, guild_id: u64) -> Result<Arc<Vec<Rule>>, AutomodError> {
        if let Some(rules) = self.cached(guild_id) {
            return Ok(rules);
        }

        let rules = Arc::new(self.store.get_rules(guild_id).await?);
        self.cache.insert(guild_id, Arc::clone(&rules));
        Ok(rules)
    }

    /// Caller must hold the guild lock.
    async fn replace_rules(&self, guild_id: u64, rules: Vec<Rule>) -> Result<(), AutomodError> {
        self.store.save_rules(guild_id, &rules).await?;
        self.cache.insert(guild_id, Arc::new(rules));
        Ok(())
    }

    /// Check a piece of text against a guild's rules.
    ///
    /// # Returns
    /// The first matching rule and keyword, or `None`.
    pub async fn check_message(
        &self,
        guild_id: u64,
        content: &str,
    ) -> Result<Option<AutomodHit>, AutomodError> {
        let rules = self.rules(guild_id).await?;
        Ok(evaluate(content, &rules).map(AutomodHit::from))
    }

    /// Get a guild's rules in evaluation order.
    pub async fn list_rules(&self, guild_id: u64) -> Result<Vec<Rule>, AutomodError> {
        Ok(self.rules(guild_id).await?.to_vec())
    }

    /// Add a local draft rule at the end of the guild's list.
    pub async fn add_rule(
        &self,
        guild_id: u64,
        name: &str,
        keywords: Vec<String>,
        allow_list: Vec<String>,
    ) -> Result<Rule, AutomodError> {
        let rule = Rule::draft(name.trim(), keywords, allow_list);
        validate_rule(&rule)?;

        let _guard = self.lock_guild(guild_id).await;
        let mut rules = self.load_rules(guild_id).await?.to_vec();
        if find_rule(&rules, &rule.name).is_some() {
            return Err(AutomodError::InvalidRule(format!(
                "a rule named `{}` already exists",
                rule.name
            )));
        }

        rules.push(rule.clone());
        self.replace_rules(guild_id, rules).await?;
        Ok(rule)
    }

    /// Remove a rule by name.
    pub async fn remove_rule(&self, guild_id: u64, name: &str) -> Result<Rule, AutomodError> {
        let _guard = self.lock_guild(guild_id).await;
        let mut rules = self.load_rules(guild_id).await?.to_vec();
        let index = find_rule(&rules, name)
            .ok_or_else(|| AutomodError::RuleNotFound(name.to_string()))?;

        let removed = rules.remove(index);
        self.replace_rules(guild_id, rules).await?;
        Ok(removed)
    }

    /// Enable or disable a rule by name.
    pub async fn set_rule_enabled(
        &self,
        guild_id: u64,
        name: &str,
        enabled: bool,
    ) -> Result<(), AutomodError> {
        let _guard = self.lock_guild(guild_id).await;
        let mut rules = self.load_rules(guild_id).await?.to_vec();
        let index = find_rule(&rules, name)
            .ok_or_else(|| AutomodError::RuleNotFound(name.to_string()))?;

        rules[index].enabled = enabled;
        self.replace_rules(guild_id, rules).await
    }

    /// Replace the guild's platform rules with a fresh copy.
    ///
    /// Local drafts are kept and stay after the platform rules.
    pub async fn sync_platform_rules(
        &self,
        guild_id: u64,
        platform_rules: Vec<Rule>,
    ) -> Result<usize, AutomodError> {
        let _guard = self.lock_guild(guild_id).await;
        let current = self.load_rules(guild_id).await?;
        let drafts = current
            .iter()
            .filter(|rule| !rule.is_platform_rule())
            .cloned();

        let synced = platform_rules.len();
        let rules: Vec<Rule> = platform_rules.into_iter().chain(drafts).collect();
        self.replace_rules(guild_id, rules).await?;

        let mut settings = self.store.get_settings(guild_id).await?;
        settings.last_synced = Some(Utc::now());
        self.store.save_settings(settings).await?;

        Ok(synced)
    }

    /// Export a guild's rules as pretty-printed JSON.
    pub async fn export_rules(&self, guild_id: u64) -> Result<String, AutomodError> {
        let rules = self.rules(guild_id).await?;
        Ok(serde_json::to_string_pretty(rules.as_slice())?)
    }

    /// Replace a guild's rules with the JSON array in `json`.
    ///
    /// Nothing is stored unless every rule is valid.
    pub async fn import_rules(&self, guild_id: u64, json: &str) -> Result<usize, AutomodError> {
        let rules: Vec<Rule> = serde_json::from_str(json)?;

        for (i, rule) in rules.iter().enumerate() {
            validate_rule(rule)?;
            if rules[..i]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(&rule.name))
            {
                return Err(AutomodError::InvalidRule(format!(
                    "duplicate rule name `{}`",
                    rule.name
                )));
            }
        }

        let count = rules.len();
        let _guard = self.lock_guild(guild_id).await;
        self.replace_rules(guild_id, rules).await?;
        Ok(count)
    }

    /// Get preview settings for a guild.
    pub async fn get_settings(&self, guild_id: u64) -> Result<GuildAutomodSettings, AutomodError> {
        self.store.get_settings(guild_id).await
    }

    /// Turn the live preview on or off and pick where results go.
    pub async fn set_preview(
        &self,
        guild_id: u64,
        enabled: bool,
        log_channel_id: Option<u64>,
    ) -> Result<GuildAutomodSettings, AutomodError> {
        let _guard = self.lock_guild(guild_id).await;
        let mut settings = self.store.get_settings(guild_id).await?;
        settings.preview_enabled = enabled;
        settings.log_channel_id = log_channel_id;
        self.store.save_settings(settings.clone()).await?;
        Ok(settings)
    }
}

fn find_rule(rules: &[Rule], name: &str) -> Option<usize> {
    let name = name.trim();
    rules.iter().position(|r| r.name.eq_ignore_ascii_case(name))
}

/// Reject rules the matcher can't do anything useful with.
fn validate_rule(rule: &Rule) -> Result<(), AutomodError> {
    if rule.name.trim().is_empty() {
        return Err(AutomodError::InvalidRule("rule name is empty".to_string()));
    }

    if rule.keyword_filter.is_empty() {
        return Err(AutomodError::InvalidRule(format!(
            "rule `{}` has no keywords",
            rule.name
        )));
    }

    if let Some(empty) = rule.keyword_filter.iter().find(|k: &&Pattern| k.is_empty()) {
        return Err(AutomodError::InvalidRule(format!(
            "rule `{}` has an empty keyword `{}`",
            rule.name, empty
        )));
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// In-memory store for testing
    #[derive(Default)]
    struct MockRuleStore {
        rules: DashMap<u64, Vec<Rule>>,
        settings: DashMap<u64, GuildAutomodSettings>,
        rule_loads: AtomicUsize,
    }

    #[async_trait]
    impl RuleStore for MockRuleStore {
        async fn get_rules(&self, guild_id: u64) -> Result<Vec<Rule>, AutomodError> {
            self.rule_loads.fetch_add(1, Ordering::SeqCst);
            // Give concurrent callers a chance to interleave, like a real DB would
            tokio::task::yield_now().await;
            Ok(self
                .rules
                .get(&guild_id)
                .map(|r| r.clone())
                .unwrap_or_default())
        }

        async fn save_rules(&self, guild_id: u64, rules: &[Rule]) -> Result<(), AutomodError> {
            tokio::task::yield_now().await;
            self.rules.insert(guild_id, rules.to_vec());
            Ok(())
        }

        async fn get_settings(&self, guild_id: u64) -> Result<GuildAutomodSettings, AutomodError> {
            Ok(self
                .settings
                .get(&guild_id)
                .map(|s| s.clone())
                .unwrap_or_else(|| GuildAutomodSettings::new(guild_id)))
        }

        async fn save_settings(&self, settings: GuildAutomodSettings) -> Result<(), AutomodError> {
            self.settings.insert(settings.guild_id, settings);
            Ok(())
        }
    }

    /// Store whose first rule load takes its snapshot, then waits on `release`.
    #[derive(Default)]
    struct SlowFirstLoadStore {
        inner: MockRuleStore,
        first_load_done: AtomicBool,
        loading: Notify,
        release: Notify,
    }

    #[async_trait]
    impl RuleStore for SlowFirstLoadStore {
        async fn get_rules(&self, guild_id: u64) -> Result<Vec<Rule>, AutomodError> {
            let snapshot = self.inner.get_rules(guild_id).await?;
            if !self.first_load_done.swap(true, Ordering::SeqCst) {
                self.loading.notify_one();
                self.release.notified().await;
            }
            Ok(snapshot)
        }

        async fn save_rules(&self, guild_id: u64, rules: &[Rule]) -> Result<(), AutomodError> {
            self.inner.save_rules(guild_id, rules).await
        }

        async fn get_settings(&self, guild_id: u64) -> Result<GuildAutomodSettings, AutomodError> {
            self.inner.get_settings(guild_id).await
        }

        async fn save_settings(&self, settings: GuildAutomodSettings) -> Result<(), AutomodError> {
            self.inner.save_settings(settings).await
        }
    }

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn platform_rule(id: &str, name: &str, keywords: &[&str]) -> Rule {
        let mut rule = Rule::draft(name, keywords.iter().copied(), Vec::<String>::new());
        rule.id = Some(id.to_string());
        rule
    }

    #[tokio::test]
    async fn test_check_message_with_no_rules() {
        let service = AutomodService::new(MockRuleStore::default());

        let hit = service.check_message(1, "hello world").await.unwrap();

        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_added_rule_matches() {
        let service = AutomodService::new(MockRuleStore::default());
        service
            .add_rule(1, "tests", words(&["*test*"]), words(&["testcase"]))
            .await
            .unwrap();

        let hit = service
            .check_message(1, "look guys i am testing this")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.rule_name, "tests");
        assert_eq!(hit.keyword, "*test*");
        assert_eq!(hit.matched, "testing");

        let hit = service
            .check_message(1, "please ignore testcase here")
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_rules_are_per_guild() {
        let service = AutomodService::new(MockRuleStore::default());
        service
            .add_rule(1, "r", words(&["bad"]), vec![])
            .await
            .unwrap();

        assert!(service.check_message(1, "bad").await.unwrap().is_some());
        assert!(service.check_message(2, "bad").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_rule_rejects_bad_input() {
        let service = AutomodService::new(MockRuleStore::default());

        let err = service.add_rule(1, "  ", words(&["x"]), vec![]).await;
        assert!(matches!(err, Err(AutomodError::InvalidRule(_))));

        let err = service.add_rule(1, "none", vec![], vec![]).await;
        assert!(matches!(err, Err(AutomodError::InvalidRule(_))));

        let err = service.add_rule(1, "stars", words(&["ok", "**"]), vec![]).await;
        assert!(matches!(err, Err(AutomodError::InvalidRule(_))));

        service.add_rule(1, "dupe", words(&["x"]), vec![]).await.unwrap();
        let err = service.add_rule(1, "DUPE", words(&["y"]), vec![]).await;
        assert!(matches!(err, Err(AutomodError::InvalidRule(_))));

        assert_eq!(service.list_rules(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_and_remove() {
        let service = AutomodService::new(MockRuleStore::default());
        service.add_rule(1, "r", words(&["bad"]), vec![]).await.unwrap();

        service.set_rule_enabled(1, "r", false).await.unwrap();
        assert!(service.check_message(1, "bad").await.unwrap().is_none());

        service.set_rule_enabled(1, "R", true).await.unwrap();
        assert!(service.check_message(1, "bad").await.unwrap().is_some());

        let removed = service.remove_rule(1, "r").await.unwrap();
        assert_eq!(removed.name, "r");
        assert!(service.list_rules(1).await.unwrap().is_empty());

        let err = service.remove_rule(1, "r").await;
        assert!(matches!(err, Err(AutomodError::RuleNotFound(_))));
        let err = service.set_rule_enabled(1, "missing", true).await;
        assert!(matches!(err, Err(AutomodError::RuleNotFound(_))));
    }

    #[tokio::test]
    async fn test_rules_are_cached_between_checks() {
        let store = MockRuleStore::default();
        store.rules.insert(1, vec![Rule::draft("r", ["bad"], ["good"])]);
        let service = AutomodService::new(store);

        for _ in 0..5 {
            service.check_message(1, "so bad").await.unwrap();
        }

        assert_eq!(service.store.rule_loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sync_keeps_local_drafts_after_platform_rules() {
        let service = AutomodService::new(MockRuleStore::default());
        service
            .sync_platform_rules(1, vec![platform_rule("10", "old", &["old"])])
            .await
            .unwrap();
        service.add_rule(1, "draft", words(&["new*"]), vec![]).await.unwrap();

        let synced = service
            .sync_platform_rules(
                1,
                vec![
                    platform_rule("11", "first", &["a"]),
                    platform_rule("12", "second", &["b"]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(synced, 2);

        let names: Vec<String> = service
            .list_rules(1)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, words(&["first", "second", "draft"]));

        let settings = service.get_settings(1).await.unwrap();
        assert!(settings.last_synced.is_some());
    }

    #[tokio::test]
    async fn test_export_then_import_into_other_guild() {
        let service = AutomodService::new(MockRuleStore::default());
        service
            .add_rule(1, "r1", words(&["*test*"]), words(&["testcase"]))
            .await
            .unwrap();

        let json = service.export_rules(1).await.unwrap();
        assert!(json.contains("\"keywordFilter\""));

        let count = service.import_rules(2, &json).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            service.list_rules(1).await.unwrap(),
            service.list_rules(2).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_import_keeps_existing_rules() {
        let service = AutomodService::new(MockRuleStore::default());
        service.add_rule(1, "keep", words(&["x"]), vec![]).await.unwrap();

        let err = service.import_rules(1, "not json").await;
        assert!(matches!(err, Err(AutomodError::Serialization(_))));

        let json = r#"[{"name": "bad", "keywordFilter": ["*"]}]"#;
        let err = service.import_rules(1, json).await;
        assert!(matches!(err, Err(AutomodError::InvalidRule(_))));

        let json = r#"[
            {"name": "a", "keywordFilter": ["x"]},
            {"name": "A", "keywordFilter": ["y"]}
        ]"#;
        let err = service.import_rules(1, json).await;
        assert!(matches!(err, Err(AutomodError::InvalidRule(_))));

        let rules = service.list_rules(1).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "keep");
    }

    #[tokio::test]
    async fn test_set_preview() {
        let service = AutomodService::new(MockRuleStore::default());
        assert!(!service.get_settings(1).await.unwrap().preview_enabled);

        service.set_preview(1, true, Some(99)).await.unwrap();

        let settings = service.get_settings(1).await.unwrap();
        assert!(settings.preview_enabled);
        assert_eq!(settings.log_channel_id, Some(99));
    }

    #[tokio::test]
    async fn test_slow_load_does_not_overwrite_newer_rules() {
        let service = Arc::new(AutomodService::new(SlowFirstLoadStore::default()));

        // Reader misses the cache and stalls inside the store with an empty snapshot
        let reader = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.check_message(1, "bad").await })
        };
        service.store.loading.notified().await;

        let writer = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.add_rule(1, "r", words(&["bad"]), vec![]).await })
        };
        tokio::task::yield_now().await;
        service.store.release.notify_one();

        reader.await.unwrap().unwrap();
        writer.await.unwrap().unwrap();

        assert_eq!(service.store.inner.rules.get(&1).unwrap().len(), 1);
        let hit = service.check_message(1, "bad").await.unwrap();
        assert_eq!(hit.unwrap().rule_name, "r");
    }

    #[tokio::test]
    async fn test_concurrent_adds_both_persist() {
        let service = AutomodService::new(MockRuleStore::default());

        let (a, b) = tokio::join!(
            service.add_rule(1, "a", words(&["x"]), vec![]),
            service.add_rule(1, "b", words(&["y"]), vec![]),
        );
        a.unwrap();
        b.unwrap();

        let mut names: Vec<String> = service
            .list_rules(1)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, words(&["a", "b"]));
        assert_eq!(service.store.rules.get(&1).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_racing_sync_keeps_both() {
        let service = AutomodService::new(MockRuleStore::default());

        let (added, synced) = tokio::join!(
            service.add_rule(1, "draft", words(&["x"]), vec![]),
            service.sync_platform_rules(1, vec![platform_rule("10", "platform", &["y"])]),
        );
        added.unwrap();
        synced.unwrap();

        let names: Vec<String> = service
            .list_rules(1)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, words(&["platform", "draft"]));
    }
}
