// SQLite-backed rule store for per-guild automod rule sets.
//
// Tables:
// - automod_rules: One row per rule, ordered by position within a guild
// - automod_settings: Per-guild preview settings
//
// Keyword lists and opaque rule metadata are stored as JSON text.

use crate::core::automod::{AutomodError, GuildAutomodSettings, Rule, RuleStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

pub struct SqliteRuleStore {
    pool: Pool<Sqlite>,
}

fn storage_error(e: sqlx::Error) -> AutomodError {
    AutomodError::StorageError(e.to_string())
}

fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, AutomodError> {
    let raw: String = row.get(column);
    Ok(serde_json::from_str(&raw)?)
}

impl SqliteRuleStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), AutomodError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS automod_rules (
                guild_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                platform_id TEXT,
                name TEXT NOT NULL,
                enabled BOOLEAN NOT NULL DEFAULT 1,
                keyword_filter TEXT NOT NULL,
                allow_list TEXT NOT NULL,
                actions TEXT NOT NULL,
                exempt_roles TEXT NOT NULL,
                exempt_channels TEXT NOT NULL,
                PRIMARY KEY (guild_id, position)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS automod_settings (
                guild_id INTEGER PRIMARY KEY,
                preview_enabled BOOLEAN NOT NULL DEFAULT 0,
                log_channel_id INTEGER,
                last_synced TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    fn rule_from_row(row: &SqliteRow) -> Result<Rule, AutomodError> {
        Ok(Rule {
            id: row.get("platform_id"),
            name: row.get("name"),
            enabled: row.get("enabled"),
            keyword_filter: json_column(row, "keyword_filter")?,
            allow_list: json_column(row, "allow_list")?,
            actions: json_column(row, "actions")?,
            exempt_roles: json_column(row, "exempt_roles")?,
            exempt_channels: json_column(row, "exempt_channels")?,
        })
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn get_rules(&self, guild_id: u64) -> Result<Vec<Rule>, AutomodError> {
        let rows = sqlx::query(
            r#"
            SELECT platform_id, name, enabled, keyword_filter, allow_list,
                   actions, exempt_roles, exempt_channels
            FROM automod_rules
            WHERE guild_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(Self::rule_from_row).collect()
    }

    async fn save_rules(&self, guild_id: u64, rules: &[Rule]) -> Result<(), AutomodError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query("DELETE FROM automod_rules WHERE guild_id = ?")
            .bind(guild_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        for (position, rule) in rules.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO automod_rules (
                    guild_id, position, platform_id, name, enabled, keyword_filter,
                    allow_list, actions, exempt_roles, exempt_channels
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(guild_id as i64)
            .bind(position as i64)
            .bind(rule.id.as_deref())
            .bind(&rule.name)
            .bind(rule.enabled)
            .bind(serde_json::to_string(&rule.keyword_filter)?)
            .bind(serde_json::to_string(&rule.allow_list)?)
            .bind(serde_json::to_string(&rule.actions)?)
            .bind(serde_json::to_string(&rule.exempt_roles)?)
            .bind(serde_json::to_string(&rule.exempt_channels)?)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }

    async fn get_settings(&self, guild_id: u64) -> Result<GuildAutomodSettings, AutomodError> {
        let row = sqlx::query("SELECT * FROM automod_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        let Some(row) = row else {
            return Ok(GuildAutomodSettings::new(guild_id));
        };

        let last_synced = row
            .get::<Option<String>, _>("last_synced")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(GuildAutomodSettings {
            guild_id,
            preview_enabled: row.get("preview_enabled"),
            log_channel_id: row.get::<Option<i64>, _>("log_channel_id").map(|id| id as u64),
            last_synced,
        })
    }

    async fn save_settings(&self, settings: GuildAutomodSettings) -> Result<(), AutomodError> {
        sqlx::query(
            r#"
            INSERT INTO automod_settings (guild_id, preview_enabled, log_channel_id, last_synced)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                preview_enabled = excluded.preview_enabled,
                log_channel_id = excluded.log_channel_id,
                last_synced = excluded.last_synced
            "#,
        )
        .bind(settings.guild_id as i64)
        .bind(settings.preview_enabled)
        .bind(settings.log_channel_id.map(|id| id as i64))
        .bind(settings.last_synced.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}
