//! Settings Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::Settings;
use crate::domain::repositories::{RepoResult, SettingsRepository};

/// PostgreSQL settings repository. Settings is a singleton row (id = 1);
/// `get` falls back to documented defaults if the row is missing, which
/// only happens before the first `save`.
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get(&self) -> RepoResult<Settings> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"SELECT attendance_cooldown_seconds, relog_cooldown_seconds FROM settings WHERE id = 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((attendance_cooldown_seconds, relog_cooldown_seconds)) => Ok(Settings {
                attendance_cooldown_seconds,
                relog_cooldown_seconds,
            }),
            None => Ok(Settings::default()),
        }
    }

    async fn save(&self, settings: &Settings) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (id, attendance_cooldown_seconds, relog_cooldown_seconds)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE SET
                attendance_cooldown_seconds = $1,
                relog_cooldown_seconds = $2
            "#,
        )
        .bind(settings.attendance_cooldown_seconds)
        .bind(settings.relog_cooldown_seconds)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
