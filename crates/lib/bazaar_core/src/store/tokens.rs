//! Refresh token persistence: one row per user, replaced on every issue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::StoreError;
use crate::models::RefreshTokenRecord;

/// Single-slot refresh token store.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch the record for a user; [`StoreError::NotFound`] when absent.
    async fn find_by_user(&self, user_id: Uuid) -> Result<RefreshTokenRecord, StoreError>;

    /// Insert or atomically replace the user's record. Last writer wins.
    async fn upsert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError>;

    /// Mark the user's record revoked; [`StoreError::NotFound`] when absent.
    async fn revoke(&self, user_id: Uuid) -> Result<(), StoreError>;
}

/// PostgreSQL-backed [`TokenStore`] over the `tokens` table.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<RefreshTokenRecord, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>, bool, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT user_id, token, expires_at, is_revoked, created_at, updated_at \
             FROM tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, token, expires_at, revoked, created_at, updated_at)) = row else {
            debug!(%user_id, "refresh token not found");
            return Err(StoreError::NotFound);
        };
        Ok(RefreshTokenRecord {
            user_id,
            token,
            expires_at,
            revoked,
            created_at,
            updated_at,
        })
    }

    async fn upsert(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tokens (user_id, token, expires_at, is_revoked, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE \
             SET token = EXCLUDED.token, \
                 expires_at = EXCLUDED.expires_at, \
                 is_revoked = EXCLUDED.is_revoked, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        info!(user_id = %record.user_id, "refresh token upserted");
        Ok(())
    }

    async fn revoke(&self, user_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE tokens SET is_revoked = TRUE, updated_at = now() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        info!(%user_id, "refresh token revoked");
        Ok(())
    }
}
