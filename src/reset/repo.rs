use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{map_unique, StoreError, StoreResult};

/// One-time password reset code.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl VerificationCode {
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Drops the user's expired codes, then stores `code` unless a live one remains.
    /// Returns `false` when a live code already exists.
    async fn insert_if_absent(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> StoreResult<bool>;
    /// A code that matches `user_id` and `code` and has not expired at `now`.
    async fn find_live(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<VerificationCode>>;
    /// Deletes the matching live code. Returns `false` when there was none, so
    /// exactly one caller can win a given code.
    async fn consume(&self, user_id: Uuid, code: &str, now: OffsetDateTime) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgCodeStore {
    db: PgPool,
}

impl PgCodeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn insert_if_absent(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query(r#"DELETE FROM verification_codes WHERE user_id = $1 AND expires_at <= $2"#)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO verification_codes (id, user_id, code, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code)
        .bind(now)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(map_unique)?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(inserted.rows_affected() == 1)
    }

    async fn find_live(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<VerificationCode>> {
        let row = sqlx::query_as::<_, VerificationCode>(
            r#"
            SELECT id, user_id, code, created_at, expires_at
              FROM verification_codes
             WHERE user_id = $1 AND code = $2 AND expires_at > $3
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn consume(&self, user_id: Uuid, code: &str, now: OffsetDateTime) -> StoreResult<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            DELETE FROM verification_codes
             WHERE user_id = $1 AND code = $2 AND expires_at > $3
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.is_some())
    }
}
