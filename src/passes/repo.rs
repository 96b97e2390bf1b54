use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewPass, Pass, PassQuery, PassStatus};
use crate::store::StoreResult;

const PASS_COLUMNS: &str = r#"
    id, user_id, name, email, matric_number, department, faculty,
    phone_number, parent_phone_number, departure_date, location, hostel,
    reason, status, created_at, updated_at
"#;

#[async_trait]
pub trait PassStore: Send + Sync {
    async fn insert(&self, pass: NewPass) -> StoreResult<Pass>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Pass>>;
    /// Newest first.
    async fn list(&self, query: &PassQuery) -> StoreResult<Vec<Pass>>;
    async fn set_status(&self, id: Uuid, status: PassStatus) -> StoreResult<Option<Pass>>;
}

#[derive(Clone)]
pub struct PgPassStore {
    db: PgPool,
}

impl PgPassStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PassStore for PgPassStore {
    async fn insert(&self, pass: NewPass) -> StoreResult<Pass> {
        let row = sqlx::query_as::<_, Pass>(&format!(
            r#"
            INSERT INTO passes
                (id, user_id, name, email, matric_number, department, faculty,
                 phone_number, parent_phone_number, departure_date, location,
                 hostel, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PASS_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(pass.user_id)
        .bind(&pass.name)
        .bind(&pass.email)
        .bind(&pass.matric_number)
        .bind(&pass.department)
        .bind(&pass.faculty)
        .bind(&pass.phone_number)
        .bind(&pass.parent_phone_number)
        .bind(&pass.departure_date)
        .bind(&pass.location)
        .bind(&pass.hostel)
        .bind(&pass.reason)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Pass>> {
        let row = sqlx::query_as::<_, Pass>(&format!(
            "SELECT {PASS_COLUMNS} FROM passes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(&self, query: &PassQuery) -> StoreResult<Vec<Pass>> {
        let rows = sqlx::query_as::<_, Pass>(&format!(
            r#"
            SELECT {PASS_COLUMNS}
              FROM passes
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::pass_status IS NULL OR status = $2)
               AND ($3::text IS NULL
                    OR position(lower($3) in lower(name)) > 0
                    OR position(lower($3) in lower(email)) > 0
                    OR position(lower($3) in lower(matric_number)) > 0
                    OR position(lower($3) in lower(department)) > 0
                    OR position(lower($3) in lower(faculty)) > 0
                    OR position(lower($3) in lower(location)) > 0
                    OR position(lower($3) in lower(hostel)) > 0
                    OR position(lower($3) in lower(reason)) > 0
                    OR position(lower($3) in lower(status::text)) > 0)
             ORDER BY created_at DESC, seq ASC
            "#
        ))
        .bind(query.owner)
        .bind(query.status)
        .bind(query.keyword.as_deref())
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn set_status(&self, id: Uuid, status: PassStatus) -> StoreResult<Option<Pass>> {
        let row = sqlx::query_as::<_, Pass>(&format!(
            r#"
            UPDATE passes
               SET status = $2, updated_at = now()
             WHERE id = $1
            RETURNING {PASS_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
