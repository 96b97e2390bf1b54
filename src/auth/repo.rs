use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, DEFAULT_PROFILE_PICTURE};
use crate::store::{map_unique, StoreResult};

const USER_COLUMNS: &str = r#"
    id, name, email, matric_number, department, faculty, password_hash,
    profile_picture, phone_number, parent_phone_number, address, is_admin,
    created_at, updated_at
"#;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_matric(&self, matric_number: &str) -> StoreResult<Option<User>>;
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    /// Persists every mutable profile field of `user`; the password hash is left alone.
    async fn update_profile(&self, user: &User) -> StoreResult<Option<User>>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;
    /// Newest first, optionally filtered by a case-insensitive keyword.
    async fn list(&self, keyword: Option<&str>) -> StoreResult<Vec<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_matric(&self, matric_number: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE matric_number = $1"
        ))
        .bind(matric_number)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users
                (id, name, email, matric_number, department, faculty,
                 password_hash, profile_picture, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.matric_number)
        .bind(&user.department)
        .bind(&user.faculty)
        .bind(&user.password_hash)
        .bind(DEFAULT_PROFILE_PICTURE)
        .bind(user.is_admin)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn update_profile(&self, user: &User) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = $2, email = $3, matric_number = $4, department = $5,
                   faculty = $6, profile_picture = $7, phone_number = $8,
                   parent_phone_number = $9, address = $10, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.matric_number)
        .bind(&user.department)
        .bind(&user.faculty)
        .bind(&user.profile_picture)
        .bind(&user.phone_number)
        .bind(&user.parent_phone_number)
        .bind(&user.address)
        .fetch_optional(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn list(&self, keyword: Option<&str>) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE $1::text IS NULL
                OR position(lower($1) in lower(name)) > 0
                OR position(lower($1) in lower(email)) > 0
                OR position(lower($1) in lower(matric_number)) > 0
                OR position(lower($1) in lower(department)) > 0
                OR position(lower($1) in lower(faculty)) > 0
             ORDER BY created_at DESC
            "#
        ))
        .bind(keyword)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
