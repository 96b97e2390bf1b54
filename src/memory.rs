//! In-process backend for the store traits, used by tests and `AppState::fake`.

use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User, DEFAULT_PROFILE_PICTURE};
use crate::passes::repo::PassStore;
use crate::passes::repo_types::{NewPass, Pass, PassQuery, PassStatus};
use crate::reset::repo::{CodeStore, VerificationCode};
use crate::store::{contains_ci, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    passes: Mutex<Vec<Pass>>,
    codes: Mutex<Vec<VerificationCode>>,
    clock: Mutex<Option<OffsetDateTime>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly increasing timestamps so insertion order and creation order agree.
    fn now(&self) -> OffsetDateTime {
        let mut last = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        let mut now = OffsetDateTime::now_utc();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Newest first; the sort is stable so equal timestamps keep storage order.
fn newest_first<T: Clone>(rows: impl Iterator<Item = T>, key: impl Fn(&T) -> OffsetDateTime) -> Vec<T> {
    let mut out: Vec<T> = rows.collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_matric(&self, matric_number: &str) -> StoreResult<Option<User>> {
        Ok(lock(&self.users)
            .iter()
            .find(|u| u.matric_number == matric_number)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let now = self.now();
        let mut users = lock(&self.users);
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        if users.iter().any(|u| u.matric_number == user.matric_number) {
            return Err(StoreError::Duplicate("matricNumber"));
        }
        let row = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            matric_number: user.matric_number,
            department: user.department,
            faculty: user.faculty,
            password_hash: user.password_hash,
            profile_picture: DEFAULT_PROFILE_PICTURE.to_string(),
            phone_number: None,
            parent_phone_number: None,
            address: None,
            is_admin: user.is_admin,
            created_at: now,
            updated_at: now,
        };
        users.push(row.clone());
        Ok(row)
    }

    async fn update_profile(&self, user: &User) -> StoreResult<Option<User>> {
        let now = self.now();
        let mut users = lock(&self.users);
        if users
            .iter()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Duplicate("email"));
        }
        if users
            .iter()
            .any(|u| u.id != user.id && u.matric_number == user.matric_number)
        {
            return Err(StoreError::Duplicate("matricNumber"));
        }
        let Some(row) = users.iter_mut().find(|u| u.id == user.id) else {
            return Ok(None);
        };
        let password_hash = std::mem::take(&mut row.password_hash);
        *row = User {
            password_hash,
            created_at: row.created_at,
            updated_at: now,
            ..user.clone()
        };
        Ok(Some(row.clone()))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let now = self.now();
        let mut users = lock(&self.users);
        Ok(match users.iter_mut().find(|u| u.id == id) {
            Some(u) => {
                u.password_hash = password_hash.to_string();
                u.updated_at = now;
                true
            }
            None => false,
        })
    }

    async fn list(&self, keyword: Option<&str>) -> StoreResult<Vec<User>> {
        let users = lock(&self.users);
        let hits = users.iter().filter(|u| {
            keyword.map_or(true, |k| {
                [&u.name, &u.email, &u.matric_number, &u.department, &u.faculty]
                    .iter()
                    .any(|f| contains_ci(f, k))
            })
        });
        Ok(newest_first(hits.cloned(), |u| u.created_at))
    }
}

#[async_trait]
impl PassStore for MemoryStore {
    async fn insert(&self, pass: NewPass) -> StoreResult<Pass> {
        let now = self.now();
        let row = Pass {
            id: Uuid::new_v4(),
            user_id: pass.user_id,
            name: pass.name,
            email: pass.email,
            matric_number: pass.matric_number,
            department: pass.department,
            faculty: pass.faculty,
            phone_number: pass.phone_number,
            parent_phone_number: pass.parent_phone_number,
            departure_date: pass.departure_date,
            location: pass.location,
            hostel: pass.hostel,
            reason: pass.reason,
            status: PassStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        lock(&self.passes).push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Pass>> {
        Ok(lock(&self.passes).iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, query: &PassQuery) -> StoreResult<Vec<Pass>> {
        let passes = lock(&self.passes);
        let hits = passes.iter().filter(|p| query.matches(p)).cloned();
        Ok(newest_first(hits, |p| p.created_at))
    }

    async fn set_status(&self, id: Uuid, status: PassStatus) -> StoreResult<Option<Pass>> {
        let now = self.now();
        let mut passes = lock(&self.passes);
        Ok(passes.iter_mut().find(|p| p.id == id).map(|p| {
            p.status = status;
            p.updated_at = now;
            p.clone()
        }))
    }
}

#[async_trait]
impl CodeStore for MemoryStore {
    async fn insert_if_absent(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut codes = lock(&self.codes);
        codes.retain(|c| c.user_id != user_id || c.is_live(now));
        if codes.iter().any(|c| c.user_id == user_id) {
            return Ok(false);
        }
        codes.push(VerificationCode {
            id: Uuid::new_v4(),
            user_id,
            code: code.to_string(),
            created_at: now,
            expires_at,
        });
        Ok(true)
    }

    async fn find_live(
        &self,
        user_id: Uuid,
        code: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<VerificationCode>> {
        Ok(lock(&self.codes)
            .iter()
            .find(|c| c.user_id == user_id && c.code == code && c.is_live(now))
            .cloned())
    }

    async fn consume(&self, user_id: Uuid, code: &str, now: OffsetDateTime) -> StoreResult<bool> {
        let mut codes = lock(&self.codes);
        let hit = codes
            .iter()
            .position(|c| c.user_id == user_id && c.code == code && c.is_live(now));
        Ok(hit.map(|i| codes.remove(i)).is_some())
    }
}
