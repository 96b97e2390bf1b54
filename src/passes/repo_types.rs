use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::contains_ci;

/// Lifecycle status of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pass_status")]
pub enum PassStatus {
    Pending,
    Approved,
    Rejected,
}

impl PassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStatus::Pending => "Pending",
            PassStatus::Approved => "Approved",
            PassStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for PassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pass record. Requester fields are copied at creation and never re-derived.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pass {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub department: String,
    pub faculty: String,
    pub phone_number: String,
    pub parent_phone_number: String,
    pub departure_date: String,
    pub location: String,
    pub hostel: String,
    pub reason: String,
    pub status: PassStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Pass {
    /// OR across every searchable field, case-insensitive.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        [
            self.name.as_str(),
            self.email.as_str(),
            self.matric_number.as_str(),
            self.department.as_str(),
            self.faculty.as_str(),
            self.location.as_str(),
            self.hostel.as_str(),
            self.reason.as_str(),
            self.status.as_str(),
        ]
        .iter()
        .any(|field| contains_ci(field, keyword))
    }
}

#[derive(Debug, Clone)]
pub struct NewPass {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub department: String,
    pub faculty: String,
    pub phone_number: String,
    pub parent_phone_number: String,
    pub departure_date: String,
    pub location: String,
    pub hostel: String,
    pub reason: String,
}

/// Conditions combined with AND; `keyword` itself ORs across fields.
#[derive(Debug, Clone, Default)]
pub struct PassQuery {
    pub owner: Option<Uuid>,
    pub status: Option<PassStatus>,
    pub keyword: Option<String>,
}

impl PassQuery {
    pub fn matches(&self, pass: &Pass) -> bool {
        self.owner.map_or(true, |o| pass.user_id == o)
            && self.status.map_or(true, |s| pass.status == s)
            && self
                .keyword
                .as_deref()
                .map_or(true, |k| pass.matches_keyword(k))
    }
}
