use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_PROFILE_PICTURE: &str =
    "https://icon-library.com/images/anonymous-avatar-icon/anonymous-avatar-icon-25.jpg";

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub department: String,
    pub faculty: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub profile_picture: String,
    pub phone_number: Option<String>,
    pub parent_phone_number: Option<String>,
    pub address: Option<String>,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub department: String,
    pub faculty: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// The authenticated caller. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub matric_number: String,
    pub department: String,
    pub faculty: String,
    pub profile_picture: String,
    pub phone_number: Option<String>,
    pub parent_phone_number: Option<String>,
    pub address: Option<String>,
    pub is_admin: bool,
}

impl From<User> for Identity {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            matric_number: u.matric_number,
            department: u.department,
            faculty: u.faculty,
            profile_picture: u.profile_picture,
            phone_number: u.phone_number,
            parent_phone_number: u.parent_phone_number,
            address: u.address,
            is_admin: u.is_admin,
        }
    }
}
