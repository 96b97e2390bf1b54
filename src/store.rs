use std::collections::HashMap;

use serde::Deserialize;

/// Failure surfaced by any persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

lazy_static::lazy_static! {
    // unique index name -> field reported back to the caller
    static ref UNIQUE_INDEXES: HashMap<&'static str, &'static str> = HashMap::from([
        ("users_email_key", "email"),
        ("users_matric_number_key", "matricNumber"),
        ("verification_codes_user_id_key", "verificationCode"),
    ]);
}

/// Turns a Postgres unique violation into [`StoreError::Duplicate`].
pub(crate) fn map_unique(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            let field = db
                .constraint()
                .and_then(|c| UNIQUE_INDEXES.get(c).copied())
                .unwrap_or("record");
            return StoreError::Duplicate(field);
        }
    }
    StoreError::Database(e)
}

/// Case-insensitive substring test shared by the in-memory backend.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Normalises an optional search keyword: blank means no filter.
pub(crate) fn normalize_keyword(raw: Option<String>) -> Option<String> {
    raw.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

/// `?keyword=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
}

impl SearchQuery {
    pub fn keyword(self) -> Option<String> {
        normalize_keyword(self.keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_ci_ignores_case() {
        assert!(contains_ci("Engineering", "eng"));
        assert!(contains_ci("MECHANICAL ENGINEERING", "eng"));
        assert!(!contains_ci("Law", "eng"));
    }

    #[test]
    fn blank_keyword_is_no_filter() {
        assert_eq!(normalize_keyword(None), None);
        assert_eq!(normalize_keyword(Some("   ".into())), None);
        assert_eq!(normalize_keyword(Some(" eng ".into())), Some("eng".into()));
    }
}
