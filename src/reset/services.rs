use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::services::{hash_password, normalize_email, validate_new_password};
use crate::error::AppError;
use crate::notify::Notice;
use crate::state::AppState;

/// Uniform over 100000..=999999 so the code always has six digits.
pub(crate) fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000u32).to_string()
}

/// Issues a code for the account behind `email` and mails it.
#[instrument(skip(st, email))]
pub async fn request_reset(st: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    let user = st
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let ttl_minutes = st.config.reset_code_ttl_minutes;
    let now = OffsetDateTime::now_utc();
    let code = generate_code();

    let issued = st
        .codes
        .insert_if_absent(user.id, &code, now, now + Duration::minutes(ttl_minutes))
        .await?;
    if !issued {
        warn!(user_id = %user.id, "reset requested while a code is live");
        return Err(AppError::conflict(
            "A reset code has already been sent. Check your email",
        ));
    }

    info!(user_id = %user.id, "reset code issued");
    st.notifier.dispatch(Notice::ResetCode {
        name: user.name,
        email: user.email,
        code,
        ttl_minutes,
    });
    Ok(())
}

/// Checks `code` without consuming it.
#[instrument(skip(st, email, code))]
pub async fn verify_code(st: &AppState, email: &str, code: &str) -> Result<Uuid, AppError> {
    let email = normalize_email(email);
    let Some(user) = st.users.find_by_email(&email).await? else {
        return Err(AppError::InvalidCode);
    };

    let live = st
        .codes
        .find_live(user.id, code.trim(), OffsetDateTime::now_utc())
        .await?;
    match live {
        Some(_) => Ok(user.id),
        None => {
            warn!(user_id = %user.id, "verification code mismatch or expired");
            Err(AppError::InvalidCode)
        }
    }
}

/// Sets a new password and burns the code. Consuming the code is the gate:
/// when a concurrent request got there first the password is left alone.
#[instrument(skip(st, code, new_password, confirm_password))]
pub async fn consume_and_set_password(
    st: &AppState,
    user_id: Uuid,
    code: &str,
    new_password: &str,
    confirm_password: &str,
) -> Result<(), AppError> {
    validate_new_password(new_password, confirm_password)?;
    let code = code.trim();

    if st
        .codes
        .find_live(user_id, code, OffsetDateTime::now_utc())
        .await?
        .is_none()
    {
        return Err(AppError::InvalidCode);
    }
    let hash = hash_password(new_password, &st.config.password)?;

    if !st.codes.consume(user_id, code, OffsetDateTime::now_utc()).await? {
        warn!(%user_id, "reset code consumed by another request");
        return Err(AppError::InvalidCode);
    }
    if !st.users.set_password(user_id, &hash).await? {
        return Err(AppError::not_found("User not found"));
    }

    info!(%user_id, "password reset completed");
    Ok(())
}
