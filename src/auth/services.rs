pub(crate) use crate::auth::dto::{Claims, JwtKeys};
use crate::auth::dto::{RegisterRequest, UpdatePasswordRequest, UpdateProfileRequest};
use crate::auth::repo_types::{Identity, NewUser, User};
use crate::config::{JwtConfig, PasswordConfig};
use crate::error::AppError;
use crate::state::AppState;
use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher,
    PasswordVerifier, Version,
};
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Matriculation numbers are 8 characters, admission numbers 11.
pub(crate) fn is_valid_matric(matric: &str) -> bool {
    matches!(matric.chars().count(), 8 | 11)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shared by the authenticated password change and the reset flow.
pub(crate) fn validate_new_password(new: &str, confirm: &str) -> Result<(), AppError> {
    if new.is_empty() || confirm.is_empty() {
        return Err(AppError::validation("Please enter all fields"));
    }
    if new != confirm {
        return Err(AppError::validation("Passwords do not match"));
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(plain: &str, cfg: &PasswordConfig) -> anyhow::Result<String> {
    let params = Params::new(cfg.memory_kib, cfg.iterations, Params::DEFAULT_P_COST, None)
        .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    // cost parameters are read back from the PHC string
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Resolves an `Authorization` header value to the calling user.
pub async fn authenticate(st: &AppState, header: Option<&str>) -> Result<Identity, AppError> {
    let header = header.ok_or_else(|| AppError::unauthorized("Not authorized, no token"))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))?;

    let claims = JwtKeys::from_ref(st).verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::unauthorized("Not authorized, token failed")
    })?;

    let user = st.users.find_by_id(claims.sub).await?.ok_or_else(|| {
        warn!(user_id = %claims.sub, "token refers to a missing user");
        AppError::unauthorized("Not authorized, user not found")
    })?;

    Ok(user.into())
}

pub fn require_admin(identity: &Identity) -> Result<(), AppError> {
    if identity.is_admin {
        Ok(())
    } else {
        warn!(user_id = %identity.id, "admin route denied");
        Err(AppError::Forbidden)
    }
}

#[instrument(skip(st, payload))]
pub async fn register(
    st: &AppState,
    payload: RegisterRequest,
) -> Result<(String, Identity), AppError> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);
    let matric_number = payload.matric_number.trim().to_string();
    let department = payload.department.trim().to_string();
    let faculty = payload.faculty.trim().to_string();

    let required = [
        ("name", name.as_str()),
        ("email", email.as_str()),
        ("matricNumber", matric_number.as_str()),
        ("department", department.as_str()),
        ("faculty", faculty.as_str()),
        ("password", payload.password.as_str()),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.is_empty()) {
        return Err(AppError::validation(format!("Please enter all fields: {field} is required")));
    }

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if !is_valid_matric(&matric_number) {
        return Err(AppError::validation("Invalid matriculation/admission number"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if st.users.find_by_matric(&matric_number).await?.is_some() {
        warn!(matric_number = %matric_number, "matric number already registered");
        return Err(AppError::conflict(
            "Matriculation/Admission number already exists. Please login",
        ));
    }
    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::conflict("User already exists. Please login"));
    }

    let password_hash = hash_password(&payload.password, &st.config.password)?;
    let user = st
        .users
        .create(NewUser {
            name,
            email,
            matric_number,
            department,
            faculty,
            password_hash,
            is_admin: false,
        })
        .await?;

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((token, user.into()))
}

#[instrument(skip(st, password))]
pub async fn login(
    st: &AppState,
    email: &str,
    password: &str,
) -> Result<(String, Identity), AppError> {
    let email = normalize_email(email);
    let invalid = || AppError::unauthorized("Invalid email or password");

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user.into()))
}

/// Takes `value` when it carries something other than whitespace.
fn provided(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(skip(st, identity, patch), fields(user_id = %identity.id))]
pub async fn update_profile(
    st: &AppState,
    identity: &Identity,
    patch: UpdateProfileRequest,
) -> Result<Identity, AppError> {
    let mut user = st
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if let Some(email) = provided(patch.email).map(|e| normalize_email(&e)) {
        if email != user.email {
            if !is_valid_email(&email) {
                return Err(AppError::validation("Invalid email"));
            }
            if st.users.find_by_email(&email).await?.is_some() {
                return Err(AppError::conflict("Email already in use"));
            }
            user.email = email;
        }
    }
    if let Some(matric) = provided(patch.matric_number) {
        if matric != user.matric_number {
            if !is_valid_matric(&matric) {
                return Err(AppError::validation("Invalid matriculation/admission number"));
            }
            if st.users.find_by_matric(&matric).await?.is_some() {
                return Err(AppError::conflict(
                    "Matriculation/Admission number already exists",
                ));
            }
            user.matric_number = matric;
        }
    }
    if let Some(v) = provided(patch.name) {
        user.name = v;
    }
    if let Some(v) = provided(patch.department) {
        user.department = v;
    }
    if let Some(v) = provided(patch.faculty) {
        user.faculty = v;
    }
    if let Some(v) = provided(patch.profile_picture) {
        user.profile_picture = v;
    }
    if let Some(v) = provided(patch.phone_number) {
        user.phone_number = Some(v);
    }
    if let Some(v) = provided(patch.parent_phone_number) {
        user.parent_phone_number = Some(v);
    }
    if let Some(v) = provided(patch.address) {
        user.address = Some(v);
    }

    let updated = st
        .users
        .update_profile(&user)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!("profile updated");
    Ok(updated.into())
}

#[instrument(skip(st, identity, payload), fields(user_id = %identity.id))]
pub async fn update_password(
    st: &AppState,
    identity: &Identity,
    payload: UpdatePasswordRequest,
) -> Result<(), AppError> {
    if payload.current_password.is_empty() {
        return Err(AppError::validation("Please enter all fields"));
    }
    validate_new_password(&payload.new_password, &payload.confirm_password)?;

    let user = st
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!("password change with wrong current password");
        return Err(AppError::unauthorized("Invalid current password"));
    }

    let hash = hash_password(&payload.new_password, &st.config.password)?;
    st.users.set_password(user.id, &hash).await?;
    info!("password updated");
    Ok(())
}

pub async fn list_users(st: &AppState, keyword: Option<&str>) -> Result<Vec<User>, AppError> {
    Ok(st.users.list(keyword).await?)
}

pub async fn get_user(st: &AppState, id: Uuid) -> Result<User, AppError> {
    st.users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}



#[cfg(test)]
mod account_tests {
    use super::*;
    use crate::auth::dto::RegisterRequest;

    fn student(email: &str, matric: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada Obi".into(),
            email: email.into(),
            matric_number: matric.into(),
            department: "Computer Engineering".into(),
            faculty: "Engineering".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn register_returns_profile_and_usable_token() {
        let st = AppState::fake();
        let (token, user) = register(&st, student("Ada@Example.com ", "19CS1234"))
            .await
            .expect("register");
        assert_eq!(user.email, "ada@example.com");
        assert!(!user.is_admin);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password").is_none());

        let header = format!("Bearer {token}");
        let resolved = authenticate(&st, Some(&header)).await.expect("authenticate");
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_or_matric_conflicts() {
        let st = AppState::fake();
        register(&st, student("ada@example.com", "19CS1234")).await.unwrap();

        let err = register(&st, student("ada@example.com", "19CS9999")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = register(&st, student("other@example.com", "19CS1234")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let st = AppState::fake();
        let mut missing = student("ada@example.com", "19CS1234");
        missing.faculty = "  ".into();
        let err = register(&st, missing).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("faculty")));

        let err = register(&st, student("ada@example.com", "123")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = register(&st, student("not-an-email", "19CS1234")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn login_checks_credentials() {
        let st = AppState::fake();
        register(&st, student("ada@example.com", "19CS1234")).await.unwrap();

        assert!(login(&st, "ADA@example.com", "secret1").await.is_ok());
        let err = login(&st, "ada@example.com", "wrong!!").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = login(&st, "nobody@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials() {
        let st = AppState::fake();
        assert!(matches!(authenticate(&st, None).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            authenticate(&st, Some("Token abc")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&st, Some("Bearer not.a.jwt")).await,
            Err(AppError::Unauthorized(_))
        ));

        // well-formed token for a user that does not exist
        let token = JwtKeys::from_ref(&st).sign(Uuid::new_v4()).unwrap();
        let header = format!("Bearer {token}");
        assert!(matches!(
            authenticate(&st, Some(&header)).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn require_admin_checks_flag() {
        let st = AppState::fake();
        let (_, mut identity) = register(&st, student("ada@example.com", "19CS1234"))
            .await
            .unwrap();
        assert!(matches!(require_admin(&identity), Err(AppError::Forbidden)));
        identity.is_admin = true;
        assert!(require_admin(&identity).is_ok());
    }

    #[tokio::test]
    async fn profile_update_keeps_unset_fields_and_enforces_uniqueness() {
        let st = AppState::fake();
        let (_, ada) = register(&st, student("ada@example.com", "19CS1234")).await.unwrap();
        register(&st, student("bola@example.com", "19CS5678")).await.unwrap();

        let updated = update_profile(
            &st,
            &ada,
            UpdateProfileRequest {
                name: Some("Ada N. Obi".into()),
                department: Some("".into()),
                address: Some("Block C".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Ada N. Obi");
        assert_eq!(updated.department, "Computer Engineering");
        assert_eq!(updated.address.as_deref(), Some("Block C"));

        let err = update_profile(
            &st,
            &ada,
            UpdateProfileRequest {
                email: Some("bola@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let st = AppState::fake();
        let (_, ada) = register(&st, student("ada@example.com", "19CS1234")).await.unwrap();

        let err = update_password(
            &st,
            &ada,
            UpdatePasswordRequest {
                current_password: "wrong!!".into(),
                new_password: "newpass1".into(),
                confirm_password: "newpass1".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        update_password(
            &st,
            &ada,
            UpdatePasswordRequest {
                current_password: "secret1".into(),
                new_password: "newpass1".into(),
                confirm_password: "newpass1".into(),
            },
        )
        .await
        .unwrap();
        assert!(login(&st, "ada@example.com", "newpass1").await.is_ok());
        assert!(login(&st, "ada@example.com", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn get_user_reports_missing() {
        let st = AppState::fake();
        let err = get_user(&st, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
