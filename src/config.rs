use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 cost factors used when a password is set.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// No host means mail is logged instead of sent.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub mail: MailConfig,
    pub reset_code_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "exeat-pass".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "exeat-pass-users".into()),
            ttl_minutes: bounded_minutes(
                "JWT_TTL_MINUTES",
                env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24 * 7),
                MAX_TOKEN_TTL_MINUTES,
            )?,
        };
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_parse("PASSWORD_HASH_MEMORY_KIB").unwrap_or(defaults.memory_kib),
            iterations: env_parse("PASSWORD_HASH_ITERATIONS").unwrap_or(defaults.iterations),
        };
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty()),
            smtp_port: env_parse("SMTP_PORT").unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME").ok().filter(|v| !v.is_empty()),
            smtp_password: std::env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
            from_address: std::env::var("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "no-reply@exeat.local".into()),
            from_name: std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Exeat Office".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            password,
            mail,
            reset_code_ttl_minutes: bounded_minutes(
                "RESET_CODE_TTL_MINUTES",
                env_parse("RESET_CODE_TTL_MINUTES").unwrap_or(60),
                MAX_RESET_CODE_TTL_MINUTES,
            )?,
        })
    }
}

const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;
const MAX_RESET_CODE_TTL_MINUTES: i64 = 60 * 24;

/// Lifetimes feed timestamp arithmetic, so they must stay in `1..=max`.
fn bounded_minutes(key: &str, value: i64, max: i64) -> anyhow::Result<i64> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(anyhow::anyhow!("{value} is out of range"))
            .with_context(|| format!("{key} must be between 1 and {max} minutes"))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_are_range_checked() {
        assert_eq!(bounded_minutes("JWT_TTL_MINUTES", 10080, MAX_TOKEN_TTL_MINUTES).unwrap(), 10080);
        assert_eq!(bounded_minutes("RESET_CODE_TTL_MINUTES", 1, MAX_RESET_CODE_TTL_MINUTES).unwrap(), 1);

        for bad in [0, -5, i64::MAX] {
            let err = bounded_minutes("RESET_CODE_TTL_MINUTES", bad, MAX_RESET_CODE_TTL_MINUTES)
                .unwrap_err();
            assert!(err.to_string().contains("RESET_CODE_TTL_MINUTES"));
        }
        assert!(bounded_minutes("JWT_TTL_MINUTES", i64::MAX / 60, MAX_TOKEN_TTL_MINUTES).is_err());
    }
}
