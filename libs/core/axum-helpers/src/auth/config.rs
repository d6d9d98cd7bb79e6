use core_config::{ConfigError, FromEnv, env_parse_or_default, env_required};

pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// JWT signing configuration.
///
/// - `JWT_SECRET` (required, at least 32 characters)
/// - `ACCESS_TOKEN_EXPIRE_MINUTES` (default 30)
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_minutes: i64,
}

impl JwtConfig {
    /// # Panics
    /// Panics if the secret is shorter than 32 characters.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        assert!(
            secret.len() >= 32,
            "JWT secret must be at least 32 characters"
        );
        Self {
            secret,
            access_token_minutes: DEFAULT_ACCESS_TOKEN_MINUTES,
        }
    }

    pub fn with_access_token_minutes(mut self, minutes: i64) -> Self {
        self.access_token_minutes = minutes;
        self
    }
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = env_required("JWT_SECRET")?;

        if secret.len() < 32 {
            return Err(ConfigError::ParseError {
                key: "JWT_SECRET".to_string(),
                details: format!(
                    "must be at least 32 characters (got {}). Generate one with: openssl rand -base64 32",
                    secret.len()
                ),
            });
        }

        let access_token_minutes =
            env_parse_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", DEFAULT_ACCESS_TOKEN_MINUTES)?;
        if access_token_minutes <= 0 {
            return Err(ConfigError::ParseError {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                details: "must be positive".to_string(),
            });
        }

        Ok(Self {
            secret,
            access_token_minutes,
        })
    }
}
