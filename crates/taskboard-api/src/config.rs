use anyhow::{bail, Result};
use serde::Deserialize;

const DEV_JWT_SECRET: &str = "taskboard-dev-secret-change-me";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server settings, read from defaults then `TASKBOARD_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub init_schema: bool,
    pub jwt_secret: Option<String>,
    pub token_ttl_minutes: i64,
    pub max_export_rows: usize,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000_i64)?
            .set_default("db_max_connections", 5_i64)?
            .set_default("init_schema", true)?
            .set_default("token_ttl_minutes", 60_i64 * 24)?
            .set_default("max_export_rows", 10_000_i64)?
            .set_default("log_format", "pretty")?
            .add_source(config::Environment::with_prefix("TASKBOARD"))
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        // The conventional unprefixed variable is honoured as a fallback.
        if settings.database_url.is_none() {
            settings.database_url = std::env::var("DATABASE_URL").ok();
        }

        Ok(settings)
    }

    /// Release builds refuse to start without a configured secret.
    pub fn jwt_secret(&self) -> Result<String> {
        match self.jwt_secret {
            Some(ref secret) if !secret.trim().is_empty() => Ok(secret.clone()),
            _ if cfg!(debug_assertions) => {
                tracing::warn!("TASKBOARD_JWT_SECRET not set, using the development secret");
                Ok(DEV_JWT_SECRET.to_string())
            }
            _ => bail!("TASKBOARD_JWT_SECRET must be set"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            db_max_connections: 5,
            init_schema: true,
            jwt_secret: None,
            token_ttl_minutes: 60 * 24,
            max_export_rows: 10_000,
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_secret_wins() {
        let settings = Settings {
            jwt_secret: Some("s3cret".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.jwt_secret().unwrap(), "s3cret");
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_blank_secret_is_unset() {
        let settings = Settings {
            jwt_secret: Some("   ".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.jwt_secret().unwrap(), DEV_JWT_SECRET);
    }
}
