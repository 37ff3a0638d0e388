use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::constants::MAX_SESSION_HOURS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub jwt_secret: String,
    pub session_hours: i64,
    pub media_root: PathBuf,
}

impl Config {
    /// Reads the configuration from the environment, loading `.env` first when present.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::trace!("No .env file loaded: {e}");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: require(&lookup, "DATABASE_URL")?,
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            redis_url: try_load(&lookup, "REDIS_URL", "redis://127.0.0.1/")?,
            jwt_secret: require(&lookup, "JWT_SECRET")?,
            session_hours: session_hours(&lookup)?,
            media_root: try_load(&lookup, "MEDIA_ROOT", "media")?,
        })
    }
}

fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn session_hours<F>(lookup: &F) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let hours: i64 = try_load(lookup, "SESSION_HOURS", "24")?;
    if !(1..=MAX_SESSION_HOURS).contains(&hours) {
        return Err(ConfigError::Invalid {
            key: "SESSION_HOURS",
            reason: format!("must be between 1 and {MAX_SESSION_HOURS}"),
        });
    }
    Ok(hours)
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            log::warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("JWT_SECRET", "hunter2"),
        ]))
        .unwrap();

        assert_eq!(config.redis_url, "redis://127.0.0.1/");
        assert_eq!(config.session_hours, 24);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.media_root, PathBuf::from("media"));
    }

    #[test]
    fn session_hours_are_bounded() {
        for hours in ["0", "8761", "9223372036854775807"] {
            let result = Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://localhost/foodgram"),
                ("JWT_SECRET", "hunter2"),
                ("SESSION_HOURS", hours),
            ]));

            assert!(matches!(
                result,
                Err(ConfigError::Invalid {
                    key: "SESSION_HOURS",
                    ..
                })
            ));
        }
    }

    #[test]
    fn missing_secret_is_reported() {
        let result = Config::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/foodgram",
        )]));

        assert_eq!(result.unwrap_err(), ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("JWT_SECRET", "hunter2"),
            ("SESSION_HOURS", "a day"),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "SESSION_HOURS",
                ..
            })
        ));
    }
}
