use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Root of everything the API writes to disk. Served under `/uploads`.
    pub uploads_dir: PathBuf,
    pub max_avatar_bytes: usize,
    pub avatar_generate_sizes: bool,
    pub avatar_convert_to_webp: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            uploads_dir: std::env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            max_avatar_bytes: parse_env("MAX_AVATAR_BYTES", DEFAULT_MAX_AVATAR_BYTES)
                .context("MAX_AVATAR_BYTES must be a byte count")?,
            avatar_generate_sizes: parse_flag("AVATAR_GENERATE_SIZES", true)?,
            avatar_convert_to_webp: parse_flag("AVATAR_CONVERT_TO_WEBP", true)?,
        })
    }

    /// Directory holding avatar variant families.
    pub fn avatars_dir(&self) -> PathBuf {
        self.uploads_dir.join("avatars")
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value for '{key}': {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw)
            .with_context(|| format!("'{key}' must be true/false, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_avatars_dir() {
        let config = Config {
            port: 8080,
            rust_log: "info".to_string(),
            uploads_dir: PathBuf::from("/srv/uploads"),
            max_avatar_bytes: DEFAULT_MAX_AVATAR_BYTES,
            avatar_generate_sizes: true,
            avatar_convert_to_webp: true,
        };
        assert_eq!(config.avatars_dir(), PathBuf::from("/srv/uploads/avatars"));
    }
}
