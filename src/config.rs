use crate::misc::{checked_megabytes, megabytes};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Largest file the Bot API accepts in a single upload.
pub const UPLOAD_LIMIT: u64 = megabytes(50);

pub const WEBHOOK_PATH: &str = "webhook";

const DEFAULT_PORT: u16 = 10000;
const DEFAULT_WORKDIR: &str = "vidrelay-data";
const DEFAULT_FORMAT: &str = "best[height<=720]/best";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    Inconsistent(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub base_url: Option<Url>,
    pub webhook_secret: Option<String>,
    pub port: u16,
    pub workdir: PathBuf,
    pub limits: Limits,
    pub ytdlp: YtdlpConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_file_size: u64,
    pub premium_file_size: u64,
    pub chunk_size: u64,
}

impl Limits {
    pub const fn ceiling(&self, premium: bool) -> u64 {
        if premium { self.premium_file_size } else { self.max_file_size }
    }
}

#[derive(Debug, Clone)]
pub struct YtdlpConfig {
    /// Replaces the provisioned binary, e.g. `yt-dlp` from `PATH` or `python3 -m yt_dlp`.
    pub command: Option<Vec<String>>,
    pub format: String,
    pub timeout: Duration,
    pub cookies: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let token = get("TELEGRAM_BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let base_url = match get("RENDER_EXTERNAL_URL").or_else(|| get("WEBHOOK_URL")) {
            Some(value) => Some(parse_base_url(&value)?),
            None => None,
        };

        let webhook_secret = get("WEBHOOK_SECRET");
        if let Some(ref secret) = webhook_secret {
            validate_secret(secret)?;
        }

        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;
        let workdir = get("WORKDIR").map_or_else(|| PathBuf::from(DEFAULT_WORKDIR), PathBuf::from);

        let limits = Limits {
            max_file_size: parse_megabytes("MAX_FILE_SIZE_MB", get("MAX_FILE_SIZE_MB"), 50)?,
            premium_file_size: parse_megabytes("PREMIUM_FILE_SIZE_MB", get("PREMIUM_FILE_SIZE_MB"), 200)?,
            chunk_size: parse_megabytes("CHUNK_SIZE_MB", get("CHUNK_SIZE_MB"), 45)?,
        };
        validate_limits(&limits)?;

        let ytdlp = YtdlpConfig {
            command: get("YTDLP_COMMAND").map(|v| v.split_whitespace().map(str::to_owned).collect()),
            format: get("YTDLP_FORMAT").unwrap_or_else(|| DEFAULT_FORMAT.to_owned()),
            timeout: Duration::from_secs(parse_or("YTDLP_TIMEOUT_SECS", get("YTDLP_TIMEOUT_SECS"), 600)?),
            cookies: get("YTDL_COOKIES_FILE").map(PathBuf::from),
        };

        Ok(Self {
            token,
            base_url,
            webhook_secret,
            port,
            workdir,
            limits,
            ytdlp,
        })
    }

    /// Where Telegram should deliver updates, `None` means long polling.
    pub fn webhook_url(&self) -> Option<Url> {
        let base = self.base_url.as_ref()?;
        let joined = format!("{}/{WEBHOOK_PATH}", base.as_str().trim_end_matches('/'));
        Url::parse(&joined).ok()
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn parse_or<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Sizes are configured in megabytes but used in bytes.
fn parse_megabytes(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let mb = parse_or(key, value, default)?;
    checked_megabytes(mb).ok_or_else(|| ConfigError::Invalid {
        key,
        value: mb.to_string(),
    })
}
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: "RENDER_EXTERNAL_URL",
        value: value.to_owned(),
    };

    let url = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    Ok(url)
}

// Telegram allows 1-256 characters of A-Z, a-z, 0-9, `_` and `-`
fn validate_secret(secret: &str) -> Result<(), ConfigError> {
    let valid_chars = secret.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if secret.len() > 256 || !valid_chars {
        return Err(ConfigError::Invalid {
            key: "WEBHOOK_SECRET",
            value: secret.to_owned(),
        });
    }

    Ok(())
}

fn validate_limits(limits: &Limits) -> Result<(), ConfigError> {
    if limits.max_file_size == 0 {
        return Err(ConfigError::Inconsistent("MAX_FILE_SIZE_MB must be positive"));
    }
    if limits.premium_file_size < limits.max_file_size {
        return Err(ConfigError::Inconsistent("PREMIUM_FILE_SIZE_MB is below MAX_FILE_SIZE_MB"));
    }
    if limits.chunk_size == 0 || limits.chunk_size > UPLOAD_LIMIT {
        return Err(ConfigError::Inconsistent("CHUNK_SIZE_MB must be between 1 and 50"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("TELEGRAM_BOT_TOKEN"));
        assert_eq!(
            config(&[("TELEGRAM_BOT_TOKEN", "  ")]).unwrap_err(),
            ConfigError::Missing("TELEGRAM_BOT_TOKEN")
        );
    }

    #[test]
    fn defaults() {
        let config = config(&[("TELOXIDE_TOKEN", "123:abc")]).unwrap();

        assert_eq!(config.token, "123:abc");
        assert_eq!(config.port, 10000);
        assert_eq!(config.webhook_url(), None);
        assert_eq!(config.limits.ceiling(false), megabytes(50));
        assert_eq!(config.limits.ceiling(true), megabytes(200));
        assert_eq!(config.limits.chunk_size, megabytes(45));
        assert_eq!(config.ytdlp.format, "best[height<=720]/best");
        assert_eq!(config.ytdlp.timeout, Duration::from_secs(600));
        assert!(config.ytdlp.command.is_none());
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:10000");
    }

    #[test]
    fn webhook_url_is_built_from_base() {
        let config = config(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("RENDER_EXTERNAL_URL", "https://bot.onrender.com/"),
        ])
        .unwrap();

        assert_eq!(config.webhook_url().unwrap().as_str(), "https://bot.onrender.com/webhook");
    }

    #[test]
    fn webhook_url_keeps_base_path() {
        let config = config(&[("TELEGRAM_BOT_TOKEN", "t"), ("WEBHOOK_URL", "https://example.org/bots/video")]).unwrap();

        assert_eq!(config.webhook_url().unwrap().path(), "/bots/video/webhook");
    }

    #[test]
    fn invalid_values_are_reported() {
        assert_eq!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("PORT", "http")]).unwrap_err(),
            ConfigError::Invalid {
                key: "PORT",
                value: "http".to_owned()
            }
        );
        assert!(matches!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("RENDER_EXTERNAL_URL", "ftp://host")]),
            Err(ConfigError::Invalid { key: "RENDER_EXTERNAL_URL", .. })
        ));
        assert!(matches!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("WEBHOOK_SECRET", "has spaces!")]),
            Err(ConfigError::Invalid { key: "WEBHOOK_SECRET", .. })
        ));
    }

    #[test]
    fn oversized_limits_are_rejected() {
        assert_eq!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("PREMIUM_FILE_SIZE_MB", "18446744073709551615")]).unwrap_err(),
            ConfigError::Invalid {
                key: "PREMIUM_FILE_SIZE_MB",
                value: "18446744073709551615".to_owned()
            }
        );
        assert!(matches!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("MAX_FILE_SIZE_MB", "17592186044416")]),
            Err(ConfigError::Invalid { key: "MAX_FILE_SIZE_MB", .. })
        ));
    }

    #[test]
    fn limits_must_be_consistent() {
        assert!(matches!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("PREMIUM_FILE_SIZE_MB", "10")]),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("CHUNK_SIZE_MB", "51")]),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            config(&[("TELEGRAM_BOT_TOKEN", "t"), ("CHUNK_SIZE_MB", "0")]),
            Err(ConfigError::Inconsistent(_))
        ));
    }

    #[test]
    fn ytdlp_command_is_split_into_words() {
        let config = config(&[("TELEGRAM_BOT_TOKEN", "t"), ("YTDLP_COMMAND", "python3 -m yt_dlp")]).unwrap();

        assert_eq!(config.ytdlp.command.unwrap(), ["python3", "-m", "yt_dlp"]);
    }
}
