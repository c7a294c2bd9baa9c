use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context};

use crate::constants::{DEFAULT_PAGE_SIZE, DEFAULT_TOKEN_TTL_HOURS};

const DEVELOPMENT_SECRET_KEY: &str = "foodgram-development-secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub secret_key: String,
    pub token_ttl_hours: i64,
    pub media_root: PathBuf,
    pub media_url: String,
    pub page_size: i64,
    /// Catalog file loaded into the store when the server starts.
    pub fixtures: Option<PathBuf>,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8000,
            database_url: None,
            database_max_connections: 5,
            secret_key: DEVELOPMENT_SECRET_KEY.to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            media_root: PathBuf::from("media"),
            media_url: String::from("/media/"),
            page_size: DEFAULT_PAGE_SIZE,
            fixtures: None,
            debug: false,
        }
    }
}

impl Config {
    /// Reads the configuration from the environment; call `dotenv` first to honour `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let debug = matches!(
            env::var("DEBUG").as_deref().map(str::to_lowercase).as_deref(),
            Ok("1" | "true" | "yes")
        );

        let secret_key = match env::var("SECRET_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ if debug => defaults.secret_key,
            _ => bail!("SECRET_KEY must be set unless DEBUG is enabled"),
        };

        let mut media_url = env::var("MEDIA_URL").unwrap_or(defaults.media_url);
        if !media_url.ends_with('/') {
            media_url.push('/');
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            secret_key,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", defaults.token_ttl_hours)?,
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            media_url,
            page_size: parse_var("PAGE_SIZE", defaults.page_size)?,
            fixtures: env::var("FIXTURES")
                .ok()
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            debug,
        })
    }

    pub fn address(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    /// Single path segment the media files are served under, e.g. `media` for `/media/`
    /// or `https://example.com/media/`.
    pub fn media_path(&self) -> Option<&str> {
        let url = match self.media_url.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
            None => self.media_url.as_str(),
        };
        let path = url.trim_matches('/');
        if path.is_empty() || path.contains('/') {
            None
        } else {
            Some(path)
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .with_context(|| format!("Invalid value for {key}: {value}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_path_strips_slashes() {
        let config = Config::default();
        assert_eq!(config.media_path(), Some("media"));

        let absolute = Config {
            media_url: String::from("https://foodgram.example.com/media/"),
            ..Config::default()
        };
        assert_eq!(absolute.media_path(), Some("media"));

        let nested = Config {
            media_url: String::from("/static/media/"),
            ..Config::default()
        };
        assert_eq!(nested.media_path(), None);
    }

    #[test]
    fn default_address_parses() {
        let address = Config::default().address().unwrap();
        assert_eq!(address.port(), 8000);
    }
}
