//! Runtime settings read from the environment (`.env` is loaded by the binaries).

use anyhow::{anyhow, Context, Result};
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "pt-BR";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BIND: &str = "0.0.0.0:3146";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub language: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Missing required environment variable: TMDB_API_KEY"))?;
        let language = optional("TMDB_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let base_url = optional("TMDB_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let request_timeout = parse_timeout(optional("TMDB_TIMEOUT_SECS").as_deref())?;
        let data_dir = optional("CINEFAV_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let bind = optional("CINEFAV_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .context("CINEFAV_BIND must be a socket address like 0.0.0.0:3146")?;

        Ok(Self {
            api_key,
            language,
            base_url,
            request_timeout,
            data_dir,
            bind,
        })
    }
}

/// Seconds, clamped to 1..=300.
fn parse_timeout(raw: Option<&str>) -> Result<Duration> {
    let secs = match raw {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("TMDB_TIMEOUT_SECS is not a number: {raw}"))?,
        None => DEFAULT_TIMEOUT_SECS,
    };
    Ok(Duration::from_secs(secs.clamp(1, MAX_TIMEOUT_SECS)))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("cinefav");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_defaults_and_clamps() {
        assert_eq!(parse_timeout(None).unwrap(), Duration::from_secs(10));
        assert_eq!(parse_timeout(Some("30")).unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout(Some("0")).unwrap(), Duration::from_secs(1));
        let huge = u64::MAX.to_string();
        let clamped = parse_timeout(Some(&huge)).unwrap();
        assert_eq!(clamped, Duration::from_secs(300));
        // Adding the resolver's grace second must not overflow.
        assert!(clamped.checked_add(Duration::from_secs(1)).is_some());
        assert!(parse_timeout(Some("ten")).is_err());
    }
}
