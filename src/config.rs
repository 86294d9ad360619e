use std::{env, path::PathBuf};

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Shared secret expected in `x-ota-admin-token`
  pub admin_token: Option<String>,
  /// Secret used to sign artifact URLs
  pub signing_key: Option<String>,
  pub public_url: String,
  pub bucket: String,
  pub storage_dir: PathBuf,
  pub download_ttl: Duration,
  pub upload_ttl: Duration,
  pub allowed_origins: Vec<String>,
  /// How many recent catalog rows a check considers
  pub candidate_limit: u64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:ota.db?mode=rwc"),
      port: 3000,
      admin_token: None,
      signing_key: None,
      public_url: String::from("http://localhost:3000"),
      bucket: String::from("ota-bundles"),
      storage_dir: PathBuf::from("./storage"),
      download_ttl: Duration::from_secs(3600),
      upload_ttl: Duration::from_secs(2 * 3600),
      allowed_origins: Vec::new(),
      candidate_limit: 100,
    }
  }
}

/// Reads trimmed, non-empty values through `lookup`.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
  fn get(&self, key: &str) -> Option<String> {
    (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
  }

  fn duration(&self, key: &str, default: Duration) -> anyhow::Result<Duration> {
    match self.get(key) {
      Some(raw) => humantime::parse_duration(&raw)
        .with_context(|| format!("Invalid duration in {key}: `{raw}`")),
      None => Ok(default),
    }
  }

  fn number<T>(&self, key: &str, default: T) -> anyhow::Result<T>
  where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
  {
    match self.get(key) {
      Some(raw) => raw
        .parse()
        .with_context(|| format!("Invalid number in {key}: `{raw}`")),
      None => Ok(default),
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let config = Self::from_lookup(|key| env::var(key).ok())?;

    if config.admin_token.is_none() {
      warn!("OTA_ADMIN_TOKEN not set, admin actions will be rejected");
    }
    if config.signing_key.is_none() {
      warn!("OTA_SIGNING_KEY not set, artifact URLs cannot be issued");
    }

    Ok(config)
  }

  fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> anyhow::Result<Self> {
    let vars = Vars(lookup);
    let default = Self::default();

    Ok(Self {
      database_url: vars.get("DATABASE_URL").unwrap_or(default.database_url),
      port: vars.number("PORT", default.port)?,
      admin_token: vars.get("OTA_ADMIN_TOKEN"),
      signing_key: vars.get("OTA_SIGNING_KEY"),
      public_url: vars
        .get("OTA_PUBLIC_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or(default.public_url),
      bucket: vars.get("OTA_BUCKET").unwrap_or(default.bucket),
      storage_dir: vars
        .get("OTA_STORAGE_DIR")
        .map(PathBuf::from)
        .unwrap_or(default.storage_dir),
      download_ttl: vars.duration("OTA_DOWNLOAD_TTL", default.download_ttl)?,
      upload_ttl: vars.duration("OTA_UPLOAD_TTL", default.upload_ttl)?,
      allowed_origins: vars
        .get("OTA_ALLOWED_ORIGINS")
        .map(|origins| {
          origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
        })
        .unwrap_or_default(),
      candidate_limit: vars
        .number("OTA_CANDIDATE_LIMIT", default.candidate_limit)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
  }

  #[test]
  fn test_defaults() {
    let config = load(&[("OTA_ADMIN_TOKEN", "  "), ("PORT", "")]).unwrap();

    assert_eq!(config.database_url, "sqlite:ota.db?mode=rwc");
    assert_eq!(config.port, 3000);
    assert_eq!(config.admin_token, None);
    assert_eq!(config.signing_key, None);
    assert_eq!(config.public_url, "http://localhost:3000");
    assert_eq!(config.bucket, "ota-bundles");
    assert_eq!(config.download_ttl, Duration::from_secs(3600));
    assert_eq!(config.upload_ttl, Duration::from_secs(7200));
    assert!(config.allowed_origins.is_empty());
    assert_eq!(config.candidate_limit, 100);
  }

  #[test]
  fn test_overrides() {
    let config = load(&[
      ("PORT", "8080"),
      ("OTA_ADMIN_TOKEN", " admin "),
      ("OTA_PUBLIC_URL", "https://ota.example.com//"),
      ("OTA_ALLOWED_ORIGINS", "https://a.example, ,https://b.example,"),
      ("OTA_DOWNLOAD_TTL", "15m"),
      ("OTA_CANDIDATE_LIMIT", "25"),
    ])
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.admin_token.as_deref(), Some("admin"));
    assert_eq!(config.public_url, "https://ota.example.com");
    assert_eq!(
      config.allowed_origins,
      ["https://a.example", "https://b.example"]
    );
    assert_eq!(config.download_ttl, Duration::from_secs(15 * 60));
    assert_eq!(config.candidate_limit, 25);
  }

  #[test]
  fn test_malformed_values_abort() {
    let err = load(&[("OTA_DOWNLOAD_TTL", "soon")]).unwrap_err();
    assert!(err.to_string().contains("OTA_DOWNLOAD_TTL"), "{err}");

    assert!(load(&[("PORT", "http")]).is_err());
    assert!(load(&[("OTA_CANDIDATE_LIMIT", "-1")]).is_err());
  }
}
