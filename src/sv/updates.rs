//! Client update checks and release publishing on top of the catalog and
//! the artifact store.

use json::Value;
use serde::Serialize;

use crate::{
  auth::Admin,
  config::Config,
  entity::{Channel, Platform, release},
  ota,
  prelude::*,
  storage::{self, ArtifactStore},
  sv::{self, release::NewRelease},
};

pub const NO_VERSION: &str = "0.0.0";

#[derive(Debug, Clone)]
pub struct CheckQuery {
  pub channel: Channel,
  pub platform: Platform,
  pub current_bundle: String,
  pub native_version: Option<String>,
  pub device_id: String,
}

/// A release handed to a device together with where to fetch it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
  pub id: i32,
  pub channel: Channel,
  pub platform: Platform,
  pub bundle_version: String,
  pub checksum: Option<String>,
  pub mandatory: bool,
  pub file_path: String,
  pub download_url: String,
  pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
  pub bucket: String,
  pub file_path: String,
  pub token: String,
  pub signed_url: String,
}

pub fn bundle_path(channel: Channel, bundle_version: &str) -> String {
  format!("{channel}/{bundle_version}/dist.zip")
}

pub struct Updates<'a> {
  db: &'a DatabaseConnection,
  store: &'a dyn ArtifactStore,
  config: &'a Config,
}

impl<'a> Updates<'a> {
  pub fn new(
    db: &'a DatabaseConnection,
    store: &'a dyn ArtifactStore,
    config: &'a Config,
  ) -> Self {
    Self { db, store, config }
  }

  fn catalog(&self) -> sv::Release<'a> {
    sv::Release::new(self.db)
  }

  pub async fn check(&self, query: &CheckQuery) -> Result<Option<Offer>> {
    let candidates = self
      .catalog()
      .recent(query.channel, query.platform, self.config.candidate_limit)
      .await?;

    let Some(release) = ota::resolve(
      &candidates,
      &query.current_bundle,
      query.native_version.as_deref(),
      &query.device_id,
    ) else {
      debug!(
        "No update for {} on {}/{} ({} candidates)",
        query.current_bundle,
        query.channel,
        query.platform,
        candidates.len()
      );
      return Ok(None);
    };

    let download_url = self
      .store
      .sign_download(&release.file_path, self.config.download_ttl)
      .await?;

    debug!(
      "Offering {} over {} on {}/{}",
      release.bundle_version,
      query.current_bundle,
      query.channel,
      query.platform
    );

    Ok(Some(Offer {
      id: release.id,
      channel: release.channel,
      platform: release.platform,
      bundle_version: release.bundle_version.clone(),
      checksum: release.checksum.clone(),
      mandatory: release.mandatory,
      file_path: release.file_path.clone(),
      download_url,
      metadata: release.metadata.clone(),
    }))
  }

  pub async fn create_upload_url(
    &self,
    _: &Admin,
    channel: Channel,
    bundle_version: &str,
  ) -> Result<UploadTicket> {
    if bundle_version.is_empty() {
      return Err(Error::validation("bundleVersion is required"));
    }

    let file_path = bundle_path(channel, bundle_version);
    if !storage::is_valid_key(&file_path) {
      let message = format!("Invalid bundleVersion: {bundle_version}");
      return Err(Error::validation(message));
    }

    let upload = self.store.sign_upload(&file_path).await?;

    info!("Issued upload URL for `{file_path}`");

    Ok(UploadTicket {
      bucket: self.store.bucket().to_string(),
      file_path,
      token: upload.token,
      signed_url: upload.url,
    })
  }

  pub async fn publish(
    &self,
    _: &Admin,
    new: NewRelease,
  ) -> Result<release::Model> {
    if new.bundle_version.is_empty() || new.file_path.is_empty() {
      return Err(Error::validation("bundleVersion and filePath are required"));
    }

    let release = self.catalog().create(new).await?;

    info!(
      "Published release #{} {} on {}/{} (rollout {}%, enabled: {})",
      release.id,
      release.bundle_version,
      release.channel,
      release.platform,
      release.rollout_percent,
      release.enabled
    );

    Ok(release)
  }

  pub async fn latest_version(
    &self,
    _: &Admin,
    channel: Channel,
    platform: Platform,
  ) -> Result<String> {
    let latest = self.catalog().latest(channel, platform).await?;
    Ok(latest.map_or_else(|| NO_VERSION.to_string(), |r| r.bundle_version))
  }
}
