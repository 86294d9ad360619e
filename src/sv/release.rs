use json::Value;

use crate::{
  entity::{Channel, Platform, release},
  prelude::*,
};

/// Fields of a release row that the publisher chooses.
#[derive(Debug, Clone)]
pub struct NewRelease {
  pub channel: Channel,
  pub platform: Platform,
  pub bundle_version: String,
  pub file_path: String,
  pub checksum: Option<String>,
  pub mandatory: bool,
  pub enabled: bool,
  pub rollout_percent: i32,
  pub native_min_version: Option<String>,
  pub native_max_version: Option<String>,
  pub metadata: Value,
}

/// Append-only release catalog.
pub struct Release<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Release<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, new: NewRelease) -> Result<release::Model> {
    let now = Utc::now().naive_utc();

    let release = release::ActiveModel {
      id: NotSet,
      channel: Set(new.channel),
      platform: Set(new.platform),
      bundle_version: Set(new.bundle_version),
      file_path: Set(new.file_path),
      checksum: Set(new.checksum),
      mandatory: Set(new.mandatory),
      enabled: Set(new.enabled),
      rollout_percent: Set(new.rollout_percent),
      native_min_version: Set(new.native_min_version),
      native_max_version: Set(new.native_max_version),
      metadata: Set(new.metadata),
      created_at: Set(now),
    };

    Ok(release.insert(self.db).await?)
  }

  fn enabled_for(
    channel: Channel,
    platform: Platform,
  ) -> sea_orm::Select<release::Entity> {
    release::Entity::find()
      .filter(release::Column::Enabled.eq(true))
      .filter(release::Column::Channel.eq(channel))
      .filter(release::Column::Platform.is_in([platform, Platform::All]))
      .order_by_desc(release::Column::CreatedAt)
      .order_by_desc(release::Column::Id)
  }

  /// Most recent enabled releases visible to `platform` on `channel`,
  /// newest first.
  pub async fn recent(
    &self,
    channel: Channel,
    platform: Platform,
    limit: u64,
  ) -> Result<Vec<release::Model>> {
    let releases = Self::enabled_for(channel, platform)
      .limit(limit)
      .all(self.db)
      .await?;
    Ok(releases)
  }

  /// Newest enabled release by creation time, not by version.
  pub async fn latest(
    &self,
    channel: Channel,
    platform: Platform,
  ) -> Result<Option<release::Model>> {
    let release = Self::enabled_for(channel, platform).one(self.db).await?;
    Ok(release)
  }
}
