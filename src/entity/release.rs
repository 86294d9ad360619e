//! Release entity - one immutable, distributable bundle

use std::{fmt, str::FromStr};

use json::Value;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
  Copy,
  Clone,
  Debug,
  Default,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  #[default]
  #[sea_orm(string_value = "production")]
  Production,
  #[sea_orm(string_value = "beta")]
  Beta,
}

#[derive(
  Copy,
  Clone,
  Debug,
  Default,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  #[default]
  #[sea_orm(string_value = "all")]
  All,
  #[sea_orm(string_value = "android")]
  Android,
  #[sea_orm(string_value = "ios")]
  Ios,
}

impl Channel {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Production => "production",
      Self::Beta => "beta",
    }
  }
}

impl Platform {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::All => "all",
      Self::Android => "android",
      Self::Ios => "ios",
    }
  }
}

impl FromStr for Channel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "production" => Ok(Self::Production),
      "beta" => Ok(Self::Beta),
      _ => Err(format!("Unknown channel: {s}")),
    }
  }
}

impl FromStr for Platform {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "all" => Ok(Self::All),
      "android" => Ok(Self::Android),
      "ios" => Ok(Self::Ios),
      _ => Err(format!("Unknown platform: {s}")),
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "releases")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub channel: Channel,
  pub platform: Platform,
  pub bundle_version: String,
  /// Storage key of the bundle archive
  pub file_path: String,
  pub checksum: Option<String>,
  /// Advisory only, surfaced to clients
  pub mandatory: bool,
  pub enabled: bool,
  pub rollout_percent: i32,
  /// Inclusive bounds on the host application version
  pub native_min_version: Option<String>,
  pub native_max_version: Option<String>,
  pub metadata: Value,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
