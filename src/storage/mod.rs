//! Artifact access: time-limited URLs for bundle uploads and downloads.

mod local;

pub use local::LocalStore;
use serde::Serialize;

use crate::prelude::*;

/// Whether `file_path` is an acceptable object key: `/`-separated segments of
/// `[A-Za-z0-9._+-]`, none empty, `.` or `..`. Such keys never need escaping
/// inside a URL path.
pub fn is_valid_key(file_path: &str) -> bool {
  file_path.split('/').all(|segment| {
    !segment.is_empty()
      && segment != "."
      && segment != ".."
      && segment.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')
      })
  })
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedUpload {
  pub token: String,
  pub url: String,
}

/// Blob store as seen by the update core. Implementations own the bytes;
/// the core only ever hands over object keys.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
  fn bucket(&self) -> &str;

  async fn sign_download(&self, file_path: &str, ttl: Duration)
  -> Result<String>;

  /// Issues a single-use grant to write `file_path`.
  async fn sign_upload(&self, file_path: &str) -> Result<SignedUpload>;

  /// Drops grants that expired unused, returning how many were removed.
  fn purge_expired(&self) -> usize {
    0
  }
}
