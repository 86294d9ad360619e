use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use futures::{Stream, StreamExt};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use super::{ArtifactStore, SignedUpload, is_valid_key};
use crate::{config::Config, prelude::*};

const KEY_CONTEXT: &str = "ota-server 2026-10-19 artifact url signatures";

#[derive(Debug, Clone)]
struct Grant {
  file_path: String,
  /// Unix milliseconds
  expires_at: i64,
}

/// Filesystem-backed store rooted at `<storage_dir>/<bucket>`.
pub struct LocalStore {
  root: PathBuf,
  bucket: String,
  public_url: String,
  key: Option<[u8; 32]>,
  upload_ttl: Duration,
  uploads: DashMap<String, Grant>,
}

impl LocalStore {
  pub fn new(config: &Config) -> Self {
    Self {
      root: config.storage_dir.join(&config.bucket),
      bucket: config.bucket.clone(),
      public_url: config.public_url.clone(),
      key: config
        .signing_key
        .as_deref()
        .map(|secret| blake3::derive_key(KEY_CONTEXT, secret.as_bytes())),
      upload_ttl: config.upload_ttl,
      uploads: DashMap::new(),
    }
  }

  fn key(&self) -> Result<&[u8; 32]> {
    self.key.as_ref().ok_or(Error::Config("OTA_SIGNING_KEY"))
  }

  /// Maps an object key onto the filesystem, rejecting anything that could
  /// escape the bucket or would need escaping inside a URL.
  pub fn object_path(&self, file_path: &str) -> Result<PathBuf> {
    if !is_valid_key(file_path) {
      return Err(Error::storage(format!("Invalid object key: {file_path}")));
    }
    Ok(self.root.join(file_path))
  }

  fn signature(key: &[u8; 32], file_path: &str, expires: i64) -> blake3::Hash {
    blake3::keyed_hash(key, format!("{file_path}\n{expires}").as_bytes())
  }

  /// Checks a download signature and returns where the object lives.
  pub fn verify_download(
    &self,
    file_path: &str,
    expires: i64,
    signature: &str,
  ) -> Result<PathBuf> {
    let key = self.key()?;
    if expires < Utc::now().timestamp() {
      return Err(Error::Forbidden);
    }

    let provided: [u8; 32] = URL_SAFE_NO_PAD
      .decode(signature)
      .ok()
      .and_then(|bytes| bytes.try_into().ok())
      .ok_or(Error::Forbidden)?;

    // blake3::Hash equality is constant time
    if blake3::Hash::from_bytes(provided)
      != Self::signature(key, file_path, expires)
    {
      return Err(Error::Forbidden);
    }

    self.object_path(file_path).map_err(|_| Error::Forbidden)
  }

  /// Writes an object using a grant from [`ArtifactStore::sign_upload`].
  /// The grant is consumed even when the write fails.
  pub async fn put<S, B, E>(
    &self,
    file_path: &str,
    token: &str,
    body: S,
  ) -> Result<u64>
  where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
  {
    let now = Utc::now().timestamp_millis();
    let (_, grant) = self
      .uploads
      .remove_if(token, |_, grant| grant.file_path == file_path)
      .ok_or(Error::Unauthorized)?;
    if grant.expires_at <= now {
      return Err(Error::Unauthorized);
    }

    let path = self.object_path(file_path)?;
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    let mut file = match fs::OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&path)
      .await
    {
      Ok(file) => file,
      Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
        let message = format!("Object already exists: {file_path}");
        return Err(Error::Conflict(message));
      }
      Err(err) => return Err(err.into()),
    };

    match copy_body(&mut file, body).await {
      Ok(written) => {
        file.flush().await?;
        info!("Stored object `{file_path}` ({written} bytes)");
        Ok(written)
      }
      Err(err) => {
        drop(file);
        let _ = fs::remove_file(&path).await;
        Err(err)
      }
    }
  }
}

async fn copy_body<S, B, E>(file: &mut fs::File, body: S) -> Result<u64>
where
  S: Stream<Item = std::result::Result<B, E>>,
  B: AsRef<[u8]>,
  E: std::fmt::Display,
{
  let mut body = std::pin::pin!(body);
  let mut written = 0u64;

  while let Some(chunk) = body.next().await {
    let chunk =
      chunk.map_err(|err| Error::storage(format!("Upload aborted: {err}")))?;
    file.write_all(chunk.as_ref()).await?;
    written += chunk.as_ref().len() as u64;
  }
  Ok(written)
}

#[async_trait]
impl ArtifactStore for LocalStore {
  fn bucket(&self) -> &str {
    &self.bucket
  }

  async fn sign_download(
    &self,
    file_path: &str,
    ttl: Duration,
  ) -> Result<String> {
    let key = self.key()?;
    let path = self.object_path(file_path)?;
    if !fs::try_exists(&path).await? {
      return Err(Error::storage(format!("Object not found: {file_path}")));
    }

    let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
    let signature = Self::signature(key, file_path, expires);
    let signature = URL_SAFE_NO_PAD.encode(signature.as_bytes());

    Ok(format!(
      "{}/api/artifacts/{file_path}?expires={expires}&signature={signature}",
      self.public_url
    ))
  }

  async fn sign_upload(&self, file_path: &str) -> Result<SignedUpload> {
    self.key()?;
    let path = self.object_path(file_path)?;
    if fs::try_exists(&path).await? {
      let message = format!("Object already exists: {file_path}");
      return Err(Error::storage(message));
    }

    let token = Uuid::new_v4().simple().to_string();
    let expires_at =
      Utc::now().timestamp_millis() + self.upload_ttl.as_millis() as i64;
    self.uploads.insert(
      token.clone(),
      Grant { file_path: file_path.to_string(), expires_at },
    );

    let url =
      format!("{}/api/uploads/{file_path}?token={token}", self.public_url);
    Ok(SignedUpload { token, url })
  }

  fn purge_expired(&self) -> usize {
    let now = Utc::now().timestamp_millis();
    let before = self.uploads.len();
    self.uploads.retain(|_, grant| grant.expires_at > now);
    before.saturating_sub(self.uploads.len())
  }
}
