//! Admin capability check.

use axum::http::HeaderMap;

use crate::prelude::*;

pub const ADMIN_TOKEN_HEADER: &str = "x-ota-admin-token";

/// Proof that the current request carried the admin secret. Operations that
/// mutate the catalog or mint upload URLs take it by reference, so they
/// cannot be reached without going through [`authorize`].
#[derive(Debug)]
pub struct Admin(());

pub fn authorize(secret: Option<&str>, headers: &HeaderMap) -> Result<Admin> {
  let secret = secret.ok_or(Error::Config("OTA_ADMIN_TOKEN"))?;

  let provided = headers
    .get(ADMIN_TOKEN_HEADER)
    .and_then(|value| value.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  // digests are compared in constant time and hide the secret length
  if blake3::hash(provided.as_bytes()) == blake3::hash(secret.as_bytes()) {
    Ok(Admin(()))
  } else {
    Err(Error::Unauthorized)
  }
}

#[cfg(test)]
impl Admin {
  pub(crate) fn trusted() -> Self {
    Admin(())
  }
}
