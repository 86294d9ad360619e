use std::sync::Arc;

use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use json::{Value, json};
use serde::{Deserialize, de::DeserializeOwned};

use super::DEVICE_ID_HEADER;
use crate::{
  auth::{self, Admin},
  entity::{Channel, Platform},
  ota::rollout,
  prelude::*,
  state::AppState,
  sv::{
    release::NewRelease,
    updates::{CheckQuery, NO_VERSION},
  },
};

const ANONYMOUS_DEVICE: &str = "anonymous";

/// Absent and empty strings both fall back to defaults.
fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|s| !s.is_empty())
}

fn channel_or_default(raw: Option<String>) -> Result<Channel> {
  non_empty(raw).map_or(Ok(Channel::default()), |raw| {
    raw.parse().map_err(Error::Validation)
  })
}

fn platform_or_default(raw: Option<String>) -> Result<Platform> {
  non_empty(raw).map_or(Ok(Platform::default()), |raw| {
    raw.parse().map_err(Error::Validation)
  })
}

fn fields<T: DeserializeOwned>(body: Value) -> Result<T> {
  json::from_value(body)
    .map_err(|err| Error::validation(format!("Invalid request body: {err}")))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|value| value.to_str().ok())
    .filter(|value| !value.is_empty())
}

/// Accepts JSON numbers and numeric strings.
fn numeric(value: Option<&Value>) -> Option<f64> {
  match value? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReq {
  pub channel: Option<String>,
  pub platform: Option<String>,
  pub current_bundle: Option<String>,
  pub native_version: Option<String>,
  pub device_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlReq {
  pub channel: Option<String>,
  pub bundle_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReq {
  pub channel: Option<String>,
  pub platform: Option<String>,
  pub bundle_version: Option<String>,
  pub file_path: Option<String>,
  pub checksum: Option<String>,
  pub mandatory: Option<Value>,
  pub enabled: Option<Value>,
  pub rollout_percent: Option<Value>,
  pub native_min_version: Option<String>,
  pub native_max_version: Option<String>,
  pub metadata: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestVersionReq {
  pub channel: Option<String>,
  pub platform: Option<String>,
}

impl PublishReq {
  fn into_release(self) -> Result<NewRelease> {
    let metadata = match self.metadata {
      None | Some(Value::Null) => json!({}),
      Some(object @ Value::Object(_)) => object,
      Some(_) => return Err(Error::validation("metadata must be an object")),
    };

    Ok(NewRelease {
      channel: channel_or_default(self.channel)?,
      platform: platform_or_default(self.platform)?,
      bundle_version: self.bundle_version.unwrap_or_default(),
      file_path: self.file_path.unwrap_or_default(),
      checksum: non_empty(self.checksum),
      mandatory: self.mandatory == Some(Value::Bool(true)),
      enabled: self.enabled != Some(Value::Bool(false)),
      rollout_percent: rollout::clamp_percent(numeric(
        self.rollout_percent.as_ref(),
      )),
      native_min_version: non_empty(self.native_min_version),
      native_max_version: non_empty(self.native_max_version),
      metadata,
    })
  }
}

/// Single JSON endpoint, dispatched on the `action` field.
pub async fn ota(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Response> {
  let body: Value = if body.trim_ascii().is_empty() {
    json!({})
  } else {
    json::from_slice(&body)
      .map_err(|err| Error::validation(format!("Invalid JSON body: {err}")))?
  };
  if !body.is_object() {
    return Err(Error::validation("Request body must be a JSON object"));
  }

  let action = match body.get("action") {
    None | Some(Value::Null) => "check".to_string(),
    Some(Value::String(action)) if action.is_empty() => "check".to_string(),
    Some(Value::String(action)) => action.clone(),
    Some(other) => return Err(Error::UnknownAction(other.to_string())),
  };

  if action == "check" {
    return check(&app, &headers, fields(body)?).await;
  }

  let is_admin_action =
    matches!(action.as_str(), "createUploadUrl" | "publish" | "latestVersion");
  if !is_admin_action {
    return Err(Error::UnknownAction(action));
  }
  let admin = auth::authorize(app.config.admin_token.as_deref(), &headers)?;

  match action.as_str() {
    "createUploadUrl" => {
      create_upload_url(&app, &admin, fields(body)?).await
    }
    "publish" => publish(&app, &admin, fields(body)?).await,
    _ => latest_version(&app, &admin, fields(body)?).await,
  }
}

async fn check(
  app: &AppState,
  headers: &HeaderMap,
  req: CheckReq,
) -> Result<Response> {
  let no_update = || Json(json!({ "updateAvailable": false })).into_response();

  let (Ok(channel), Ok(platform)) =
    (channel_or_default(req.channel), platform_or_default(req.platform))
  else {
    debug!("Check for unknown channel or platform, no update");
    return Ok(no_update());
  };

  let device_id = non_empty(req.device_id)
    .or_else(|| header_str(headers, DEVICE_ID_HEADER).map(String::from))
    .unwrap_or_else(|| ANONYMOUS_DEVICE.to_string());

  let query = CheckQuery {
    channel,
    platform,
    current_bundle: non_empty(req.current_bundle)
      .unwrap_or_else(|| NO_VERSION.to_string()),
    native_version: non_empty(req.native_version),
    device_id,
  };

  Ok(match app.sv().updates.check(&query).await? {
    Some(offer) => {
      let body = json!({ "updateAvailable": true, "release": offer });
      Json(body).into_response()
    }
    None => no_update(),
  })
}

async fn create_upload_url(
  app: &AppState,
  admin: &Admin,
  req: UploadUrlReq,
) -> Result<Response> {
  let channel = channel_or_default(req.channel)?;
  let bundle_version = req.bundle_version.unwrap_or_default();

  let upload = app
    .sv()
    .updates
    .create_upload_url(admin, channel, &bundle_version)
    .await?;

  Ok(Json(json!({ "ok": true, "upload": upload })).into_response())
}

async fn publish(
  app: &AppState,
  admin: &Admin,
  req: PublishReq,
) -> Result<Response> {
  let new = req.into_release()?;
  let release = app.sv().updates.publish(admin, new).await?;

  let body = json!({
    "ok": true,
    "release": {
      "id": release.id,
      "channel": release.channel,
      "platform": release.platform,
      "bundle_version": release.bundle_version,
      "created_at": release.created_at,
    }
  });
  Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn latest_version(
  app: &AppState,
  admin: &Admin,
  req: LatestVersionReq,
) -> Result<Response> {
  let channel = channel_or_default(req.channel)?;
  let platform = platform_or_default(req.platform)?;

  let latest =
    app.sv().updates.latest_version(admin, channel, platform).await?;

  Ok(
    Json(json!({
      "ok": true,
      "latestVersion": latest,
      "channel": channel,
      "platform": platform,
    }))
    .into_response(),
  )
}

pub async fn health() -> &'static str {
  "OK"
}
