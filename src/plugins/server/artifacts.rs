//! Blob endpoints behind the signed URLs handed out by the local store.

use std::{path::Path as FsPath, sync::Arc};

use axum::{
  Json,
  body::Body,
  extract::{Path, Query, State},
  http::header,
  response::IntoResponse,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::{prelude::*, state::AppState, storage::ArtifactStore};

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
  pub expires: i64,
  pub signature: String,
}

pub async fn download(
  State(app): State<Arc<AppState>>,
  Path(file_path): Path<String>,
  Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse> {
  let path =
    app.store.verify_download(&file_path, query.expires, &query.signature)?;

  let file = match tokio::fs::File::open(&path).await {
    Ok(file) => file,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
      return Err(Error::NotFound);
    }
    Err(err) => return Err(err.into()),
  };

  let filename = FsPath::new(&file_path)
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("dist.zip")
    .to_string();

  let body = Body::from_stream(ReaderStream::new(file));

  let headers = [
    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
    (
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"{filename}\""),
    ),
  ];

  Ok((headers, body))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
  pub token: String,
}

pub async fn upload(
  State(app): State<Arc<AppState>>,
  Path(file_path): Path<String>,
  Query(query): Query<UploadQuery>,
  body: Body,
) -> Result<impl IntoResponse> {
  let size =
    app.store.put(&file_path, &query.token, body.into_data_stream()).await?;

  Ok(Json(json::json!({
    "ok": true,
    "key": format!("{}/{file_path}", app.store.bucket()),
    "size": size,
  })))
}
