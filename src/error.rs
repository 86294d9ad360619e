//! Error types for the OTA server

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Missing server configuration: {0}")]
  Config(&'static str),

  #[error("Unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Validation(String),

  #[error("Unknown action: {0}")]
  UnknownAction(String),

  #[error("{0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("{0}")]
  Storage(String),

  #[error("{0}")]
  Io(#[from] std::io::Error),

  #[error("Not found")]
  NotFound,

  #[error("Invalid or expired signature")]
  Forbidden,

  #[error("{0}")]
  Conflict(String),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn storage(message: impl ToString) -> Self {
    Self::Storage(message.to_string())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::Config(_)
      | Error::Database(_)
      | Error::Storage(_)
      | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Validation(_) | Error::UnknownAction(_) => StatusCode::BAD_REQUEST,
      Error::NotFound => StatusCode::NOT_FOUND,
      Error::Forbidden => StatusCode::FORBIDDEN,
      Error::Conflict(_) => StatusCode::CONFLICT,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("Request failed: {self}");
    }

    let body = json::json!({ "error": self.to_string() });
    (status, Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
