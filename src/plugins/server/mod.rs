mod artifacts;
mod handlers;

use std::{net::SocketAddr, sync::Arc};

use axum::{
  Router,
  http::{HeaderName, HeaderValue, Method, header},
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{AllowOrigin, Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{auth::ADMIN_TOKEN_HEADER, prelude::*, state::AppState};

pub const DEVICE_ID_HEADER: &str = "x-device-id";

fn cors(origins: &[String]) -> CorsLayer {
  let layer = CorsLayer::new()
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
    .allow_headers([
      header::AUTHORIZATION,
      header::CONTENT_TYPE,
      HeaderName::from_static(DEVICE_ID_HEADER),
      HeaderName::from_static(ADMIN_TOKEN_HEADER),
    ]);

  if origins.is_empty() {
    return layer.allow_origin(Any);
  }

  let origins = origins.iter().filter_map(|origin| {
    HeaderValue::from_str(origin)
      .inspect_err(|_| warn!("Ignoring invalid CORS origin `{origin}`"))
      .ok()
  });
  layer.allow_origin(AllowOrigin::list(origins))
}

pub fn router(app: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/ota", post(handlers::ota))
    .route("/api/artifacts/{*path}", get(artifacts::download))
    .route("/api/uploads/{*path}", put(artifacts::upload))
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors(&app.config.allowed_origins)),
    )
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  fn name(&self) -> &'static str {
    "http"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));
    let router = router(app)
      .layer(GovernorLayer::new(governor_conf))
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
            Ok(_) => info!("Server stopped gracefully"),
            Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt;

  use super::*;
  use crate::{config::Config, sv::release::tests::setup_test_db};

  async fn preflight(
    allowed_origins: &[&str],
    origin: &str,
  ) -> axum::response::Response {
    let config = Config {
      allowed_origins: allowed_origins.iter().map(|o| o.to_string()).collect(),
      ..Config::default()
    };
    let state = Arc::new(AppState::with_parts(setup_test_db().await, config));

    let request = Request::builder()
      .method(Method::OPTIONS)
      .uri("/api/ota")
      .header(header::ORIGIN, origin)
      .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
      .header(header::ACCESS_CONTROL_REQUEST_HEADERS, ADMIN_TOKEN_HEADER)
      .body(Body::empty())
      .unwrap();
    router(state).oneshot(request).await.unwrap()
  }

  #[tokio::test]
  async fn test_preflight_any_origin() {
    let resp = preflight(&[], "https://app.example").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
      .to_str()
      .unwrap()
      .to_string();
    assert!(methods.contains("POST"), "{methods}");
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
      .to_str()
      .unwrap()
      .to_string();
    assert!(allowed.contains(ADMIN_TOKEN_HEADER), "{allowed}");
  }

  #[tokio::test]
  async fn test_preflight_configured_origins() {
    let origins = ["https://app.example", "https://admin.example"];

    let resp = preflight(&origins, "https://admin.example").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
      "https://admin.example"
    );

    let resp = preflight(&origins, "https://evil.example").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
  }
}
