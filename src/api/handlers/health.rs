use crate::{service::CredentialService, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

const SHORT_COMMIT_LEN: usize = 7;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    /// Registered identities currently held in memory.
    users: usize,
}

impl Health {
    async fn collect(service: &CredentialService) -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            users: service.users().len().await,
        }
    }

    /// `X-App: <name>:<version>:<short commit>`, left out when it is not a
    /// valid header value.
    fn app_header(&self) -> HeaderMap {
        let short_commit = self.commit.get(..SHORT_COMMIT_LEN).unwrap_or_default();
        let mut headers = HeaderMap::new();

        match HeaderValue::from_str(&format!("{}:{}:{short_commit}", self.name, self.version)) {
            Ok(value) => {
                headers.insert("X-App", value);
            }
            Err(err) => error!("Failed to build X-App header: {}", err),
        }

        headers
    }
}

#[utoipa::path(
    get,
    path= "/ping",
    responses (
        (status = 200, description = "Liveness probe", body = String, content_type = "text/plain"),
    ),
    tag= "health"
)]
pub async fn ping() -> &'static str {
    "pong"
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Build info and identity count", body = Health),
    ),
    tag= "health"
)]
pub async fn health(
    method: Method,
    Extension(service): Extension<CredentialService>,
) -> impl IntoResponse {
    let health = Health::collect(&service).await;
    let headers = health.app_header();

    if method == Method::OPTIONS {
        return (headers, Body::empty().into_response());
    }

    (headers, Json(health).into_response())
}
