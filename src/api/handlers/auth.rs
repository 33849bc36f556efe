use super::{ok, payload, required, ApiResult, ErrorBody, SessionBody};
use crate::service::CredentialService;
use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct Credentials {
    login: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

#[utoipa::path(
    post,
    path= "/sign_up",
    request_body = Credentials,
    responses (
        (status = 200, description = "Identity created, first session returned in `data`", body = SessionBody),
        (status = 400, description = "Missing login or password", body = ErrorBody),
        (status = 409, description = "Login already exists", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(service, body))]
pub async fn sign_up(
    Extension(service): Extension<CredentialService>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<SessionBody> {
    let credentials = payload(body)?;
    let login = required(&credentials.login, "login")?;
    let password = required(&credentials.password, "password")?;

    let session = service.register(&login, &password).await?;

    ok(session.into())
}

#[utoipa::path(
    post,
    path= "/sign_in",
    request_body = Credentials,
    responses (
        (status = 200, description = "New session returned in `data`", body = SessionBody),
        (status = 400, description = "Missing login or password", body = ErrorBody),
        (status = 401, description = "Wrong password", body = ErrorBody),
        (status = 404, description = "Unknown login", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(service, body))]
pub async fn sign_in(
    Extension(service): Extension<CredentialService>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<SessionBody> {
    let credentials = payload(body)?;
    let login = required(&credentials.login, "login")?;
    let password = required(&credentials.password, "password")?;

    let session = service.authenticate(&login, &password).await?;

    ok(session.into())
}
