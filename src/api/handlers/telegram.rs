use super::{
    chat_handle, ok, payload, valid_code, ApiError, ApiResult, Caller, ErrorBody, SessionBody,
};
use crate::{chat::ChatLogin, service::CredentialService};
use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BindTelegram {
    /// Telegram username, with or without the leading `@`.
    telegram_username: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginWithTelegram {
    telegram_username: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct ConfirmTelegramCode {
    telegram_username: String,
    /// 4-digit code received in the Telegram chat.
    code: String,
}

#[utoipa::path(
    post,
    path= "/bind_telegram",
    request_body = BindTelegram,
    params(
        ("User-ID" = String, Header, description = "Identity id"),
        ("Authorization" = String, Header, description = "Session token"),
    ),
    responses (
        (status = 200, description = "Handle linked; send /start to the bot next", body = String),
        (status = 400, description = "Missing username", body = ErrorBody),
        (status = 401, description = "Missing or foreign token", body = ErrorBody),
        (status = 404, description = "Identity no longer exists", body = ErrorBody),
    ),
    tag= "telegram"
)]
#[instrument(skip(service, body))]
pub async fn bind_telegram(
    caller: Caller,
    Extension(service): Extension<CredentialService>,
    body: Result<Json<BindTelegram>, JsonRejection>,
) -> ApiResult<String> {
    let handle = chat_handle(&payload(body)?.telegram_username)?;

    service.link_chat_handle(caller.id, &handle).await?;

    ok("telegram username linked".to_string())
}

#[utoipa::path(
    post,
    path= "/login_with_telegram",
    request_body = LoginWithTelegram,
    responses (
        (status = 200, description = "Code sent to the Telegram chat", body = String),
        (status = 400, description = "Missing username", body = ErrorBody),
        (status = 404, description = "No identity linked to this username", body = ErrorBody),
        (status = 422, description = "Chat not bound yet, /start was never sent", body = ErrorBody),
        (status = 502, description = "Telegram delivery failed", body = ErrorBody),
    ),
    tag= "telegram"
)]
#[instrument(skip(login, body))]
pub async fn login_with_telegram(
    Extension(login): Extension<ChatLogin>,
    body: Result<Json<LoginWithTelegram>, JsonRejection>,
) -> ApiResult<String> {
    let handle = chat_handle(&payload(body)?.telegram_username)?;

    login.request_code(&handle).await?;

    ok("code sent to the telegram chat".to_string())
}

#[utoipa::path(
    post,
    path= "/confirm_telegram_code",
    request_body = ConfirmTelegramCode,
    responses (
        (status = 200, description = "New session returned in `data`", body = SessionBody),
        (status = 400, description = "Missing username or malformed code", body = ErrorBody),
        (status = 401, description = "Wrong, expired or already used code", body = ErrorBody),
        (status = 404, description = "No identity linked to this username", body = ErrorBody),
    ),
    tag= "telegram"
)]
#[instrument(skip(login, body))]
pub async fn confirm_telegram_code(
    Extension(login): Extension<ChatLogin>,
    body: Result<Json<ConfirmTelegramCode>, JsonRejection>,
) -> ApiResult<SessionBody> {
    let input = payload(body)?;
    let handle = chat_handle(&input.telegram_username)?;
    let code = input.code.trim();

    if !valid_code(code) {
        return Err(ApiError::bad_request("code must be 4 digits"));
    }

    let session = login.confirm_code(&handle, code).await?;

    ok(session.into())
}
