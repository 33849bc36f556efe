use super::{ok, payload, required, ApiResult, Caller, ErrorBody};
use crate::{identity::UserInfo, service::CredentialService};
use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserInfoBody {
    id: String,
    name: String,
    telegram_username: String,
    telegram_user_chat_id: i64,
}

impl From<UserInfo> for UserInfoBody {
    fn from(info: UserInfo) -> Self {
        Self {
            id: info.id.to_string(),
            name: info.name,
            telegram_username: info.chat_handle,
            telegram_user_chat_id: info.chat_id,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetUserInfo {
    name: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct ChangePassword {
    password: String,
}

#[utoipa::path(
    get,
    path= "/get_user_info",
    params(
        ("User-ID" = String, Header, description = "Identity id"),
        ("Authorization" = String, Header, description = "Session token"),
    ),
    responses (
        (status = 200, description = "Profile of the caller in `data`", body = UserInfoBody),
        (status = 401, description = "Missing or foreign token", body = ErrorBody),
        (status = 404, description = "Identity no longer exists", body = ErrorBody),
    ),
    tag= "users"
)]
#[instrument(skip(service))]
pub async fn get_user_info(
    caller: Caller,
    Extension(service): Extension<CredentialService>,
) -> ApiResult<UserInfoBody> {
    ok(service.user_info(caller.id).await?.into())
}

#[utoipa::path(
    put,
    path= "/set_user_info",
    request_body = SetUserInfo,
    params(
        ("User-ID" = String, Header, description = "Identity id"),
        ("Authorization" = String, Header, description = "Session token"),
    ),
    responses (
        (status = 200, description = "Display name updated", body = String),
        (status = 400, description = "Missing name", body = ErrorBody),
        (status = 401, description = "Missing or foreign token", body = ErrorBody),
        (status = 404, description = "Identity no longer exists", body = ErrorBody),
    ),
    tag= "users"
)]
#[instrument(skip(service, body))]
pub async fn set_user_info(
    caller: Caller,
    Extension(service): Extension<CredentialService>,
    body: Result<Json<SetUserInfo>, JsonRejection>,
) -> ApiResult<String> {
    let name = required(&payload(body)?.name, "name")?;

    service.update_profile(caller.id, &name).await?;

    ok("user info updated".to_string())
}

#[utoipa::path(
    put,
    path= "/change_psw",
    request_body = ChangePassword,
    params(
        ("User-ID" = String, Header, description = "Identity id"),
        ("Authorization" = String, Header, description = "Session token"),
    ),
    responses (
        (status = 200, description = "Password replaced", body = String),
        (status = 400, description = "Missing password", body = ErrorBody),
        (status = 401, description = "Missing or foreign token", body = ErrorBody),
        (status = 404, description = "Identity no longer exists", body = ErrorBody),
    ),
    tag= "users"
)]
#[instrument(skip(service, body))]
pub async fn change_psw(
    caller: Caller,
    Extension(service): Extension<CredentialService>,
    body: Result<Json<ChangePassword>, JsonRejection>,
) -> ApiResult<String> {
    let password = required(&payload(body)?.password, "password")?;

    service.change_password(caller.id, &password).await?;

    ok("password changed".to_string())
}
