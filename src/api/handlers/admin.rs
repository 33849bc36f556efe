use super::{ok, ApiError, ApiResult, Caller, ErrorBody};
use crate::{
    identity::{Identity, Role, UserId},
    service::CredentialService,
};
use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct AdminArgs {
    /// id of the identity to inspect
    user_id: String,
}

/// Admin view of an identity. The password hash and pending code are left out.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityBody {
    id: String,
    login: String,
    name: String,
    role: String,
    telegram_username: String,
    telegram_chat_id: i64,
}

impl From<Identity> for IdentityBody {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            role: match identity.role {
                Role::User => "user".to_string(),
                Role::Admin => "admin".to_string(),
            },
            telegram_username: identity.chat_handle.unwrap_or_default(),
            telegram_chat_id: identity.chat_id.unwrap_or_default(),
            login: identity.login,
            name: identity.name,
        }
    }
}

#[utoipa::path(
    get,
    path= "/admin/get_user_info",
    params(
        AdminArgs,
        ("User-ID" = String, Header, description = "Admin identity id"),
        ("Authorization" = String, Header, description = "Session token"),
    ),
    responses (
        (status = 200, description = "Identity in `data`", body = IdentityBody),
        (status = 400, description = "Missing or malformed user_id", body = ErrorBody),
        (status = 401, description = "Missing or foreign token", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such identity", body = ErrorBody),
    ),
    tag= "admin"
)]
#[instrument(skip(service, query))]
pub async fn admin_get_user_info(
    caller: Caller,
    Extension(service): Extension<CredentialService>,
    query: Result<Query<AdminArgs>, QueryRejection>,
) -> ApiResult<IdentityBody> {
    if !service.is_admin(caller.id).await? {
        debug!("{} is not an admin", caller.id);
        return Err(ApiError::new(StatusCode::FORBIDDEN, "admin role required"));
    }

    let Ok(Query(args)) = query else {
        return Err(ApiError::bad_request("user_id is required"));
    };

    let user_id = args
        .user_id
        .parse::<UserId>()
        .map_err(|_| ApiError::bad_request("invalid user_id"))?;

    ok(service.full_info(user_id).await?.into())
}
