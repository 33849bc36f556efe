pub mod admin;
pub mod auth;
pub mod health;
pub mod telegram;
pub mod users;

pub use self::admin::admin_get_user_info;
pub use self::auth::{sign_in, sign_up};
pub use self::health::{health, ping};
pub use self::telegram::{bind_telegram, confirm_telegram_code, login_with_telegram};
pub use self::users::{change_psw, get_user_info, set_user_info};

// common types and functions for the handlers
use crate::{
    error::{Error, ErrorKind},
    identity::UserId,
    service::{CredentialService, Session},
};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

pub const USER_ID_HEADER: &str = "User-ID";

/// Every response body: exactly one of `data` and `error` is set.
#[derive(Serialize, Deserialize, Debug)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Error body as documented in the `OpenAPI` document.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    data: Option<String>,
    error: String,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

#[allow(clippy::unnecessary_wraps)]
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        data: Some(data),
        error: None,
    }))
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidCredential => StatusCode::UNAUTHORIZED,
            ErrorKind::DeliveryUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Delivery => StatusCode::BAD_GATEWAY,
            ErrorKind::PersistenceCorrupt
            | ErrorKind::PersistenceWriteFailed
            | ErrorKind::Internal => {
                error!("Internal error: {}", err);

                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
            }
        };

        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            data: None,
            error: Some(self.message),
        };

        (self.status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, answering 400 when it is missing or malformed.
pub fn payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) => {
            debug!("Rejected payload: {}", rejection.body_text());

            Err(ApiError::bad_request(rejection.body_text()))
        }
    }
}

/// Authenticated caller: `User-ID` header whose `Authorization` token resolves
/// to that same identity.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub id: UserId,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(service) = parts.extensions.get::<CredentialService>().cloned() else {
            error!("CredentialService extension is missing");

            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ));
        };

        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<UserId>().ok())
            .ok_or_else(|| {
                debug!("Missing or malformed {} header", USER_ID_HEADER);
                ApiError::unauthorized()
            })?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(ApiError::unauthorized)?;

        match service.resolve_session(token).await {
            Ok(owner) if owner == id => Ok(Self { id }),
            Ok(_) => {
                debug!("Token does not belong to {}", id);
                Err(ApiError::unauthorized())
            }
            Err(_) => Err(ApiError::unauthorized()),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionBody {
    /// Identity id, 32 hex characters.
    pub id: String,
    pub token: String,
}

impl From<Session> for SessionBody {
    fn from(session: Session) -> Self {
        Self {
            id: session.user_id.to_string(),
            token: session.token,
        }
    }
}

pub fn required(value: &str, what: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{what} is required")));
    }
    Ok(value.to_string())
}

/// Trim a chat handle and drop a leading `@`.
pub fn chat_handle(handle: &str) -> Result<String, ApiError> {
    let handle = handle.trim();
    required(handle.strip_prefix('@').unwrap_or(handle), "telegram username")
}

/// Exactly four ASCII digits.
pub fn valid_code(code: &str) -> bool {
    code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_code() {
        assert!(valid_code("0042"));
        assert!(valid_code("9999"));
        assert!(!valid_code("123"));
        assert!(!valid_code("12345"));
        assert!(!valid_code("12a4"));
        assert!(!valid_code(""));
    }

    #[test]
    fn test_chat_handle() {
        assert_eq!(chat_handle(" @alice_tg ").ok().as_deref(), Some("alice_tg"));
        assert_eq!(chat_handle("bob").ok().as_deref(), Some("bob"));
        assert!(chat_handle("@").is_err());
        assert!(chat_handle("   ").is_err());
    }

    #[test]
    fn test_error_status() {
        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::Conflict("alice".into()), StatusCode::CONFLICT),
            (Error::InvalidCredential, StatusCode::UNAUTHORIZED),
            (Error::InvalidOrExpiredCode, StatusCode::UNAUTHORIZED),
            (Error::DeliveryUnavailable, StatusCode::UNPROCESSABLE_ENTITY),
            (Error::Delivery("down".into()), StatusCode::BAD_GATEWAY),
            (Error::Entropy("no rng".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
