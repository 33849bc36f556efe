#![allow(clippy::needless_for_each)]

use super::handlers::{admin, auth, health, telegram, users, ErrorBody, SessionBody};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tgauth",
        description = "Credential, session and Telegram one-time code authentication API. \
            Every body is an envelope `{\"data\": ..., \"error\": ...}`; the documented \
            schemas describe `data` on success and the whole envelope on error."
    ),
    paths(
        health::ping,
        health::health,
        auth::sign_up,
        auth::sign_in,
        users::get_user_info,
        users::set_user_info,
        users::change_psw,
        telegram::bind_telegram,
        telegram::login_with_telegram,
        telegram::confirm_telegram_code,
        admin::admin_get_user_info,
    ),
    components(
        schemas(
            ErrorBody,
            SessionBody,
            health::Health,
            auth::Credentials,
            users::UserInfoBody,
            users::SetUserInfo,
            users::ChangePassword,
            telegram::BindTelegram,
            telegram::LoginWithTelegram,
            telegram::ConfirmTelegramCode,
            admin::IdentityBody,
        )
    ),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Sign-up and password sign-in"),
        (name = "users", description = "Profile of the authenticated identity"),
        (name = "telegram", description = "Telegram linking and one-time code login"),
        (name = "admin", description = "Admin-only identity lookup"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route() {
        let doc = openapi();
        for path in [
            "/ping",
            "/health",
            "/sign_up",
            "/sign_in",
            "/get_user_info",
            "/set_user_info",
            "/change_psw",
            "/bind_telegram",
            "/login_with_telegram",
            "/confirm_telegram_code",
            "/admin/get_user_info",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
