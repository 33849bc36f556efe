//! HTTP surface over the credential service and the chat login flow.

use crate::{chat::ChatLogin, service::CredentialService};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post, put},
    Extension, Router,
};
use tokio::{net::TcpListener, sync::watch};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

const REQUEST_ID: &str = "x-request-id";

/// Build the application router with its middleware stack.
#[must_use]
pub fn router(service: CredentialService, login: ChatLogin) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health).options(handlers::health))
        .route("/sign_up", post(handlers::sign_up))
        .route("/sign_in", post(handlers::sign_in))
        .route("/get_user_info", get(handlers::get_user_info))
        .route("/set_user_info", put(handlers::set_user_info))
        .route("/change_psw", put(handlers::change_psw))
        .route("/bind_telegram", post(handlers::bind_telegram))
        .route("/login_with_telegram", post(handlers::login_with_telegram))
        .route("/confirm_telegram_code", post(handlers::confirm_telegram_code))
        .route("/admin/get_user_info", get(handlers::admin_get_user_info))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(&Ulid::new().to_string()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(service))
                .layer(Extension(login)),
        )
}

/// Serve `app` until `shutdown` flips to `true`.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(port: u16, app: Router, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
