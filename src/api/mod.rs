// REST API endpoints for the groups service

mod error;
mod group;
pub mod pagination;
mod user;


pub use error::ApiError;

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{LoginService, SessionValidator};
use crate::db::Db;

/// Shared, immutable application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub validator: Arc<SessionValidator>,
    pub login: Arc<LoginService>,
}

pub fn create_router(state: AppState) -> Router {
    let group_routes = Router::new()
        .route("/group", get(group::list_groups).post(group::create_group))
        .route(
            "/group/{group_id}",
            put(group::update_signup_code).delete(group::delete_group),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/user", post(user::login))
        .merge(group_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Validate the request's session token and hand the outcome to the handler.
///
/// A token that fails validation ends the request here. Otherwise the
/// resulting `Session` (possibly anonymous) is stored in the request
/// extensions for the handler to extract.
async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = session_token(request.headers(), request.uri().query());

    match state.validator.validate(token.as_deref()).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Read the session token from `Authorization: Bearer`, falling back to the
/// `jwt` query parameter.
fn session_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string());

    if bearer.is_some() {
        return bearer;
    }

    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "jwt")
            .map(|(_, value)| value.into_owned())
    })
}

/// Parse a request body as JSON regardless of its content type.
pub(crate) fn json_body(body: &[u8]) -> Result<Value, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) if value.is_object() => Ok(value),
        _ => Err(ApiError::bad_request("Unable to get json post data!")),
    }
}
