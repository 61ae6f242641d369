// Login endpoint.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};

use super::{ApiError, AppState, json_body};
use crate::auth::Provider;
use crate::types::ProviderAccessToken;

/// `POST /user?type=kakao|facebook` with `{"accessToken": ...}`.
///
/// Responds with `{"jwt": ...}`. A provider refusal is returned with the
/// provider's status code.
pub async fn login(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let provider_type = params
        .get("type")
        .ok_or_else(|| ApiError::bad_request("Argument 'type' must be provided!"))?;

    let body = json_body(&body)?;

    let provider = Provider::parse(provider_type)
        .ok_or_else(|| ApiError::bad_request("Invalid 'type' given!"))?;

    let access_token = match body.get("accessToken") {
        Some(Value::String(token)) => ProviderAccessToken::new(token.as_str()),
        _ => return Err(ApiError::bad_request("'accessToken' not provided!")),
    };

    let token = state.login.login(provider, &access_token).await?;

    Ok((StatusCode::OK, Json(json!({ "jwt": token }))))
}
