// Group endpoints. Every route here sits behind the session middleware.

use std::collections::HashMap;

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use tracing::info;

use super::pagination::{MAX_PAGE, Pagination};
use super::{ApiError, AppState, json_body};
use crate::auth::{AuthenticatedUser, Session};
use crate::db::{GroupCreate, GroupRecord, QueryBuilder};

/// Longest accepted group name or signup code, in characters.
const MAX_FIELD_LENGTH: usize = 64;

type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

fn require_user(session: &Session) -> Result<&AuthenticatedUser, ApiError> {
    session.user().ok_or_else(ApiError::unauthenticated)
}

/// Load a group that can still be modified; disabled groups count as missing.
async fn find_enabled_group(state: &AppState, group_id: i64) -> Result<GroupRecord, ApiError> {
    QueryBuilder::find_group_by_id(&state.db, group_id)
        .await?
        .filter(|group| group.is_enabled)
        .ok_or_else(|| ApiError::not_found("Requested 'group_id' not found!"))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let user = require_user(&session)?;

    let page = match params.get("page") {
        None => 1,
        Some(raw) => match raw.parse::<i64>() {
            Ok(page) if (1..=MAX_PAGE).contains(&page) => page,
            _ => {
                return Err(ApiError::bad_request(
                    "Argument 'page' must be a positive integer!",
                ));
            }
        },
    };

    let total = QueryBuilder::count_groups_for_user(&state.db, user.id()).await?;
    let pagination = Pagination::new(page, total);
    let rows = QueryBuilder::list_groups_for_user(
        &state.db,
        user.id(),
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "list": rows,
            "pagination": pagination.buttons(),
        })),
    ))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Bytes,
) -> ApiResult {
    let user = require_user(&session)?;
    let body = json_body(&body)?;

    let name = match body.get("name") {
        None => return Err(ApiError::bad_request("'name' not provided!")),
        Some(Value::String(name)) => name,
        Some(_) => return Err(ApiError::bad_request("'name' must be a string!")),
    };
    if name.chars().count() > MAX_FIELD_LENGTH {
        return Err(ApiError::bad_request(
            "Length of 'name' must be smaller than 64!",
        ));
    }

    let group_id = QueryBuilder::create_group(
        &state.db,
        &GroupCreate {
            name: name.clone(),
            creator_id: user.id(),
        },
    )
    .await?;

    info!("User {} created group {}", user.id(), group_id);
    Ok((StatusCode::CREATED, Json(json!({ "group_id": group_id }))))
}

pub async fn update_signup_code(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(group_id): Path<i64>,
    body: Bytes,
) -> ApiResult {
    let user = require_user(&session)?;
    let body = json_body(&body)?;

    // Absent, null or empty clears the code
    let signup_code = match body.get("code") {
        None | Some(Value::Null) => None,
        Some(Value::String(code)) if code.is_empty() => None,
        Some(Value::String(code)) => Some(code.clone()),
        Some(_) => return Err(ApiError::bad_request("'code' must be a string!")),
    };
    if let Some(code) = &signup_code {
        if code.chars().count() > MAX_FIELD_LENGTH {
            return Err(ApiError::bad_request(
                "Length of 'code' must be smaller than 64!",
            ));
        }
    }

    let group = find_enabled_group(&state, group_id).await?;
    if !user.is_creator_of(group.creator_id) {
        return Err(ApiError::forbidden(
            "Only creator of this group can update signup code!",
        ));
    }

    QueryBuilder::update_signup_code(&state.db, group_id, signup_code.as_deref()).await?;

    info!("User {} updated signup code of group {}", user.id(), group_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "group_id": group_id, "code": signup_code })),
    ))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(group_id): Path<i64>,
) -> ApiResult {
    let user = require_user(&session)?;

    let group = find_enabled_group(&state, group_id).await?;
    if !user.is_creator_of(group.creator_id) {
        return Err(ApiError::forbidden(
            "Only creator of this group can delete it!",
        ));
    }

    QueryBuilder::disable_group(&state.db, group_id).await?;

    info!("User {} disabled group {}", user.id(), group_id);
    Ok((StatusCode::OK, Json(json!({ "group_id": group_id }))))
}
