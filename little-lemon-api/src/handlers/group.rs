use axum::{
    Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Json,
    routing::get,
};
use little_lemon_service::{ServiceError, groups, models::Role};
use tracing::instrument;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::models::*;

use super::{AppState, with_connection};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/groups/{group}/users",
        get(list_members)
            .post(assign_to_group)
            .delete(remove_from_group),
    )
}

/// `manager` or `delivery-crew`; anything else is an unknown route.
fn group_of(group: Result<Path<String>, PathRejection>) -> Result<Role, ApiError> {
    let Path(group) = group?;
    group
        .parse()
        .map_err(|_| ApiError::Service(ServiceError::NotFound("group")))
}

fn username_of(payload: Result<Json<GroupMemberRequest>, JsonRejection>) -> Option<String> {
    // A missing or unreadable body is treated as a missing username.
    payload.ok().and_then(|Json(request)| request.username)
}

#[utoipa::path(
    get,
    path = "/api/groups/{group}/users",
    params(("group" = String, Path, description = "`manager` or `delivery-crew`")),
    responses(
        (status = 200, description = "Group members", body = GroupMembersResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Unknown group", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "groups"
)]
#[instrument(skip(state, caller))]
pub async fn list_members(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    group: Result<Path<String>, PathRejection>,
) -> Result<Json<GroupMembersResponse>, ApiError> {
    let role = group_of(group)?;
    let members =
        with_connection(&state.pool, move |conn| groups::list_members(conn, &caller, role)).await?;
    Ok(Json(GroupMembersResponse {
        group: role.name().to_string(),
        members,
    }))
}

#[utoipa::path(
    post,
    path = "/api/groups/{group}/users",
    params(("group" = String, Path, description = "`manager` or `delivery-crew`")),
    request_body = GroupMemberRequest,
    responses(
        (status = 201, description = "User added to the group", body = GroupMembershipResponse),
        (status = 400, description = "Username missing", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Unknown group or user", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "groups"
)]
#[instrument(skip(state, caller))]
pub async fn assign_to_group(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    group: Result<Path<String>, PathRejection>,
    payload: Result<Json<GroupMemberRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GroupMembershipResponse>), ApiError> {
    let role = group_of(group)?;
    let username = username_of(payload);
    let user = with_connection(&state.pool, move |conn| {
        groups::assign_to_group(conn, &caller, role, username.as_deref())
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(GroupMembershipResponse {
            message: format!("{} added to {}", user.username, role.name()),
            group: role.name().to_string(),
            username: user.username,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{group}/users",
    params(("group" = String, Path, description = "`manager` or `delivery-crew`")),
    request_body = GroupMemberRequest,
    responses(
        (status = 200, description = "User removed from the group", body = GroupMembershipResponse),
        (status = 400, description = "Username missing", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Unknown group or user", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "groups"
)]
#[instrument(skip(state, caller))]
pub async fn remove_from_group(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    group: Result<Path<String>, PathRejection>,
    payload: Result<Json<GroupMemberRequest>, JsonRejection>,
) -> Result<Json<GroupMembershipResponse>, ApiError> {
    let role = group_of(group)?;
    let username = username_of(payload);
    let user = with_connection(&state.pool, move |conn| {
        groups::remove_from_group(conn, &caller, role, username.as_deref())
    })
    .await?;
    Ok(Json(GroupMembershipResponse {
        message: format!("{} removed from {}", user.username, role.name()),
        group: role.name().to_string(),
        username: user.username,
    }))
}
