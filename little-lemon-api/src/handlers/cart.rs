use axum::{
    Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Json,
    routing::{get, patch},
};
use little_lemon_service::cart;
use tracing::instrument;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::models::*;

use super::{AppState, with_connection};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(list_cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/{id}", patch(update_cart_line).delete(remove_cart_line))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "The caller's cart and its total", body = CartResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
#[instrument(skip(state, caller))]
pub async fn list_cart(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<CartResponse>, ApiError> {
    let entries = with_connection(&state.pool, move |conn| cart::list_cart(conn, &caller)).await?;
    Ok(Json(entries.into()))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Cart line after the addition", body = CartLineResponse),
        (status = 400, description = "Invalid quantity", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
#[instrument(skip(state, caller))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartLineResponse>), ApiError> {
    let Json(payload) = payload?;
    let entry = with_connection(&state.pool, move |conn| {
        cart::add_to_cart(conn, &caller, payload.menuitem_id, payload.quantity)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ClearCartResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
#[instrument(skip(state, caller))]
pub async fn clear_cart(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<ClearCartResponse>, ApiError> {
    let deleted =
        with_connection(&state.pool, move |conn| cart::clear_cart(conn, &caller)).await?;
    Ok(Json(ClearCartResponse { deleted }))
}

#[utoipa::path(
    patch,
    path = "/api/cart/{id}",
    params(("id" = i32, Path, description = "Cart line ID")),
    request_body = UpdateCartLineRequest,
    responses(
        (status = 200, description = "Cart line updated", body = CartLineResponse),
        (status = 400, description = "Invalid quantity", body = ApiErrorResponse),
        (status = 404, description = "Cart line not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
#[instrument(skip(state, caller))]
pub async fn update_cart_line(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateCartLineRequest>, JsonRejection>,
) -> Result<Json<CartLineResponse>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let entry = with_connection(&state.pool, move |conn| {
        cart::update_cart_line(conn, &caller, id, payload.quantity)
    })
    .await?;
    Ok(Json(entry.into()))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{id}",
    params(("id" = i32, Path, description = "Cart line ID")),
    responses(
        (status = 204, description = "Cart line removed"),
        (status = 404, description = "Cart line not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
#[instrument(skip(state, caller))]
pub async fn remove_cart_line(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    with_connection(&state.pool, move |conn| cart::remove_cart_line(conn, &caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
