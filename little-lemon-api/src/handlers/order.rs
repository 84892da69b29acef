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
use little_lemon_service::{OrderView, orders};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::models::*;

use super::{AppState, with_connection};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route(
            "/orders/{id}",
            get(get_order).patch(update_order).delete(delete_order),
        )
}

#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Orders visible to the caller, newest first", body = [OrderResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
#[instrument(skip(state, caller))]
pub async fn list_orders(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let view = OrderView::for_caller(&caller);
    let orders = with_connection(&state.pool, move |conn| orders::list_orders(conn, &caller)).await?;
    Ok(Json(
        orders
            .into_iter()
            .map(|order| OrderResponse::new(order, view))
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    responses(
        (status = 201, description = "Order placed from the caller's cart", body = OrderResponse),
        (status = 400, description = "The cart is empty", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
#[instrument(skip(state, caller))]
pub async fn place_order(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let view = OrderView::for_caller(&caller);
    let order = with_connection(&state.pool, move |conn| orders::place_order(conn, &caller)).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::new(order, view))))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order details", body = OrderResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
#[instrument(skip(state, caller))]
pub async fn get_order(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = id?;
    let view = OrderView::for_caller(&caller);
    let order =
        with_connection(&state.pool, move |conn| orders::get_order(conn, &caller, id)).await?;
    Ok(Json(OrderResponse::new(order, view)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Not a delivery crew member, or delivered without crew", body = ApiErrorResponse),
        (status = 403, description = "Not allowed to change this field", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
#[instrument(skip(state, caller))]
pub async fn update_order(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let view = OrderView::for_caller(&caller);
    let order = with_connection(&state.pool, move |conn| {
        orders::update_order(conn, &caller, id, payload.into())
    })
    .await?;
    Ok(Json(OrderResponse::new(order, view)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order and its items deleted"),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
#[instrument(skip(state, caller))]
pub async fn delete_order(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    with_connection(&state.pool, move |conn| orders::delete_order(conn, &caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
