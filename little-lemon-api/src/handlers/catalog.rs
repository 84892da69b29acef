use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
    routing::get,
};
use little_lemon_service::catalog::{self, PageRequest};
use tracing::instrument;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::models::*;

use super::{AppState, with_connection};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/menu-items", get(list_menu_items).post(create_menu_item))
        .route(
            "/menu-items/{id}",
            get(get_menu_item)
                .patch(update_menu_item)
                .delete(delete_menu_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories", body = [CategoryResponse]),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn list_categories(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories =
        with_connection(&state.pool, move |conn| catalog::list_categories(conn, &caller)).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Duplicate slug or title", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn create_category(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let Json(payload) = payload?;
    let category = with_connection(&state.pool, move |conn| {
        catalog::create_category(conn, &caller, payload.into())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Category not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn get_category(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let Path(id) = id?;
    let category =
        with_connection(&state.pool, move |conn| catalog::get_category(conn, &caller, id)).await?;
    Ok(Json(category.into()))
}

#[utoipa::path(
    patch,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Invalid or duplicate fields", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Category not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn update_category(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let category = with_connection(&state.pool, move |conn| {
        catalog::update_category(conn, &caller, id, payload.into())
    })
    .await?;
    Ok(Json(category.into()))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 400, description = "Category still has menu items", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Category not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn delete_category(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    with_connection(&state.pool, move |conn| catalog::delete_category(conn, &caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/menu-items",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of menu items", body = MenuItemPageResponse),
        (status = 404, description = "Invalid page", body = ApiErrorResponse),
    ),
    tag = "catalog"
)]
#[instrument(skip(state))]
pub async fn list_menu_items(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<MenuItemPageResponse>, ApiError> {
    let Query(query) = query?;
    let page = PageRequest {
        page: query.page,
        perpage: query.perpage,
    };
    let page = with_connection(&state.pool, move |conn| catalog::list_menu_items(conn, page)).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    post,
    path = "/api/menu-items",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = MenuItemResponse),
        (status = 400, description = "Invalid menu item", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn create_menu_item(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<CreateMenuItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MenuItemResponse>), ApiError> {
    let Json(payload) = payload?;
    let item = with_connection(&state.pool, move |conn| {
        catalog::create_menu_item(conn, &caller, payload.into())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[utoipa::path(
    get,
    path = "/api/menu-items/{id}",
    params(("id" = i32, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item", body = MenuItemResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    tag = "catalog"
)]
#[instrument(skip(state))]
pub async fn get_menu_item(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let Path(id) = id?;
    let item = with_connection(&state.pool, move |conn| catalog::get_menu_item(conn, id)).await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    patch,
    path = "/api/menu-items/{id}",
    params(("id" = i32, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = MenuItemResponse),
        (status = 400, description = "Invalid menu item", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn update_menu_item(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateMenuItemRequest>, JsonRejection>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let item = with_connection(&state.pool, move |conn| {
        catalog::update_menu_item(conn, &caller, id, payload.into())
    })
    .await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    delete,
    path = "/api/menu-items/{id}",
    params(("id" = i32, Path, description = "Menu item ID")),
    responses(
        (status = 204, description = "Menu item deleted"),
        (status = 400, description = "Menu item is part of existing orders", body = ApiErrorResponse),
        (status = 403, description = "Managers only", body = ApiErrorResponse),
        (status = 404, description = "Menu item not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
#[instrument(skip(state, caller))]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    with_connection(&state.pool, move |conn| catalog::delete_menu_item(conn, &caller, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
