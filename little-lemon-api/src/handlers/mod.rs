pub mod cart;
pub mod catalog;
pub mod group;
pub mod order;

pub use cart::router as cart_router;
pub use catalog::router as catalog_router;
pub use group::router as group_router;
pub use order::router as order_router;

use axum::Router;
use diesel::PgConnection;
use jsonwebtoken::DecodingKey;
use little_lemon_service::{DbPool, ServiceError};
use utoipa::OpenApi;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub decoding_key: DecodingKey,
}

/// Every `/api` route.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(catalog_router())
        .merge(cart_router())
        .merge(order_router())
        .merge(group_router())
}

/// Runs blocking diesel work on a pooled connection off the async runtime.
pub async fn with_connection<T, F>(pool: &DbPool, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut PgConnection) -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut *conn).map_err(ApiError::from)
    })
    .await?
}

#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::list_categories,
        catalog::create_category,
        catalog::get_category,
        catalog::update_category,
        catalog::delete_category,
        catalog::list_menu_items,
        catalog::create_menu_item,
        catalog::get_menu_item,
        catalog::update_menu_item,
        catalog::delete_menu_item,
        cart::list_cart,
        cart::add_to_cart,
        cart::clear_cart,
        cart::update_cart_line,
        cart::remove_cart_line,
        order::list_orders,
        order::place_order,
        order::get_order,
        order::update_order,
        order::delete_order,
        group::list_members,
        group::assign_to_group,
        group::remove_from_group,
    ),
    components(
        schemas(
            crate::models::CategoryResponse,
            crate::models::CreateCategoryRequest,
            crate::models::UpdateCategoryRequest,
            crate::models::MenuItemResponse,
            crate::models::CreateMenuItemRequest,
            crate::models::UpdateMenuItemRequest,
            crate::models::MenuItemPageResponse,
            crate::models::CartLineResponse,
            crate::models::CartResponse,
            crate::models::AddToCartRequest,
            crate::models::UpdateCartLineRequest,
            crate::models::ClearCartResponse,
            crate::models::OrderItemResponse,
            crate::models::FullOrderResponse,
            crate::models::OrderSummaryResponse,
            crate::models::OrderResponse,
            crate::models::UpdateOrderRequest,
            crate::models::GroupMemberRequest,
            crate::models::GroupMembersResponse,
            crate::models::GroupMembershipResponse,
            crate::models::ApiErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "catalog", description = "Categories and menu items"),
        (name = "cart", description = "The caller's shopping cart"),
        (name = "orders", description = "Checkout and delivery workflow"),
        (name = "groups", description = "Manager and delivery crew membership")
    ),
    info(
        title = "Little Lemon API",
        description = "Ordering backend for the Little Lemon restaurant",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
