use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use little_lemon_service::{
    cart::{CartEntry, cart_total},
    catalog::MenuItemPage,
    models::{
        Category, CategoryChanges, MenuItem, MenuItemChanges, NewCategory, NewMenuItem, OrderItem,
    },
    orders::{OrderDetails, OrderPatch},
    OrderView,
};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Human readable error message
    pub error: String,
    /// Machine readable error kind, e.g. `not_found` or `empty_cart`
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub slug: String,
    pub title: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        CategoryResponse {
            id: category.id,
            slug: category.slug,
            title: category.title,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    /// URL friendly identifier, unique
    pub slug: String,
    /// Display name, unique
    pub title: String,
}

impl From<CreateCategoryRequest> for NewCategory {
    fn from(request: CreateCategoryRequest) -> Self {
        NewCategory {
            slug: request.slug,
            title: request.title,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
}

impl From<UpdateCategoryRequest> for CategoryChanges {
    fn from(request: UpdateCategoryRequest) -> Self {
        CategoryChanges {
            slug: request.slug,
            title: request.title,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuItemResponse {
    pub id: i32,
    pub title: String,
    /// Decimal price with two fractional digits
    #[schema(value_type = String, example = "12.99")]
    pub price: BigDecimal,
    pub featured: bool,
    pub category_id: i32,
}

impl From<MenuItem> for MenuItemResponse {
    fn from(item: MenuItem) -> Self {
        MenuItemResponse {
            id: item.id,
            title: item.title,
            price: item.price,
            featured: item.featured,
            category_id: item.category_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    pub title: String,
    #[schema(value_type = String, example = "12.99")]
    pub price: BigDecimal,
    #[serde(default)]
    pub featured: bool,
    pub category_id: i32,
}

impl From<CreateMenuItemRequest> for NewMenuItem {
    fn from(request: CreateMenuItemRequest) -> Self {
        NewMenuItem {
            title: request.title,
            price: request.price,
            featured: request.featured,
            category_id: request.category_id,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub title: Option<String>,
    #[schema(value_type = Option<String>, example = "12.99")]
    pub price: Option<BigDecimal>,
    pub featured: Option<bool>,
    pub category_id: Option<i32>,
}

impl From<UpdateMenuItemRequest> for MenuItemChanges {
    fn from(request: UpdateMenuItemRequest) -> Self {
        MenuItemChanges {
            title: request.title,
            price: request.price,
            featured: request.featured,
            category_id: request.category_id,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1
    pub page: Option<i64>,
    /// Items per page (default 5, at most 20)
    pub perpage: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuItemPageResponse {
    /// Total number of menu items
    pub count: i64,
    pub page: i64,
    pub perpage: i64,
    pub results: Vec<MenuItemResponse>,
}

impl From<MenuItemPage> for MenuItemPageResponse {
    fn from(page: MenuItemPage) -> Self {
        MenuItemPageResponse {
            count: page.count,
            page: page.page,
            perpage: page.perpage,
            results: page.results.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub id: i32,
    pub menuitem_id: i32,
    pub title: String,
    pub quantity: i32,
    #[schema(value_type = String, example = "12.99")]
    pub unit_price: BigDecimal,
    /// `quantity × unit_price`
    #[schema(value_type = String, example = "25.98")]
    pub price: BigDecimal,
}

impl From<CartEntry> for CartLineResponse {
    fn from(entry: CartEntry) -> Self {
        CartLineResponse {
            id: entry.line.id,
            menuitem_id: entry.line.menuitem_id,
            price: entry.price(),
            title: entry.menu_item.title,
            quantity: entry.line.quantity,
            unit_price: entry.menu_item.price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    #[schema(value_type = String, example = "32.48")]
    pub total: BigDecimal,
}

impl From<Vec<CartEntry>> for CartResponse {
    fn from(entries: Vec<CartEntry>) -> Self {
        CartResponse {
            total: cart_total(&entries),
            items: entries.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub menuitem_id: i32,
    /// Added to the existing quantity when the item is already in the cart
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartLineRequest {
    /// Replaces the current quantity
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearCartResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i32,
    pub menuitem_id: i32,
    pub title: String,
    pub quantity: i32,
    /// Menu price at checkout
    #[schema(value_type = String, example = "12.99")]
    pub unit_price: BigDecimal,
    #[schema(value_type = String, example = "25.98")]
    pub price: BigDecimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        OrderItemResponse {
            id: item.id,
            menuitem_id: item.menuitem_id,
            title: item.title,
            quantity: item.quantity,
            unit_price: item.unit_price,
            price: item.price,
        }
    }
}

/// Order as seen by managers, including the raw workflow fields.
#[derive(Debug, Serialize, ToSchema)]
pub struct FullOrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_crew: Option<Uuid>,
    pub status: bool,
    /// "Order not yet sent", "Order out for delivery" or "Order delivered"
    pub order_status: String,
    pub date: DateTime<Utc>,
    #[schema(value_type = String, example = "32.48")]
    pub total: BigDecimal,
    pub items: Vec<OrderItemResponse>,
}

/// Order as seen by customers and delivery crew.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummaryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_status: String,
    pub date: DateTime<Utc>,
    #[schema(value_type = String, example = "32.48")]
    pub total: BigDecimal,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum OrderResponse {
    Full(FullOrderResponse),
    Summary(OrderSummaryResponse),
}

impl OrderResponse {
    pub fn new(details: OrderDetails, view: OrderView) -> Self {
        let order_status = details.status().label().to_string();
        let total = details.total();
        let order = details.order;
        let items = details.items.into_iter().map(Into::into).collect();
        match view {
            OrderView::Full => OrderResponse::Full(FullOrderResponse {
                id: order.id,
                user_id: order.user_id,
                delivery_crew: order.delivery_crew_id,
                status: order.status,
                order_status,
                date: order.date,
                total,
                items,
            }),
            OrderView::Summary => OrderResponse::Summary(OrderSummaryResponse {
                id: order.id,
                user_id: order.user_id,
                order_status,
                date: order.date,
                total,
                items,
            }),
        }
    }
}

/// Keeps an explicit `null` apart from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    /// `true` once delivered; requires a delivery crew member to be assigned
    pub status: Option<bool>,
    /// Id of a member of the delivery crew group, or `null` to unassign
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Uuid>)]
    pub delivery_crew: Option<Option<Uuid>>,
}

impl From<UpdateOrderRequest> for OrderPatch {
    fn from(request: UpdateOrderRequest) -> Self {
        OrderPatch {
            status: request.status,
            delivery_crew: request.delivery_crew,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GroupMemberRequest {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupMembersResponse {
    pub group: String,
    /// Member usernames, alphabetically
    pub members: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupMembershipResponse {
    pub message: String,
    pub group: String,
    pub username: String,
}
