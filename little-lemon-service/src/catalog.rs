use bigdecimal::{BigDecimal, Zero};
use diesel::{
    delete, insert_into, prelude::*, result::DatabaseErrorKind, result::Error as DieselError,
    update, PgConnection,
};
use tracing::info;

use crate::{
    access::{Caller, Operation},
    error::{violated_constraint, ServiceError},
    models::{
        Category, CategoryChanges, MenuItem, MenuItemChanges, NewCategory, NewMenuItem,
    },
    schema,
};

pub const DEFAULT_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 20;

/// `page` / `perpage` as received from the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub perpage: Option<i64>,
}

impl PageRequest {
    pub fn page_size(&self) -> i64 {
        match self.perpage {
            Some(n) if n >= 1 => n.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    /// Zero-based row offset for the requested page, or `None` when the page
    /// does not exist for a collection of `count` rows.
    pub fn offset(&self, count: i64) -> Option<i64> {
        let page = self.page.unwrap_or(1);
        let size = self.page_size();
        let last_page = ((count + size - 1) / size).max(1);
        if page < 1 || page > last_page {
            None
        } else {
            Some((page - 1) * size)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MenuItemPage {
    pub count: i64,
    pub page: i64,
    pub perpage: i64,
    pub results: Vec<MenuItem>,
}

pub fn list_categories(
    conn: &mut PgConnection,
    caller: &Caller,
) -> Result<Vec<Category>, ServiceError> {
    Operation::ListCategories.authorize(caller)?;
    Ok(schema::categories::table
        .select(Category::as_select())
        .order(schema::categories::id.asc())
        .load(conn)?)
}

pub fn get_category(
    conn: &mut PgConnection,
    caller: &Caller,
    id: i32,
) -> Result<Category, ServiceError> {
    Operation::GetCategory.authorize(caller)?;
    find_category(conn, id)
}

fn find_category(conn: &mut PgConnection, id: i32) -> Result<Category, ServiceError> {
    schema::categories::table
        .select(Category::as_select())
        .find(id)
        .first(conn)
        .optional()?
        .ok_or(ServiceError::NotFound("category"))
}

pub fn create_category(
    conn: &mut PgConnection,
    caller: &Caller,
    category: NewCategory,
) -> Result<Category, ServiceError> {
    Operation::CreateCategory.authorize(caller)?;
    require_text("slug", &category.slug)?;
    require_text("title", &category.title)?;

    let created = conn.transaction(|conn| {
        insert_into(schema::categories::table)
            .values(&category)
            .returning(Category::as_returning())
            .get_result(conn)
            .map_err(category_write_error)
    })?;
    info!(id = created.id, slug = %created.slug, "category created");
    Ok(created)
}

pub fn update_category(
    conn: &mut PgConnection,
    caller: &Caller,
    id: i32,
    changes: CategoryChanges,
) -> Result<Category, ServiceError> {
    Operation::UpdateCategory.authorize(caller)?;
    if let Some(slug) = &changes.slug {
        require_text("slug", slug)?;
    }
    if let Some(title) = &changes.title {
        require_text("title", title)?;
    }
    if changes.is_empty() {
        return find_category(conn, id);
    }

    conn.transaction(|conn| {
        update(schema::categories::table.find(id))
            .set(&changes)
            .returning(Category::as_returning())
            .get_result(conn)
            .optional()
            .map_err(category_write_error)?
            .ok_or(ServiceError::NotFound("category"))
    })
}

pub fn delete_category(
    conn: &mut PgConnection,
    caller: &Caller,
    id: i32,
) -> Result<(), ServiceError> {
    Operation::DeleteCategory.authorize(caller)?;
    let deleted = conn.transaction(|conn| {
        delete(schema::categories::table.find(id))
            .execute(conn)
            .map_err(|err| match violated_constraint(&err) {
                Some(DatabaseErrorKind::ForeignKeyViolation) => {
                    ServiceError::validation("Category still has menu items")
                }
                _ => err.into(),
            })
    })?;
    if deleted == 0 {
        return Err(ServiceError::NotFound("category"));
    }
    info!(id, "category deleted");
    Ok(())
}

fn category_write_error(err: DieselError) -> ServiceError {
    match violated_constraint(&err) {
        Some(DatabaseErrorKind::UniqueViolation) => {
            ServiceError::validation("A category with this slug or title already exists")
        }
        _ => err.into(),
    }
}

/// Menu listing is public; anonymous visitors may browse.
pub fn list_menu_items(
    conn: &mut PgConnection,
    page: PageRequest,
) -> Result<MenuItemPage, ServiceError> {
    let count: i64 = schema::menu_items::table.count().get_result(conn)?;
    let offset = page
        .offset(count)
        .ok_or(ServiceError::NotFound("page"))?;
    let perpage = page.page_size();

    let results = schema::menu_items::table
        .select(MenuItem::as_select())
        .order(schema::menu_items::id.asc())
        .offset(offset)
        .limit(perpage)
        .load(conn)?;

    Ok(MenuItemPage {
        count,
        page: page.page.unwrap_or(1),
        perpage,
        results,
    })
}

pub fn get_menu_item(conn: &mut PgConnection, id: i32) -> Result<MenuItem, ServiceError> {
    find_menu_item(conn, id)
}

pub(crate) fn find_menu_item(conn: &mut PgConnection, id: i32) -> Result<MenuItem, ServiceError> {
    schema::menu_items::table
        .select(MenuItem::as_select())
        .find(id)
        .first(conn)
        .optional()?
        .ok_or(ServiceError::NotFound("menu item"))
}

pub fn create_menu_item(
    conn: &mut PgConnection,
    caller: &Caller,
    item: NewMenuItem,
) -> Result<MenuItem, ServiceError> {
    Operation::CreateMenuItem.authorize(caller)?;
    require_text("title", &item.title)?;
    validate_price(&item.price)?;

    let created = conn.transaction(|conn| {
        insert_into(schema::menu_items::table)
            .values(&item)
            .returning(MenuItem::as_returning())
            .get_result(conn)
            .map_err(menu_item_write_error)
    })?;
    info!(id = created.id, title = %created.title, price = %created.price, "menu item created");
    Ok(created)
}

pub fn update_menu_item(
    conn: &mut PgConnection,
    caller: &Caller,
    id: i32,
    changes: MenuItemChanges,
) -> Result<MenuItem, ServiceError> {
    Operation::UpdateMenuItem.authorize(caller)?;
    if let Some(title) = &changes.title {
        require_text("title", title)?;
    }
    if let Some(price) = &changes.price {
        validate_price(price)?;
    }
    if changes.is_empty() {
        return find_menu_item(conn, id);
    }

    let updated = conn.transaction(|conn| {
        update(schema::menu_items::table.find(id))
            .set(&changes)
            .returning(MenuItem::as_returning())
            .get_result(conn)
            .optional()
            .map_err(menu_item_write_error)?
            .ok_or(ServiceError::NotFound("menu item"))
    })?;
    info!(id, price = %updated.price, "menu item updated");
    Ok(updated)
}

pub fn delete_menu_item(
    conn: &mut PgConnection,
    caller: &Caller,
    id: i32,
) -> Result<(), ServiceError> {
    Operation::DeleteMenuItem.authorize(caller)?;
    let deleted = conn.transaction(|conn| {
        delete(schema::menu_items::table.find(id))
            .execute(conn)
            .map_err(|err| match violated_constraint(&err) {
                Some(DatabaseErrorKind::ForeignKeyViolation) => {
                    ServiceError::validation("Menu item is part of existing orders")
                }
                _ => err.into(),
            })
    })?;
    if deleted == 0 {
        return Err(ServiceError::NotFound("menu item"));
    }
    info!(id, "menu item deleted");
    Ok(())
}

fn menu_item_write_error(err: DieselError) -> ServiceError {
    match violated_constraint(&err) {
        Some(DatabaseErrorKind::UniqueViolation) => {
            ServiceError::validation("A menu item with this title already exists")
        }
        Some(DatabaseErrorKind::ForeignKeyViolation) => {
            ServiceError::validation("Category does not exist")
        }
        _ => err.into(),
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        Err(ServiceError::validation(format!("{field} may not be blank")))
    } else {
        Ok(())
    }
}

/// Prices are stored as `NUMERIC(6, 2)`.
pub fn validate_price(price: &BigDecimal) -> Result<(), ServiceError> {
    if *price <= BigDecimal::zero() {
        return Err(ServiceError::validation("price must be greater than zero"));
    }
    if *price >= BigDecimal::from(10_000) {
        return Err(ServiceError::validation("price must be less than 10000"));
    }
    let (_, scale) = price.normalized().as_bigint_and_exponent();
    if scale > 2 {
        return Err(ServiceError::validation(
            "price may not have more than 2 decimal places",
        ));
    }
    Ok(())
}
