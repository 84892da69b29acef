use bigdecimal::BigDecimal;
use diesel::{
    delete, insert_into, prelude::*, result::DatabaseErrorKind, update, upsert::excluded,
    PgConnection,
};
use tracing::info;

use crate::{
    access::{Caller, Operation},
    catalog,
    error::{violated_constraint, ServiceError},
    models::{CartLine, MenuItem, NewCartLine},
    schema::{cart_lines, menu_items},
};

/// A cart line together with the menu item it refers to.
#[derive(Clone, Debug, PartialEq)]
pub struct CartEntry {
    pub line: CartLine,
    pub menu_item: MenuItem,
}

impl CartEntry {
    /// `quantity × price` at the menu item's current price.
    pub fn price(&self) -> BigDecimal {
        &self.menu_item.price * &BigDecimal::from(self.line.quantity)
    }
}

pub fn cart_total(entries: &[CartEntry]) -> BigDecimal {
    entries.iter().map(CartEntry::price).sum()
}

fn validate_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 1 {
        Err(ServiceError::validation("quantity must be at least 1"))
    } else {
        Ok(())
    }
}

pub fn list_cart(
    conn: &mut PgConnection,
    caller: &Caller,
) -> Result<Vec<CartEntry>, ServiceError> {
    Operation::ListCart.authorize(caller)?;
    Ok(cart_lines::table
        .inner_join(menu_items::table)
        .filter(cart_lines::user_id.eq(caller.id()))
        .select((CartLine::as_select(), MenuItem::as_select()))
        .order(cart_lines::id.asc())
        .load::<(CartLine, MenuItem)>(conn)?
        .into_iter()
        .map(|(line, menu_item)| CartEntry { line, menu_item })
        .collect())
}

/// Adds `quantity` of a menu item, merging into the existing line for that
/// item if there is one.
pub fn add_to_cart(
    conn: &mut PgConnection,
    caller: &Caller,
    menuitem_id: i32,
    quantity: i32,
) -> Result<CartEntry, ServiceError> {
    Operation::AddToCart.authorize(caller)?;
    validate_quantity(quantity)?;

    conn.transaction(|conn| {
        let menu_item = catalog::find_menu_item(conn, menuitem_id)?;
        let current = cart_lines::table
            .filter(cart_lines::user_id.eq(caller.id()))
            .filter(cart_lines::menuitem_id.eq(menuitem_id))
            .select(cart_lines::quantity)
            .for_update()
            .first::<i32>(conn)
            .optional()?;
        if current.is_some_and(|current| current.checked_add(quantity).is_none()) {
            return Err(ServiceError::validation("quantity is too large"));
        }
        let line = insert_into(cart_lines::table)
            .values(NewCartLine {
                user_id: caller.id(),
                menuitem_id,
                quantity,
            })
            .on_conflict((cart_lines::user_id, cart_lines::menuitem_id))
            .do_update()
            .set(cart_lines::quantity.eq(cart_lines::quantity + excluded(cart_lines::quantity)))
            .returning(CartLine::as_returning())
            .get_result(conn)
            .map_err(|err| match violated_constraint(&err) {
                // The item vanished between the lookup and the insert.
                Some(DatabaseErrorKind::ForeignKeyViolation) => {
                    ServiceError::NotFound("menu item")
                }
                _ => err.into(),
            })?;
        info!(
            user = %caller.user.username,
            menuitem_id,
            quantity = line.quantity,
            "cart line saved"
        );
        Ok(CartEntry { line, menu_item })
    })
}

/// Sets the quantity of one of the caller's lines.
pub fn update_cart_line(
    conn: &mut PgConnection,
    caller: &Caller,
    line_id: i32,
    quantity: i32,
) -> Result<CartEntry, ServiceError> {
    Operation::UpdateCartLine.authorize(caller)?;
    validate_quantity(quantity)?;

    conn.transaction(|conn| {
        let line = update(
            cart_lines::table
                .filter(cart_lines::id.eq(line_id))
                .filter(cart_lines::user_id.eq(caller.id())),
        )
        .set(cart_lines::quantity.eq(quantity))
        .returning(CartLine::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or(ServiceError::NotFound("cart item"))?;
        let menu_item = catalog::find_menu_item(conn, line.menuitem_id)?;
        Ok(CartEntry { line, menu_item })
    })
}

pub fn remove_cart_line(
    conn: &mut PgConnection,
    caller: &Caller,
    line_id: i32,
) -> Result<(), ServiceError> {
    Operation::RemoveCartLine.authorize(caller)?;
    let deleted = delete(
        cart_lines::table
            .filter(cart_lines::id.eq(line_id))
            .filter(cart_lines::user_id.eq(caller.id())),
    )
    .execute(conn)?;
    if deleted == 0 {
        return Err(ServiceError::NotFound("cart item"));
    }
    Ok(())
}

/// Empties the caller's cart and returns how many lines were removed.
pub fn clear_cart(conn: &mut PgConnection, caller: &Caller) -> Result<usize, ServiceError> {
    Operation::ClearCart.authorize(caller)?;
    let deleted =
        delete(cart_lines::table.filter(cart_lines::user_id.eq(caller.id()))).execute(conn)?;
    info!(user = %caller.user.username, deleted, "cart cleared");
    Ok(deleted)
}
