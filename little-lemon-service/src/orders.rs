//! Checkout and the delivery workflow.
//!
//! An order moves through three observed states, derived from its `status`
//! flag and whether a delivery crew member is assigned:
//!
//! ```text
//! NotYetSent (crew unset, status false)
//!   -> OutForDelivery (crew set, status false)
//!   -> Delivered (crew set, status true)
//! ```
//!
//! An order can only be marked delivered once someone has been assigned to
//! deliver it.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::{delete, insert_into, prelude::*, update, PgConnection};
use tracing::info;
use uuid::Uuid;

use crate::{
    access::{Caller, Operation, OrderScope},
    error::ServiceError,
    groups::has_role,
    models::{CartLine, MenuItem, NewOrderItem, Order, OrderItem, Role},
    schema::{cart_lines, menu_items, order_items, orders},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    NotYetSent,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub fn of(order: &Order) -> Self {
        match (order.status, order.delivery_crew_id) {
            (true, _) => OrderStatus::Delivered,
            (false, Some(_)) => OrderStatus::OutForDelivery,
            (false, None) => OrderStatus::NotYetSent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::NotYetSent => "Order not yet sent",
            OrderStatus::OutForDelivery => "Order out for delivery",
            OrderStatus::Delivered => "Order delivered",
        }
    }
}

/// An order with its line items.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDetails {
    /// Sum of the prices captured at checkout.
    pub fn total(&self) -> BigDecimal {
        self.items.iter().map(|i| i.price.clone()).sum()
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::of(&self.order)
    }
}

/// Partial update of an order; `None` keeps the current value.
///
/// `delivery_crew` is `Some(None)` to unassign the courier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: Option<bool>,
    pub delivery_crew: Option<Option<Uuid>>,
}

impl OrderPatch {
    /// The `(status, delivery_crew_id)` pair the order ends up with.
    pub fn apply_to(&self, order: &Order) -> Result<(bool, Option<Uuid>), ServiceError> {
        let status = self.status.unwrap_or(order.status);
        let delivery_crew = self.delivery_crew.unwrap_or(order.delivery_crew_id);
        if status && delivery_crew.is_none() {
            return Err(ServiceError::validation(
                "Order must be assigned to a delivery crew before it is delivered",
            ));
        }
        Ok((status, delivery_crew))
    }
}

/// Snapshots the cart into order items at the menu prices read with it.
pub fn snapshot_line_items(order_id: Uuid, lines: &[(CartLine, MenuItem)]) -> Vec<NewOrderItem> {
    lines
        .iter()
        .map(|(line, menu_item)| NewOrderItem {
            order_id,
            menuitem_id: menu_item.id,
            title: menu_item.title.clone(),
            quantity: line.quantity,
            unit_price: menu_item.price.clone(),
            price: &menu_item.price * &BigDecimal::from(line.quantity),
        })
        .collect()
}

/// Turns the caller's cart into an order.
///
/// Runs in a single transaction. Only the caller's cart lines are read
/// `FOR UPDATE`, so a concurrent checkout by the same user waits for this one
/// and then finds the cart empty, while other users' carts never wait on it.
/// A locked line also holds back deletion of its menu item, which cascades to
/// cart lines. Only the lines that were read are removed, so an item added
/// mid-checkout stays in the cart. Any failure leaves the cart untouched and
/// no order behind.
pub fn place_order(conn: &mut PgConnection, caller: &Caller) -> Result<OrderDetails, ServiceError> {
    Operation::PlaceOrder.authorize(caller)?;

    conn.transaction(|conn| {
        let cart = cart_lines::table
            .filter(cart_lines::user_id.eq(caller.id()))
            .select(CartLine::as_select())
            .order(cart_lines::id.asc())
            .for_update()
            .load::<CartLine>(conn)?;
        if cart.is_empty() {
            return Err(ServiceError::EmptyCart);
        }
        let lines = with_menu_items(conn, cart)?;

        let order = insert_into(orders::table)
            .values(Order {
                id: Uuid::new_v4(),
                user_id: caller.id(),
                delivery_crew_id: None,
                status: false,
                date: Utc::now(),
            })
            .returning(Order::as_returning())
            .get_result(conn)?;

        let items = insert_into(order_items::table)
            .values(snapshot_line_items(order.id, &lines))
            .returning(OrderItem::as_returning())
            .get_results(conn)?;

        let line_ids: Vec<i32> = lines.iter().map(|(line, _)| line.id).collect();
        delete(cart_lines::table.filter(cart_lines::id.eq_any(line_ids))).execute(conn)?;

        let details = OrderDetails { order, items };
        info!(
            order_id = %details.order.id,
            user = %caller.user.username,
            items = details.items.len(),
            total = %details.total(),
            "order placed"
        );
        Ok(details)
    })
}

fn with_menu_items(
    conn: &mut PgConnection,
    cart: Vec<CartLine>,
) -> Result<Vec<(CartLine, MenuItem)>, ServiceError> {
    let ids: Vec<i32> = cart.iter().map(|line| line.menuitem_id).collect();
    let mut menu: HashMap<i32, MenuItem> = menu_items::table
        .filter(menu_items::id.eq_any(ids))
        .select(MenuItem::as_select())
        .load::<MenuItem>(conn)?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();
    cart.into_iter()
        .map(|line| {
            let item = menu
                .remove(&line.menuitem_id)
                .ok_or(ServiceError::NotFound("menu item"))?;
            Ok((line, item))
        })
        .collect()
}

pub fn list_orders(
    conn: &mut PgConnection,
    caller: &Caller,
) -> Result<Vec<OrderDetails>, ServiceError> {
    Operation::ListOrders.authorize(caller)?;

    let mut query = orders::table.select(Order::as_select()).into_boxed();
    query = match caller.order_scope() {
        OrderScope::All => query,
        OrderScope::AssignedTo(crew) => query.filter(orders::delivery_crew_id.eq(crew)),
        OrderScope::PlacedBy(user) => query.filter(orders::user_id.eq(user)),
    };
    let results = query
        .order((orders::date.desc(), orders::id.asc()))
        .load::<Order>(conn)?;

    let items = OrderItem::belonging_to(&results)
        .select(OrderItem::as_select())
        .order(order_items::id.asc())
        .load::<OrderItem>(conn)?
        .grouped_by(&results);

    Ok(results
        .into_iter()
        .zip(items)
        .map(|(order, items)| OrderDetails { order, items })
        .collect())
}

pub fn get_order(
    conn: &mut PgConnection,
    caller: &Caller,
    order_id: Uuid,
) -> Result<OrderDetails, ServiceError> {
    Operation::GetOrder.authorize(caller)?;
    let order = orders::table
        .select(Order::as_select())
        .find(order_id)
        .first::<Order>(conn)
        .optional()?
        .filter(|o| caller.can_see(o))
        .ok_or(ServiceError::NotFound("order"))?;
    load_items(conn, order)
}

fn load_items(conn: &mut PgConnection, order: Order) -> Result<OrderDetails, ServiceError> {
    let items = OrderItem::belonging_to(&order)
        .select(OrderItem::as_select())
        .order(order_items::id.asc())
        .load(conn)?;
    Ok(OrderDetails { order, items })
}

/// Applies a partial update to an order.
///
/// Managers may change both fields, and clear `delivery_crew`. Delivery crew
/// members may only change `status`, and only on orders assigned to them.
pub fn update_order(
    conn: &mut PgConnection,
    caller: &Caller,
    order_id: Uuid,
    patch: OrderPatch,
) -> Result<OrderDetails, ServiceError> {
    if patch.delivery_crew.is_some() {
        Operation::AssignDeliveryCrew.authorize(caller)?;
    }
    Operation::UpdateOrderStatus.authorize(caller)?;

    conn.transaction(|conn| {
        let order = orders::table
            .select(Order::as_select())
            .find(order_id)
            .for_update()
            .first::<Order>(conn)
            .optional()?
            .filter(|o| caller.can_see(o))
            .ok_or(ServiceError::NotFound("order"))?;

        if let Some(Some(crew)) = patch.delivery_crew {
            if !has_role(conn, crew, Role::DeliveryCrew)? {
                return Err(ServiceError::validation(
                    "User does not belong to the delivery crew group",
                ));
            }
        }
        let (status, delivery_crew) = patch.apply_to(&order)?;

        let order = update(orders::table.find(order_id))
            .set((
                orders::status.eq(status),
                orders::delivery_crew_id.eq(delivery_crew),
            ))
            .returning(Order::as_returning())
            .get_result(conn)?;
        info!(
            order_id = %order.id,
            by = %caller.user.username,
            status = OrderStatus::of(&order).label(),
            "order updated"
        );
        load_items(conn, order)
    })
}

/// Deletes an order together with its items.
pub fn delete_order(
    conn: &mut PgConnection,
    caller: &Caller,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    Operation::DeleteOrder.authorize(caller)?;
    let deleted = delete(orders::table.find(order_id)).execute(conn)?;
    if deleted == 0 {
        return Err(ServiceError::NotFound("order"));
    }
    info!(%order_id, by = %caller.user.username, "order deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use diesel::connection::SimpleConnection;

    use super::*;
    use crate::{
        cart::{add_to_cart, list_cart},
        catalog::update_menu_item,
        models::MenuItemChanges,
        test_support::*,
    };

    fn order(status: bool, delivery_crew_id: Option<Uuid>) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            delivery_crew_id,
            status,
            date: Utc::now(),
        }
    }

    #[test]
    fn test_order_status_labels() {
        let crew = Some(Uuid::new_v4());
        assert_eq!(
            OrderStatus::of(&order(false, None)).label(),
            "Order not yet sent"
        );
        assert_eq!(
            OrderStatus::of(&order(false, crew)).label(),
            "Order out for delivery"
        );
        assert_eq!(OrderStatus::of(&order(true, crew)).label(), "Order delivered");
        assert_eq!(OrderStatus::of(&order(true, None)), OrderStatus::Delivered);
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let crew = Uuid::new_v4();
        let current = order(false, Some(crew));

        let patch = OrderPatch {
            status: Some(true),
            delivery_crew: None,
        };
        assert_eq!(patch.apply_to(&current).unwrap(), (true, Some(crew)));
        assert_eq!(
            OrderPatch::default().apply_to(&current).unwrap(),
            (false, Some(crew))
        );
    }

    #[test]
    fn test_patch_cannot_deliver_without_crew() {
        let patch = OrderPatch {
            status: Some(true),
            delivery_crew: None,
        };
        assert!(matches!(
            patch.apply_to(&order(false, None)),
            Err(ServiceError::Validation(_))
        ));

        let crew = Uuid::new_v4();
        let patch = OrderPatch {
            status: Some(true),
            delivery_crew: Some(Some(crew)),
        };
        assert_eq!(patch.apply_to(&order(false, None)).unwrap(), (true, Some(crew)));
    }

    #[test]
    fn test_patch_can_unassign_crew() {
        let crew = Uuid::new_v4();
        let unassign = OrderPatch {
            delivery_crew: Some(None),
            ..Default::default()
        };
        assert_eq!(unassign.apply_to(&order(false, Some(crew))).unwrap(), (false, None));
        assert!(matches!(
            unassign.apply_to(&order(true, Some(crew))),
            Err(ServiceError::Validation(_))
        ));

        let undeliver = OrderPatch {
            status: Some(false),
            delivery_crew: Some(None),
        };
        assert_eq!(undeliver.apply_to(&order(true, Some(crew))).unwrap(), (false, None));
    }

    #[test]
    fn test_snapshot_line_items() {
        let user_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let line = |id, menuitem_id, quantity| CartLine {
            id,
            user_id,
            menuitem_id,
            quantity,
        };
        let item = |id, title: &str, amount| MenuItem {
            id,
            title: title.to_string(),
            price: price(amount),
            featured: false,
            category_id: 1,
        };
        let lines = vec![
            (line(1, 10, 2), item(10, "Greek Salad", "12.99")),
            (line(2, 11, 1), item(11, "Lentil Soup", "6.50")),
        ];

        let items = snapshot_line_items(order_id, &lines);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.order_id == order_id));
        assert_eq!(items[0].unit_price, price("12.99"));
        assert_eq!(items[0].price, price("25.98"));
        assert_eq!(items[1].unit_price, price("6.50"));
        assert_eq!(items[1].price, price("6.50"));
        let total: BigDecimal = items.iter().map(|i| i.price.clone()).sum();
        assert_eq!(total, price("32.48"));
    }

    #[test]
    fn test_place_order_converts_cart() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let customer = customer(&mut conn);
        let category = create_category_fixture(&mut conn);
        let salad = create_menu_item_fixture(&mut conn, &category, "Greek Salad", "12.99");
        let soup = create_menu_item_fixture(&mut conn, &category, "Lentil Soup", "6.50");
        add_to_cart(&mut conn, &customer, salad.id, 2).unwrap();
        add_to_cart(&mut conn, &customer, soup.id, 1).unwrap();

        let placed = place_order(&mut conn, &customer).unwrap();

        assert_eq!(placed.order.user_id, customer.id());
        assert_eq!(placed.status(), OrderStatus::NotYetSent);
        assert_eq!(placed.items.len(), 2);
        assert_eq!(placed.items[0].menuitem_id, salad.id);
        assert_eq!(placed.items[0].unit_price, price("12.99"));
        assert_eq!(placed.items[1].unit_price, price("6.50"));
        assert_eq!(placed.total(), price("32.48"));
        assert!(list_cart(&mut conn, &customer).unwrap().is_empty());

        let orders = list_orders(&mut conn, &customer).unwrap();
        assert_eq!(orders, vec![placed]);
    }

    #[test]
    fn test_place_order_with_empty_cart() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let customer = customer(&mut conn);

        assert!(matches!(
            place_order(&mut conn, &customer),
            Err(ServiceError::EmptyCart)
        ));
        assert!(list_orders(&mut conn, &customer).unwrap().is_empty());
    }

    #[test]
    fn test_order_total_survives_price_change() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let customer = customer(&mut conn);
        let category = create_category_fixture(&mut conn);
        let salad = create_menu_item_fixture(&mut conn, &category, "Greek Salad", "12.99");
        add_to_cart(&mut conn, &customer, salad.id, 2).unwrap();
        let placed = place_order(&mut conn, &customer).unwrap();

        update_menu_item(
            &mut conn,
            &manager,
            salad.id,
            MenuItemChanges {
                price: Some(price("15.00")),
                ..Default::default()
            },
        )
        .unwrap();

        let reloaded = get_order(&mut conn, &customer, placed.order.id).unwrap();
        assert_eq!(reloaded.items[0].unit_price, price("12.99"));
        assert_eq!(reloaded.total(), price("25.98"));
    }

    #[test]
    fn test_concurrent_checkouts_place_one_order() {
        let Some(mut conn) = committing_connection() else {
            return;
        };
        let customer = customer(&mut conn);
        let category = create_category_fixture(&mut conn);
        let salad = create_menu_item_fixture(&mut conn, &category, "Greek Salad", "12.99");
        add_to_cart(&mut conn, &customer, salad.id, 2).unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let customer = customer.clone();
                std::thread::spawn(move || {
                    let mut conn = committing_connection().unwrap();
                    place_order(&mut conn, &customer)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let orders = list_orders(&mut conn, &customer).unwrap();
        let remaining = list_cart(&mut conn, &customer).unwrap();

        delete(orders::table.filter(orders::user_id.eq(customer.id())))
            .execute(&mut conn)
            .unwrap();
        delete(menu_items::table.filter(menu_items::id.eq(salad.id)))
            .execute(&mut conn)
            .unwrap();
        delete(crate::schema::categories::table.find(category.id))
            .execute(&mut conn)
            .unwrap();
        delete(crate::schema::users::table.find(customer.id()))
            .execute(&mut conn)
            .unwrap();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ServiceError::EmptyCart))));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].items.len(), 1);
        assert_eq!(orders[0].total(), price("25.98"));
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_pending_checkout_does_not_block_other_carts() {
        let Some(mut conn) = committing_connection() else {
            return;
        };
        let Some(mut other) = committing_connection() else {
            return;
        };
        let alice = customer(&mut conn);
        let bob = customer(&mut conn);
        let category = create_category_fixture(&mut conn);
        let salad = create_menu_item_fixture(&mut conn, &category, "Greek Salad", "12.99");
        add_to_cart(&mut conn, &alice, salad.id, 1).unwrap();
        diesel::sql_query("SET statement_timeout = 10000")
            .execute(&mut other)
            .unwrap();

        // Alice's checkout stays open while Bob orders the same dish.
        let mut alices = None;
        let mut bobs = None;
        let pending = conn.transaction::<(), diesel::result::Error, _>(|conn| {
            alices = Some(place_order(conn, &alice));
            bobs = Some((
                add_to_cart(&mut other, &bob, salad.id, 2),
                place_order(&mut other, &bob),
            ));
            Err(diesel::result::Error::RollbackTransaction)
        });
        let alices_cart = list_cart(&mut conn, &alice).unwrap();

        delete(
            crate::schema::users::table
                .filter(crate::schema::users::id.eq_any(vec![alice.id(), bob.id()])),
        )
        .execute(&mut conn)
        .unwrap();
        delete(menu_items::table.find(salad.id))
            .execute(&mut conn)
            .unwrap();
        delete(crate::schema::categories::table.find(category.id))
            .execute(&mut conn)
            .unwrap();

        assert!(matches!(
            pending,
            Err(diesel::result::Error::RollbackTransaction)
        ));
        assert!(matches!(alices, Some(Ok(_))));
        let (added, placed) = bobs.unwrap();
        assert_eq!(added.unwrap().line.quantity, 2);
        assert_eq!(placed.unwrap().total(), price("25.98"));
        assert_eq!(alices_cart.len(), 1);
    }

    #[test]
    fn test_failed_checkout_keeps_cart() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let customer = customer(&mut conn);
        let category = create_category_fixture(&mut conn);
        let salad = create_menu_item_fixture(&mut conn, &category, "Greek Salad", "12.99");
        add_to_cart(&mut conn, &customer, salad.id, 2).unwrap();
        conn.batch_execute(
            "CREATE FUNCTION reject_order_item() RETURNS trigger AS $$ \
             BEGIN RAISE EXCEPTION 'kitchen closed'; END; \
             $$ LANGUAGE plpgsql; \
             CREATE TRIGGER reject_order_item BEFORE INSERT ON order_items \
             FOR EACH ROW EXECUTE FUNCTION reject_order_item();",
        )
        .unwrap();

        assert!(matches!(
            place_order(&mut conn, &customer),
            Err(ServiceError::Internal(_))
        ));

        let cart = list_cart(&mut conn, &customer).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].line.quantity, 2);
        assert!(list_orders(&mut conn, &customer).unwrap().is_empty());
        let orders: i64 = orders::table
            .filter(orders::user_id.eq(customer.id()))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(orders, 0);
    }

    fn placed_order(conn: &mut PgConnection, customer: &Caller) -> OrderDetails {
        let category = create_category_fixture(conn);
        let item = create_menu_item_fixture(conn, &category, "Bruschetta", "7.50");
        add_to_cart(conn, customer, item.id, 1).unwrap();
        place_order(conn, customer).unwrap()
    }

    #[test]
    fn test_order_visibility_is_scoped() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let crew = delivery_crew(&mut conn);
        let alice = customer(&mut conn);
        let bob = customer(&mut conn);
        let alices = placed_order(&mut conn, &alice);
        let bobs = placed_order(&mut conn, &bob);

        update_order(
            &mut conn,
            &manager,
            alices.order.id,
            OrderPatch {
                delivery_crew: Some(Some(crew.id())),
                ..Default::default()
            },
        )
        .unwrap();

        let seen_by_alice = list_orders(&mut conn, &alice).unwrap();
        assert!(seen_by_alice.iter().all(|o| o.order.user_id == alice.id()));
        assert_eq!(seen_by_alice.len(), 1);

        let seen_by_crew = list_orders(&mut conn, &crew).unwrap();
        assert_eq!(seen_by_crew.len(), 1);
        assert_eq!(seen_by_crew[0].order.id, alices.order.id);

        let seen_by_manager: Vec<Uuid> = list_orders(&mut conn, &manager)
            .unwrap()
            .into_iter()
            .map(|o| o.order.id)
            .collect();
        assert!(seen_by_manager.contains(&alices.order.id));
        assert!(seen_by_manager.contains(&bobs.order.id));

        assert!(matches!(
            get_order(&mut conn, &alice, bobs.order.id),
            Err(ServiceError::NotFound("order"))
        ));
        assert!(matches!(
            get_order(&mut conn, &crew, bobs.order.id),
            Err(ServiceError::NotFound("order"))
        ));
    }

    #[test]
    fn test_assign_delivery_crew() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let crew = delivery_crew(&mut conn);
        let customer = customer(&mut conn);
        let placed = placed_order(&mut conn, &customer);
        let patch = OrderPatch {
            delivery_crew: Some(Some(crew.id())),
            ..Default::default()
        };

        let first = update_order(&mut conn, &manager, placed.order.id, patch).unwrap();
        let second = update_order(&mut conn, &manager, placed.order.id, patch).unwrap();

        assert_eq!(first.order.delivery_crew_id, Some(crew.id()));
        assert_eq!(first.status(), OrderStatus::OutForDelivery);
        assert_eq!(first, second);
    }

    #[test]
    fn test_assign_non_crew_user_is_rejected() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let customer = customer(&mut conn);
        let placed = placed_order(&mut conn, &customer);

        let result = update_order(
            &mut conn,
            &manager,
            placed.order.id,
            OrderPatch {
                delivery_crew: Some(Some(customer.id())),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        let unchanged = get_order(&mut conn, &manager, placed.order.id).unwrap();
        assert_eq!(unchanged, placed);
    }

    #[test]
    fn test_delivery_workflow() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let crew = delivery_crew(&mut conn);
        let customer = customer(&mut conn);
        let placed = placed_order(&mut conn, &customer);
        let deliver = OrderPatch {
            status: Some(true),
            ..Default::default()
        };

        assert!(matches!(
            update_order(&mut conn, &manager, placed.order.id, deliver),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            update_order(&mut conn, &crew, placed.order.id, deliver),
            Err(ServiceError::NotFound("order"))
        ));
        assert!(matches!(
            update_order(&mut conn, &customer, placed.order.id, deliver),
            Err(ServiceError::PermissionDenied)
        ));

        update_order(
            &mut conn,
            &manager,
            placed.order.id,
            OrderPatch {
                delivery_crew: Some(Some(crew.id())),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(
            update_order(
                &mut conn,
                &crew,
                placed.order.id,
                OrderPatch {
                    delivery_crew: Some(Some(crew.id())),
                    ..Default::default()
                },
            ),
            Err(ServiceError::PermissionDenied)
        ));

        let delivered = update_order(&mut conn, &crew, placed.order.id, deliver).unwrap();
        assert_eq!(delivered.status(), OrderStatus::Delivered);
        assert_eq!(delivered.total(), placed.total());
    }

    #[test]
    fn test_unassign_delivery_crew() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let crew = delivery_crew(&mut conn);
        let customer = customer(&mut conn);
        let placed = placed_order(&mut conn, &customer);
        let unassign = OrderPatch {
            delivery_crew: Some(None),
            ..Default::default()
        };
        update_order(
            &mut conn,
            &manager,
            placed.order.id,
            OrderPatch {
                delivery_crew: Some(Some(crew.id())),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(matches!(
            update_order(&mut conn, &crew, placed.order.id, unassign),
            Err(ServiceError::PermissionDenied)
        ));
        let unassigned = update_order(&mut conn, &manager, placed.order.id, unassign).unwrap();
        assert_eq!(unassigned.order.delivery_crew_id, None);
        assert_eq!(unassigned.status(), OrderStatus::NotYetSent);
        assert!(list_orders(&mut conn, &crew).unwrap().is_empty());

        update_order(
            &mut conn,
            &manager,
            placed.order.id,
            OrderPatch {
                status: Some(true),
                delivery_crew: Some(Some(crew.id())),
            },
        )
        .unwrap();
        assert!(matches!(
            update_order(&mut conn, &manager, placed.order.id, unassign),
            Err(ServiceError::Validation(_))
        ));
        let delivered = get_order(&mut conn, &manager, placed.order.id).unwrap();
        assert_eq!(delivered.order.delivery_crew_id, Some(crew.id()));
    }

    #[test]
    fn test_delete_order_cascades_items() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let customer = customer(&mut conn);
        let placed = placed_order(&mut conn, &customer);

        assert!(matches!(
            delete_order(&mut conn, &customer, placed.order.id),
            Err(ServiceError::PermissionDenied)
        ));
        delete_order(&mut conn, &manager, placed.order.id).unwrap();

        let remaining: i64 = order_items::table
            .filter(order_items::order_id.eq(placed.order.id))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            delete_order(&mut conn, &manager, placed.order.id),
            Err(ServiceError::NotFound("order"))
        ));
    }

    #[test]
    fn test_menu_item_in_order_cannot_be_deleted() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        let manager = manager(&mut conn);
        let customer = customer(&mut conn);
        let placed = placed_order(&mut conn, &customer);

        let result =
            crate::catalog::delete_menu_item(&mut conn, &manager, placed.items[0].menuitem_id);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(
            get_order(&mut conn, &customer, placed.order.id).unwrap(),
            placed
        );
    }
}
