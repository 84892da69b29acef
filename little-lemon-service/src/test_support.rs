use std::{env, sync::OnceLock};

use bigdecimal::BigDecimal;
use diesel::{insert_into, prelude::*, Connection, PgConnection};
use dotenvy::dotenv;
use uuid::Uuid;

use crate::{
    access::Caller,
    establish_connection,
    models::{Category, MenuItem, NewCategory, NewMenuItem, Role, User, UserRole},
    run_migrations, schema, users,
};

static MIGRATED: OnceLock<bool> = OnceLock::new();

fn database_url() -> Option<String> {
    dotenv().ok();
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

fn migrated_database_url() -> Option<String> {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL is not set, skipping database test");
        return None;
    };
    let migrated = *MIGRATED.get_or_init(|| match establish_connection(&url) {
        Ok(mut conn) => run_migrations(&mut conn).is_ok(),
        Err(_) => false,
    });
    if migrated {
        Some(url)
    } else {
        eprintln!("test database unavailable, skipping database test");
        None
    }
}

/// A connection whose work is rolled back when it is dropped.
pub fn test_connection() -> Option<PgConnection> {
    let mut conn = committing_connection()?;
    conn.begin_test_transaction()
        .expect("Cannot begin test transaction");
    Some(conn)
}

/// A plain connection; whatever the test writes is committed.
pub fn committing_connection() -> Option<PgConnection> {
    let url = migrated_database_url()?;
    Some(establish_connection(&url).expect("Cannot connect to test database"))
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

pub fn price(amount: &str) -> BigDecimal {
    amount.parse().unwrap()
}

pub fn create_user_fixture(conn: &mut PgConnection, username: &str, is_staff: bool) -> User {
    let mut user = User::new(&unique(username));
    user.is_staff = is_staff;
    users::create_user(conn, user).unwrap()
}

pub fn grant(conn: &mut PgConnection, user: &User, role: Role) {
    insert_into(schema::user_roles::table)
        .values(UserRole {
            user_id: user.id,
            role,
        })
        .execute(conn)
        .unwrap();
}

pub fn caller_for(conn: &mut PgConnection, user: &User) -> Caller {
    users::load_caller(conn, user.id).unwrap()
}

pub fn customer(conn: &mut PgConnection) -> Caller {
    let user = create_user_fixture(conn, "customer", false);
    caller_for(conn, &user)
}

pub fn manager(conn: &mut PgConnection) -> Caller {
    let user = create_user_fixture(conn, "manager", true);
    grant(conn, &user, Role::Manager);
    caller_for(conn, &user)
}

pub fn delivery_crew(conn: &mut PgConnection) -> Caller {
    let user = create_user_fixture(conn, "crew", false);
    grant(conn, &user, Role::DeliveryCrew);
    caller_for(conn, &user)
}

pub fn create_category_fixture(conn: &mut PgConnection) -> Category {
    let slug = unique("mains");
    insert_into(schema::categories::table)
        .values(NewCategory {
            title: slug.to_uppercase(),
            slug,
        })
        .returning(Category::as_returning())
        .get_result(conn)
        .unwrap()
}

pub fn create_menu_item_fixture(
    conn: &mut PgConnection,
    category: &Category,
    title: &str,
    amount: &str,
) -> MenuItem {
    insert_into(schema::menu_items::table)
        .values(NewMenuItem {
            title: unique(title),
            price: price(amount),
            featured: false,
            category_id: category.id,
        })
        .returning(MenuItem::as_returning())
        .get_result(conn)
        .unwrap()
}
