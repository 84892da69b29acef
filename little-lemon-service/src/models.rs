use std::{fmt, io::Write, str::FromStr};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use uuid::Uuid;

use crate::schema::{
    cart_lines, categories, menu_items, order_items, orders, user_roles, users,
};

#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::RoleName)]
pub enum Role {
    Manager,
    DeliveryCrew,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Manager, Role::DeliveryCrew];

    /// Group name shown to clients.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::DeliveryCrew => "Delivery Crew",
        }
    }

    /// Path segment used by the group membership endpoints.
    pub fn slug(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::DeliveryCrew => "delivery-crew",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown group `{}`", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.slug() == s || role.name() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl ToSql<crate::schema::sql_types::RoleName, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            Role::Manager => out.write_all(b"MANAGER")?,
            Role::DeliveryCrew => out.write_all(b"DELIVERY_CREW")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::RoleName, Pg> for Role {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"MANAGER" => Ok(Role::Manager),
            b"DELIVERY_CREW" => Ok(Role::DeliveryCrew),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Insertable, Debug, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(table_name = user_roles, primary_key(user_id, role))]
pub struct UserRole {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub slug: String,
    pub title: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub slug: String,
    pub title: String,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = categories)]
pub struct CategoryChanges {
    pub slug: Option<String>,
    pub title: Option<String>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.slug.is_none() && self.title.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug, PartialEq)]
#[diesel(belongs_to(Category))]
#[diesel(table_name = menu_items)]
pub struct MenuItem {
    pub id: i32,
    pub title: String,
    pub price: BigDecimal,
    pub featured: bool,
    pub category_id: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = menu_items)]
pub struct NewMenuItem {
    pub title: String,
    pub price: BigDecimal,
    pub featured: bool,
    pub category_id: i32,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = menu_items)]
pub struct MenuItemChanges {
    pub title: Option<String>,
    pub price: Option<BigDecimal>,
    pub featured: Option<bool>,
    pub category_id: Option<i32>,
}

impl MenuItemChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.featured.is_none()
            && self.category_id.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug, PartialEq)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(MenuItem, foreign_key = menuitem_id))]
#[diesel(table_name = cart_lines)]
pub struct CartLine {
    pub id: i32,
    pub user_id: Uuid,
    pub menuitem_id: i32,
    pub quantity: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = cart_lines)]
pub struct NewCartLine {
    pub user_id: Uuid,
    pub menuitem_id: i32,
    pub quantity: i32,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_crew_id: Option<Uuid>,
    pub status: bool,
    pub date: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_items)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: Uuid,
    pub menuitem_id: i32,
    pub title: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub price: BigDecimal,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub menuitem_id: i32,
    pub title: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub price: BigDecimal,
}
