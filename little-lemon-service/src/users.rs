use diesel::{insert_into, prelude::*, result::DatabaseErrorKind, Connection, PgConnection};
use uuid::Uuid;

use crate::{
    access::Caller,
    error::{violated_constraint, ServiceError},
    models::{Role, User, UserRole},
    schema,
};

pub fn find_by_username(conn: &mut PgConnection, username: &str) -> Result<User, ServiceError> {
    schema::users::table
        .select(User::as_select())
        .filter(schema::users::username.eq(username))
        .first::<User>(conn)
        .optional()?
        .ok_or(ServiceError::NotFound("user"))
}

/// Resolves the user behind an authenticated request along with their groups.
pub fn load_caller(conn: &mut PgConnection, user_id: Uuid) -> Result<Caller, ServiceError> {
    let user = schema::users::table
        .select(User::as_select())
        .find(user_id)
        .first::<User>(conn)
        .optional()?
        .ok_or(ServiceError::NotFound("user"))?;
    let roles = roles_of(conn, &user)?;
    Ok(Caller::new(user, roles))
}

/// Provisions an account; used to bootstrap administrators from the CLI.
pub fn create_user(conn: &mut PgConnection, user: User) -> Result<User, ServiceError> {
    if user.username.trim().is_empty() {
        return Err(ServiceError::BadRequest("username is required".to_string()));
    }

    conn.transaction(|conn| {
        insert_into(schema::users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(|err| match violated_constraint(&err) {
                Some(DatabaseErrorKind::UniqueViolation) => ServiceError::validation(format!(
                    "A user with username `{}` already exists",
                    user.username
                )),
                _ => err.into(),
            })
    })
}

/// The groups `user` belongs to.
pub fn roles_of(conn: &mut PgConnection, user: &User) -> Result<Vec<Role>, ServiceError> {
    Ok(UserRole::belonging_to(user)
        .select(schema::user_roles::role)
        .load(conn)?)
}
