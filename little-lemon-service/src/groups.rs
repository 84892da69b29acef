use diesel::{delete, dsl::exists, insert_into, prelude::*, select, update, PgConnection};
use tracing::info;
use uuid::Uuid;

use crate::{
    access::{Caller, Operation},
    error::ServiceError,
    models::{Role, User, UserRole},
    schema::{user_roles, users},
    users::find_by_username,
};

/// Whether `user_id` belongs to the group for `role`.
pub fn has_role(conn: &mut PgConnection, user_id: Uuid, role: Role) -> QueryResult<bool> {
    select(exists(
        user_roles::table
            .filter(user_roles::user_id.eq(user_id))
            .filter(user_roles::role.eq(role)),
    ))
    .get_result(conn)
}

/// Usernames of every member of the group, alphabetically.
pub fn list_members(
    conn: &mut PgConnection,
    caller: &Caller,
    role: Role,
) -> Result<Vec<String>, ServiceError> {
    Operation::ListGroupMembers.authorize(caller)?;
    Ok(users::table
        .inner_join(user_roles::table)
        .filter(user_roles::role.eq(role))
        .select(users::username)
        .order(users::username.asc())
        .load(conn)?)
}

fn required_username(username: Option<&str>) -> Result<&str, ServiceError> {
    match username.map(str::trim) {
        Some(username) if !username.is_empty() => Ok(username),
        _ => Err(ServiceError::BadRequest("username is required".to_string())),
    }
}

/// Adds a user to a group. Adding an existing member is a no-op. Managers
/// are also granted staff status.
pub fn assign_to_group(
    conn: &mut PgConnection,
    caller: &Caller,
    role: Role,
    username: Option<&str>,
) -> Result<User, ServiceError> {
    Operation::AssignToGroup.authorize(caller)?;
    let username = required_username(username)?;

    conn.transaction(|conn| {
        let mut user = find_by_username(conn, username)?;
        insert_into(user_roles::table)
            .values(UserRole {
                user_id: user.id,
                role,
            })
            .on_conflict_do_nothing()
            .execute(conn)?;
        if role == Role::Manager && !user.is_staff {
            user = set_staff(conn, user.id, true)?;
        }
        info!(
            user = %user.username,
            group = %role,
            by = %caller.user.username,
            "assigned to group"
        );
        Ok(user)
    })
}

/// Removes a user from a group. Removing a non-member is a no-op. Leaving
/// the Manager group revokes staff status.
pub fn remove_from_group(
    conn: &mut PgConnection,
    caller: &Caller,
    role: Role,
    username: Option<&str>,
) -> Result<User, ServiceError> {
    Operation::RemoveFromGroup.authorize(caller)?;
    let username = required_username(username)?;

    conn.transaction(|conn| {
        let mut user = find_by_username(conn, username)?;
        delete(
            user_roles::table
                .filter(user_roles::user_id.eq(user.id))
                .filter(user_roles::role.eq(role)),
        )
        .execute(conn)?;
        if role == Role::Manager && user.is_staff {
            user = set_staff(conn, user.id, false)?;
        }
        info!(
            user = %user.username,
            group = %role,
            by = %caller.user.username,
            "removed from group"
        );
        Ok(user)
    })
}

fn set_staff(conn: &mut PgConnection, user_id: Uuid, is_staff: bool) -> QueryResult<User> {
    update(users::table.find(user_id))
        .set(users::is_staff.eq(is_staff))
        .returning(User::as_returning())
        .get_result(conn)
}
