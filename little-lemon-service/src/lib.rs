use diesel::{
    r2d2::{ConnectionManager, Pool, PoolError},
    Connection, ConnectionError, PgConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub mod access;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod groups;
pub mod models;
pub mod orders;
pub mod schema;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

pub use access::{Caller, Operation, OrderView};
pub use error::ServiceError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn establish_connection(database_url: &str) -> Result<PgConnection, ConnectionError> {
    PgConnection::establish(database_url)
}

pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().max_size(max_size).build(manager)
}

/// Applies every migration not yet recorded and returns their versions.
pub fn run_migrations(
    conn: &mut PgConnection,
) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    Ok(applied.into_iter().map(|v| v.to_string()).collect())
}
