use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::fmt::Debug;

const SCHEMA_SQL: &str = include_str!("../migrations/2024-11-02-000000_create_blog_tables/up.sql");

pub fn establish_test_connection() -> PgConnection {
    dotenv::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgConnection::establish(&database_url)
        .unwrap_or_else(|_| panic!("Error connecting to {}", database_url))
}

/// Runs `f` inside a transaction that is always rolled back.
///
/// Callers are `#[ignore]`d tests; run them with `cargo test -- --ignored`
/// against a Postgres database.
pub fn with_test_db<E, F>(f: F)
where
    E: Debug + From<diesel::result::Error>,
    F: FnOnce(&mut PgConnection) -> Result<(), E>,
{
    let mut conn = establish_test_connection();

    conn.test_transaction::<_, E, _>(|conn| {
        conn.batch_execute(SCHEMA_SQL)?;
        f(conn)
    });
}
