use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use log::{error, info};

use crate::error::AppError;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub fn establish_pool(database_url: &str) -> Result<PgPool, AppError> {
    info!("Connecting to database");
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().build(manager).map_err(|e| {
        error!("Failed to establish database connection: {}", e);
        AppError::from(e)
    })?;

    let mut conn = pool.get()?;
    let test_query: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
        .get_result(&mut conn)?;
    info!("Database test query result: {}", test_query);
    Ok(pool)
}
