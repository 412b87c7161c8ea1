use dispatch::database::DatabaseError;

pub mod driver;
pub mod location;
pub mod ride;
pub mod ride_request;
pub mod rider;

/// Postgres error code of `lock_not_available`, raised when `lock_timeout`
/// expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(ref db)
            if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) =>
        {
            DatabaseError::LockTimeout
        }
        _ => DatabaseError::Other(Box::new(why)),
    }
}

/// Updates must hit exactly one row.
pub(crate) fn expect_one_row(
    result: sqlx::postgres::PgQueryResult,
) -> dispatch::database::Result<()> {
    match result.rows_affected() {
        0 => Err(DatabaseError::NotFound),
        _ => Ok(()),
    }
}
