use dispatch::database::Result;
use model::{
    driver::{Driver, DriverStatus},
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{driver::DriverRow, with_id, with_id_optional};

use super::{convert_error, expect_one_row};

pub async fn get<'c, E>(executor: E, id: Id<Driver>) -> Result<Option<WithId<Driver>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            driver_id, name, status
        FROM
            drivers
        WHERE driver_id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: Option<DriverRow>| with_id_optional(row))
}

/// Exclusive lock on the driver, if it has `status`. The status predicate is
/// re-evaluated by postgres once the lock is granted.
pub async fn get_for_update<'c, E>(
    executor: E,
    id: Id<Driver>,
    status: DriverStatus,
) -> Result<Option<WithId<Driver>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            driver_id, name, status
        FROM
            drivers
        WHERE driver_id = $1 AND status = $2
        FOR UPDATE;
        ",
    )
    .bind(id.raw())
    .bind(status.as_str())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: Option<DriverRow>| with_id_optional(row))
}

pub async fn insert<'c, E>(executor: E, driver: Driver) -> Result<WithId<Driver>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO drivers (name, status)
        VALUES ($1, $2)
        RETURNING driver_id, name, status;
        ",
    )
    .bind(driver.name)
    .bind(driver.status.as_str())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: DriverRow| with_id(row))
}

pub async fn set_status<'c, E>(
    executor: E,
    id: Id<Driver>,
    status: DriverStatus,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        UPDATE drivers
        SET status = $2
        WHERE driver_id = $1;
        ",
    )
    .bind(id.raw())
    .bind(status.as_str())
    .execute(executor)
    .await
    .map_err(convert_error)
    .and_then(expect_one_row)
}
