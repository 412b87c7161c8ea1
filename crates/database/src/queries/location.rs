use dispatch::database::Result;
use model::{location::Location, WithId};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{location::LocationRow, with_id, with_id_optional};

use super::convert_error;

pub async fn get<'c, E>(
    executor: E,
    id: Id<Location>,
) -> Result<Option<WithId<Location>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            location_id, address
        FROM
            locations
        WHERE location_id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: Option<LocationRow>| with_id_optional(row))
}

pub async fn insert<'c, E>(executor: E, location: Location) -> Result<WithId<Location>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO locations (address)
        VALUES ($1)
        RETURNING location_id, address;
        ",
    )
    .bind(location.address)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: LocationRow| with_id(row))
}
