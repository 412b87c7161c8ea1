use dispatch::database::Result;
use model::{rider::Rider, WithId};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{rider::RiderRow, with_id, with_id_optional};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: Id<Rider>) -> Result<Option<WithId<Rider>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            rider_id, name
        FROM
            riders
        WHERE rider_id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: Option<RiderRow>| with_id_optional(row))
}

/// Shared lock on the rider row. Blocks concurrent updates and deletes of the
/// rider until the transaction ends.
pub async fn get_for_share<'c, E>(
    executor: E,
    id: Id<Rider>,
) -> Result<Option<WithId<Rider>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            rider_id, name
        FROM
            riders
        WHERE rider_id = $1
        FOR SHARE;
        ",
    )
    .bind(id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: Option<RiderRow>| with_id_optional(row))
}

pub async fn insert<'c, E>(executor: E, rider: Rider) -> Result<WithId<Rider>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO riders (name)
        VALUES ($1)
        RETURNING rider_id, name;
        ",
    )
    .bind(rider.name)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: RiderRow| with_id(row))
}
