use dispatch::database::Result;
use model::{
    ride_request::{RideRequest, RideRequestStatus},
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{ride_request::RideRequestRow, with_id, with_id_optional};

use super::{convert_error, expect_one_row};

pub async fn get<'c, E>(
    executor: E,
    id: Id<RideRequest>,
) -> Result<Option<WithId<RideRequest>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            request_id, rider_id, pickup_location_id, dropoff_location_id,
            status, estimated_price, estimated_time
        FROM
            ride_requests
        WHERE request_id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: Option<RideRequestRow>| with_id_optional(row))
}

/// Exclusive lock on the request, if it has `status`. A transaction which had
/// to wait for the lock sees the status committed by the previous holder.
pub async fn get_for_update<'c, E>(
    executor: E,
    id: Id<RideRequest>,
    status: RideRequestStatus,
) -> Result<Option<WithId<RideRequest>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            request_id, rider_id, pickup_location_id, dropoff_location_id,
            status, estimated_price, estimated_time
        FROM
            ride_requests
        WHERE request_id = $1 AND status = $2
        FOR UPDATE;
        ",
    )
    .bind(id.raw())
    .bind(status.as_str())
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: Option<RideRequestRow>| with_id_optional(row))
}

pub async fn insert<'c, E>(
    executor: E,
    request: RideRequest,
) -> Result<WithId<RideRequest>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO ride_requests (
            rider_id,
            pickup_location_id,
            dropoff_location_id,
            status,
            estimated_price,
            estimated_time
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING
            request_id, rider_id, pickup_location_id, dropoff_location_id,
            status, estimated_price, estimated_time;
        ",
    )
    .bind(request.rider_id.raw())
    .bind(request.pickup_location_id.raw())
    .bind(request.dropoff_location_id.raw())
    .bind(request.status.as_str())
    .bind(request.estimated_price)
    .bind(request.estimated_time)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: RideRequestRow| with_id(row))
}

pub async fn set_status<'c, E>(
    executor: E,
    id: Id<RideRequest>,
    status: RideRequestStatus,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        UPDATE ride_requests
        SET status = $2
        WHERE request_id = $1;
        ",
    )
    .bind(id.raw())
    .bind(status.as_str())
    .execute(executor)
    .await
    .map_err(convert_error)
    .and_then(expect_one_row)
}
