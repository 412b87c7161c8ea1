use dispatch::database::Result;
use model::{
    ride::{NewRide, Ride},
    ride_request::RideRequest,
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{ride::RideRow, with_id, with_ids};

use super::convert_error;

/// `start_time` is the transaction's timestamp.
pub async fn insert<'c, E>(executor: E, ride: NewRide) -> Result<WithId<Ride>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO rides (
            request_id,
            driver_id,
            rider_id,
            pickup_location_id,
            dropoff_location_id,
            start_time,
            status
        )
        VALUES ($1, $2, $3, $4, $5, NOW(), $6)
        RETURNING
            ride_id, request_id, driver_id, rider_id, pickup_location_id,
            dropoff_location_id, start_time, status;
        ",
    )
    .bind(ride.request_id.raw())
    .bind(ride.driver_id.raw())
    .bind(ride.rider_id.raw())
    .bind(ride.pickup_location_id.raw())
    .bind(ride.dropoff_location_id.raw())
    .bind(ride.status.as_str())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .and_then(|row: RideRow| with_id(row))
}

pub async fn get_by_request<'c, E>(
    executor: E,
    request_id: Id<RideRequest>,
) -> Result<Vec<WithId<Ride>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            ride_id, request_id, driver_id, rider_id, pickup_location_id,
            dropoff_location_id, start_time, status
        FROM
            rides
        WHERE request_id = $1
        ORDER BY ride_id ASC;
        ",
    )
    .bind(request_id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)
    .and_then(|rows: Vec<RideRow>| with_ids(rows))
}
