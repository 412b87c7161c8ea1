//! The match engine: binds an online driver to a pending ride request.
//!
//! One transaction locks the request row, then the driver row, and flips both
//! together while inserting the ride. The row locks are the only coordination
//! between concurrent acceptors, which may live in different processes. A
//! second acceptor for the same request waits for the first one's lock, then
//! finds the request no longer `requested` and fails closed.

use model::{
    driver::{Driver, DriverStatus},
    ride::{NewRide, Ride},
    ride_request::{RideRequest, RideRequestStatus},
    WithId,
};
use utility::id::Id;

use crate::{
    config::DispatchConfig,
    database::{commit_or_rollback, Database, DatabaseTransaction},
    positive_id, DispatchError, DispatchResult,
};

pub async fn accept_request<D: Database>(
    database: &D,
    config: &DispatchConfig,
    driver_id: Id<Driver>,
    request_id: Id<RideRequest>,
) -> DispatchResult<WithId<Ride>> {
    let driver_id = positive_id(driver_id, "driver_id")?;
    let request_id = positive_id(request_id, "request_id")?;

    let mut tx = database.transaction().await?;
    let result = accept_within(&mut tx, config, driver_id, request_id).await;
    let ride = commit_or_rollback(tx, result).await?;

    log::info!(
        "driver {} accepted ride request {}, ride {} in progress",
        ride.content.driver_id,
        ride.content.request_id,
        ride.id
    );
    Ok(ride)
}

/// The body of the accept transaction. Does neither commit nor roll back.
pub async fn accept_within<T>(
    tx: &mut T,
    config: &DispatchConfig,
    driver_id: Id<Driver>,
    request_id: Id<RideRequest>,
) -> DispatchResult<WithId<Ride>>
where
    T: DatabaseTransaction + Send,
{
    tx.set_lock_timeout(config.lock_timeout).await?;

    // lock order: request, then driver
    let request = tx
        .lock_ride_request(request_id, RideRequestStatus::Requested)
        .await?
        .ok_or(DispatchError::RequestUnavailable(request_id))?;
    let driver = tx
        .lock_driver(driver_id, DriverStatus::Online)
        .await?
        .ok_or(DispatchError::DriverUnavailable(driver_id))?;

    tx.set_ride_request_status(request.id, RideRequestStatus::Accepted)
        .await?;
    tx.set_driver_status(driver.id, DriverStatus::OnRide).await?;

    // rider and locations come from the locked request, never from the caller
    let ride = NewRide::from_request(request.id, &request.content, driver.id);
    Ok(tx.insert_ride(ride).await?)
}
