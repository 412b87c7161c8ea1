//! Request intake: turns a rider's wish into a ride request in the
//! `requested` state.
//!
//! Lookups and the routing call happen before the transaction begins, so no
//! row lock is ever held while waiting for the routing service. The
//! transaction itself only re-checks the rider under a shared lock and inserts
//! the request.

use model::{
    location::Location,
    ride_request::RideRequest,
    rider::Rider,
    WithId,
};
use utility::id::Id;

use crate::{
    config::DispatchConfig,
    database::{
        commit_or_rollback, Database, DatabaseTransaction, LocationRepo, RiderRepo,
    },
    positive_id,
    routing::{estimate_with_timeout, RoutingService},
    DispatchError, DispatchResult,
};

pub async fn submit_request<D: Database>(
    database: &D,
    routing: &dyn RoutingService,
    config: &DispatchConfig,
    rider_id: Id<Rider>,
    pickup_location_id: Id<Location>,
    dropoff_location_id: Id<Location>,
) -> DispatchResult<WithId<RideRequest>> {
    let rider_id = positive_id(rider_id, "rider_id")?;
    let pickup_location_id = positive_id(pickup_location_id, "pickup_location_id")?;
    let dropoff_location_id =
        positive_id(dropoff_location_id, "dropoff_location_id")?;

    // resolve everything outside of the transaction
    let mut auto = database.auto();
    if auto.rider(rider_id).await?.is_none() {
        return Err(DispatchError::InvalidRider(rider_id));
    }
    let pickup = auto
        .location(pickup_location_id)
        .await?
        .ok_or(DispatchError::InvalidLocation(pickup_location_id))?;
    let dropoff = auto
        .location(dropoff_location_id)
        .await?
        .ok_or(DispatchError::InvalidLocation(dropoff_location_id))?;

    let mut request =
        RideRequest::requested(rider_id, pickup_location_id, dropoff_location_id);
    if config.with_estimate {
        let estimate = estimate_with_timeout(
            routing,
            &pickup.content.address,
            &dropoff.content.address,
            config.routing_timeout,
        )
        .await
        .map_err(|why| {
            log::warn!(
                "no estimate from `{}` to `{}`: {why}",
                pickup.content.address,
                dropoff.content.address
            );
            DispatchError::EstimateUnavailable(why)
        })?;
        request = request.with_estimate(
            config.pricing.price(estimate.distance_km),
            estimate.whole_minutes(),
        );
    }

    let mut tx = database.transaction().await?;
    let result = insert_request(&mut tx, config, request).await;
    let request = commit_or_rollback(tx, result).await?;

    log::info!(
        "ride request {} created for rider {}",
        request.id,
        request.content.rider_id
    );
    Ok(request)
}

async fn insert_request<T>(
    tx: &mut T,
    config: &DispatchConfig,
    request: RideRequest,
) -> DispatchResult<WithId<RideRequest>>
where
    T: DatabaseTransaction + Send,
{
    tx.set_lock_timeout(config.lock_timeout).await?;

    // the rider may have been removed since the lookup above
    let rider_id = request.rider_id;
    if tx.share_rider(rider_id).await?.is_none() {
        return Err(DispatchError::InvalidRider(rider_id));
    }

    Ok(tx.insert_ride_request(request).await?)
}
