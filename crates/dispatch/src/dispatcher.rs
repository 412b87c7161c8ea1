use std::sync::Arc;

use model::{
    driver::Driver, location::Location, ride::Ride, ride_request::RideRequest,
    rider::Rider, WithId,
};
use utility::id::Id;

use crate::{
    config::DispatchConfig, database::Database, intake, matching,
    routing::RoutingService, DispatchError, DispatchResult,
};

/// Entry point for both dispatch operations. Cheap to clone, every clone
/// shares the same store, routing service and configuration.
#[derive(Clone)]
pub struct Dispatcher<D>
where
    D: Database,
{
    database: D,
    routing: Arc<dyn RoutingService>,
    config: Arc<DispatchConfig>,
}

impl<D> Dispatcher<D>
where
    D: Database,
{
    pub fn new(
        database: D,
        routing: Arc<dyn RoutingService>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            database,
            routing,
            config: Arc::new(config),
        }
    }

    pub async fn submit_request(
        &self,
        rider_id: Id<Rider>,
        pickup_location_id: Id<Location>,
        dropoff_location_id: Id<Location>,
    ) -> DispatchResult<WithId<RideRequest>> {
        intake::submit_request(
            &self.database,
            self.routing.as_ref(),
            &self.config,
            rider_id,
            pickup_location_id,
            dropoff_location_id,
        )
        .await
        .inspect_err(|why| log_failure("submit ride request", why))
    }

    pub async fn accept_request(
        &self,
        driver_id: Id<Driver>,
        request_id: Id<RideRequest>,
    ) -> DispatchResult<WithId<Ride>> {
        matching::accept_request(&self.database, &self.config, driver_id, request_id)
            .await
            .inspect_err(|why| log_failure("accept ride request", why))
    }
}

/// Lost races are expected under contention and are not anomalies.
fn log_failure(operation: &str, why: &DispatchError) {
    if why.is_internal() {
        log::error!("{operation} failed: {why}");
    } else if why.is_conflict() {
        log::debug!("{operation} lost to a concurrent one: {why}");
    } else {
        log::info!("{operation} rejected: {why}");
    }
}
