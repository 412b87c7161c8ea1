#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use database::memory::MemoryDatabase;
use dispatch::{
    config::DispatchConfig,
    database::{Database, DriverRepo, LocationRepo, RideRequestRepo, RiderRepo},
    dispatcher::Dispatcher,
    routing::{RoutingError, RoutingService, TravelEstimate},
};
use model::{
    driver::{Driver, DriverStatus},
    location::Location,
    ride_request::RideRequest,
    rider::Rider,
};
use utility::id::Id;

/// Answers every call with the same result, optionally after a delay, and
/// counts the calls.
pub struct FixedRouting {
    result: Result<TravelEstimate, RoutingError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedRouting {
    pub fn answering(distance_km: f64, duration_minutes: f64) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(TravelEstimate {
                distance_km,
                duration_minutes,
            }),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(why: RoutingError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(why),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn hanging(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(TravelEstimate {
                distance_km: 1.0,
                duration_minutes: 1.0,
            }),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingService for FixedRouting {
    async fn estimate_travel(
        &self,
        _origin_address: &str,
        _destination_address: &str,
    ) -> Result<TravelEstimate, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

/// A rider with two known locations.
pub struct Fixture {
    pub database: MemoryDatabase,
    pub rider: Id<Rider>,
    pub pickup: Id<Location>,
    pub dropoff: Id<Location>,
}

impl Fixture {
    pub async fn new() -> Self {
        let database = MemoryDatabase::new();
        let mut auto = database.auto();
        let rider = auto
            .insert_rider(Rider {
                name: "Ada Lovelace".to_owned(),
            })
            .await
            .unwrap()
            .id;
        let pickup = auto
            .insert_location(Location {
                address: "Holstenplatz 1, 24103 Kiel".to_owned(),
            })
            .await
            .unwrap()
            .id;
        let dropoff = auto
            .insert_location(Location {
                address: "Bahnhofstraße 5, 24223 Schwentinental".to_owned(),
            })
            .await
            .unwrap()
            .id;
        Self {
            database,
            rider,
            pickup,
            dropoff,
        }
    }

    pub fn dispatcher(
        &self,
        routing: Arc<dyn RoutingService>,
        config: DispatchConfig,
    ) -> Dispatcher<MemoryDatabase> {
        Dispatcher::new(self.database.clone(), routing, config)
    }

    /// A dispatcher which never needs the routing service.
    pub fn matcher(&self, config: DispatchConfig) -> Dispatcher<MemoryDatabase> {
        self.dispatcher(
            FixedRouting::answering(0.0, 0.0),
            DispatchConfig {
                with_estimate: false,
                ..config
            },
        )
    }

    pub async fn online_driver(&self, name: &str) -> Id<Driver> {
        self.driver(name, DriverStatus::Online).await
    }

    pub async fn driver(&self, name: &str, status: DriverStatus) -> Id<Driver> {
        self.database
            .auto()
            .insert_driver(Driver {
                name: name.to_owned(),
                status,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn pending_request(&self) -> Id<RideRequest> {
        self.database
            .auto()
            .insert_ride_request(RideRequest::requested(
                self.rider,
                self.pickup,
                self.dropoff,
            ))
            .await
            .unwrap()
            .id
    }

    pub async fn request(&self, id: Id<RideRequest>) -> RideRequest {
        self.database
            .auto()
            .ride_request(id)
            .await
            .unwrap()
            .unwrap()
            .content
    }

    pub async fn driver_status(&self, id: Id<Driver>) -> DriverStatus {
        self.database
            .auto()
            .driver(id)
            .await
            .unwrap()
            .unwrap()
            .content
            .status
    }
}
