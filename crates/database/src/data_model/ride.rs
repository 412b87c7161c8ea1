use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch::database::{Result, RideRepo};
use model::{
    ride::{NewRide, Ride},
    ride_request::RideRequest,
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::{parse_status, DatabaseRow};
use crate::{
    queries::ride::{get_by_request, insert},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

/// Table: `rides`
#[derive(Debug, Clone, FromRow)]
pub struct RideRow {
    pub ride_id: i64,
    pub request_id: i64,
    pub driver_id: i64,
    pub rider_id: i64,
    pub pickup_location_id: i64,
    pub dropoff_location_id: i64,
    pub start_time: DateTime<Utc>,
    pub status: String,
}

impl DatabaseRow for RideRow {
    type Model = Ride;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.ride_id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Ride {
            request_id: Id::new(self.request_id),
            driver_id: Id::new(self.driver_id),
            rider_id: Id::new(self.rider_id),
            pickup_location_id: Id::new(self.pickup_location_id),
            dropoff_location_id: Id::new(self.dropoff_location_id),
            start_time: self.start_time,
            status: parse_status(&self.status)?,
        })
    }
}

#[async_trait]
impl RideRepo for PgDatabaseAutocommit {
    async fn insert_ride(&mut self, ride: NewRide) -> Result<WithId<Ride>> {
        insert(&self.pool, ride).await
    }

    async fn rides_for_request(
        &mut self,
        request_id: Id<RideRequest>,
    ) -> Result<Vec<WithId<Ride>>> {
        get_by_request(&self.pool, request_id).await
    }
}

#[async_trait]
impl<'a> RideRepo for PgDatabaseTransaction<'a> {
    async fn insert_ride(&mut self, ride: NewRide) -> Result<WithId<Ride>> {
        insert(&mut *self.tx, ride).await
    }

    async fn rides_for_request(
        &mut self,
        request_id: Id<RideRequest>,
    ) -> Result<Vec<WithId<Ride>>> {
        get_by_request(&mut *self.tx, request_id).await
    }
}
