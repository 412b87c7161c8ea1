use async_trait::async_trait;
use dispatch::database::{Result, RideRequestRepo};
use model::{
    ride_request::{RideRequest, RideRequestStatus},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::{parse_status, DatabaseRow};
use crate::{
    queries::ride_request::{get, insert, set_status},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

/// Table: `ride_requests`
#[derive(Debug, Clone, FromRow)]
pub struct RideRequestRow {
    pub request_id: i64,
    pub rider_id: i64,
    pub pickup_location_id: i64,
    pub dropoff_location_id: i64,
    pub status: String,
    pub estimated_price: Option<f64>,
    pub estimated_time: Option<i32>,
}

impl DatabaseRow for RideRequestRow {
    type Model = RideRequest;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.request_id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(RideRequest {
            rider_id: Id::new(self.rider_id),
            pickup_location_id: Id::new(self.pickup_location_id),
            dropoff_location_id: Id::new(self.dropoff_location_id),
            status: parse_status(&self.status)?,
            estimated_price: self.estimated_price,
            estimated_time: self.estimated_time,
        })
    }
}

#[async_trait]
impl RideRequestRepo for PgDatabaseAutocommit {
    async fn ride_request(
        &mut self,
        id: Id<RideRequest>,
    ) -> Result<Option<WithId<RideRequest>>> {
        get(&self.pool, id).await
    }

    async fn insert_ride_request(
        &mut self,
        request: RideRequest,
    ) -> Result<WithId<RideRequest>> {
        insert(&self.pool, request).await
    }

    async fn set_ride_request_status(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<()> {
        set_status(&self.pool, id, status).await
    }
}

#[async_trait]
impl<'a> RideRequestRepo for PgDatabaseTransaction<'a> {
    async fn ride_request(
        &mut self,
        id: Id<RideRequest>,
    ) -> Result<Option<WithId<RideRequest>>> {
        get(&mut *self.tx, id).await
    }

    async fn insert_ride_request(
        &mut self,
        request: RideRequest,
    ) -> Result<WithId<RideRequest>> {
        insert(&mut *self.tx, request).await
    }

    async fn set_ride_request_status(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<()> {
        set_status(&mut *self.tx, id, status).await
    }
}
