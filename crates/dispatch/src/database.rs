use std::{error, result, time::Duration};

use async_trait::async_trait;
use model::{
    driver::{Driver, DriverStatus},
    location::Location,
    ride::{NewRide, Ride},
    ride_request::{RideRequest, RideRequestStatus},
    rider::Rider,
    WithId,
};
use thiserror::Error;
use utility::id::Id;

use crate::DispatchResult;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("row not found")]
    NotFound,

    #[error("timed out waiting for a row lock")]
    LockTimeout,

    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync>),
}

impl DatabaseError {
    pub fn other<E: error::Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Other(Box::new(why))
    }
}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait RiderRepo {
    async fn rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>>;

    async fn insert_rider(&mut self, rider: Rider) -> Result<WithId<Rider>>;
}

#[async_trait]
pub trait LocationRepo {
    async fn location(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>>;

    async fn insert_location(
        &mut self,
        location: Location,
    ) -> Result<WithId<Location>>;
}

#[async_trait]
pub trait DriverRepo {
    async fn driver(&mut self, id: Id<Driver>) -> Result<Option<WithId<Driver>>>;

    async fn insert_driver(&mut self, driver: Driver) -> Result<WithId<Driver>>;

    /// Fails with `DatabaseError::NotFound` if the driver does not exist.
    async fn set_driver_status(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<()>;
}

#[async_trait]
pub trait RideRequestRepo {
    async fn ride_request(
        &mut self,
        id: Id<RideRequest>,
    ) -> Result<Option<WithId<RideRequest>>>;

    async fn insert_ride_request(
        &mut self,
        request: RideRequest,
    ) -> Result<WithId<RideRequest>>;

    /// Fails with `DatabaseError::NotFound` if the request does not exist.
    async fn set_ride_request_status(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<()>;
}

#[async_trait]
pub trait RideRepo {
    /// Inserts a ride, the store sets `start_time` to its current time.
    /// There is at most one ride per request.
    async fn insert_ride(&mut self, ride: NewRide) -> Result<WithId<Ride>>;

    async fn rides_for_request(
        &mut self,
        request_id: Id<RideRequest>,
    ) -> Result<Vec<WithId<Ride>>>;
}

pub trait DatabaseOperations:
    RiderRepo + LocationRepo + DriverRepo + RideRequestRepo + RideRepo
{
}

impl<T> DatabaseOperations for T where
    T: RiderRepo + LocationRepo + DriverRepo + RideRequestRepo + RideRepo
{
}

/// Row locks, held until the owning transaction commits or rolls back.
///
/// Every `lock_*`/`share_*` call returns `None` if no row matches the
/// predicate *after* the lock was granted. A caller which had to wait for
/// another transaction therefore sees that transaction's committed changes,
/// e.g. a request which was accepted in the meantime no longer matches
/// `status = requested`.
///
/// Transactions locking more than one row must always lock ride requests
/// before drivers.
#[async_trait]
pub trait RowLocks {
    /// Shared lock: concurrent readers pass, writers and deleters block.
    async fn share_rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>>;

    /// Exclusive lock on the request matching both `id` and `status`.
    async fn lock_ride_request(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<Option<WithId<RideRequest>>>;

    /// Exclusive lock on the driver matching both `id` and `status`.
    async fn lock_driver(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<Option<WithId<Driver>>>;
}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations + RowLocks {
    /// Bounds every following lock wait of this transaction. Exceeding it fails
    /// the waiting call with `DatabaseError::LockTimeout`.
    async fn set_lock_timeout(&mut self, timeout: Duration) -> Result<()>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

pub trait DatabaseAutocommit: DatabaseOperations {}

/// A store shared by any number of concurrent units of work, e.g. by cloning
/// the database object. All coordination happens through row locks inside
/// transactions.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send;
    type Autocommit: DatabaseAutocommit + Send;

    async fn transaction(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;
}

/// Commits on success. On failure the transaction is rolled back before the
/// error is handed on, so no error path leaves a transaction open.
pub(crate) async fn commit_or_rollback<T, X>(
    tx: X,
    result: DispatchResult<T>,
) -> DispatchResult<T>
where
    X: DatabaseTransaction + Send,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(why) => {
            if let Err(rollback) = tx.rollback().await {
                log::error!("rollback failed after `{why}`: {rollback}");
            }
            Err(why)
        }
    }
}
