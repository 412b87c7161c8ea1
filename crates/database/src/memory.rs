//! An in-process store with the same locking semantics as the postgres
//! implementation: row locks are held until commit or rollback, and a lock
//! predicate is evaluated only after the lock was granted.
//!
//! Writes of a transaction are buffered and applied all at once on commit.
//! Reads inside a transaction see the committed state plus the transaction's
//! own writes. Autocommit handles run every statement in a transaction of its
//! own.
//!
//! Faults can be injected to make a specific operation fail once, which lets
//! tests break a transaction half way through.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use dispatch::database::{
    Database, DatabaseAutocommit, DatabaseError, DatabaseTransaction, DriverRepo,
    LocationRepo, Result, RideRepo, RideRequestRepo, RiderRepo, RowLocks,
};
use model::{
    driver::{Driver, DriverStatus},
    location::Location,
    ride::{NewRide, Ride},
    ride_request::{RideRequest, RideRequestStatus},
    rider::Rider,
    WithId,
};
use thiserror::Error;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use utility::id::Id;

/// An operation which can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    InsertRideRequest,
    SetRideRequestStatus,
    SetDriverStatus,
    InsertRide,
    Commit,
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("injected fault at {0:?}")]
    Injected(Fault),

    #[error("{table} has no row {id}")]
    ForeignKey { table: &'static str, id: i64 },

    #[error("a ride for request {0} already exists")]
    DuplicateRide(i64),
}

#[derive(Debug, Clone, Default)]
struct Tables {
    riders: BTreeMap<i64, Rider>,
    locations: BTreeMap<i64, Location>,
    drivers: BTreeMap<i64, Driver>,
    ride_requests: BTreeMap<i64, RideRequest>,
    rides: BTreeMap<i64, Ride>,
}

/// Sequences are not transactional, ids of rolled back inserts are lost.
#[derive(Debug, Default)]
struct Sequences {
    riders: i64,
    locations: i64,
    drivers: i64,
    ride_requests: i64,
    rides: i64,
}

fn next(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Rider(i64),
    Driver(i64),
    RideRequest(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

// the guards are never read, holding them keeps the row locked
#[allow(dead_code)]
enum RowGuard {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

impl RowGuard {
    fn mode(&self) -> LockMode {
        match self {
            Self::Shared(_) => LockMode::Shared,
            Self::Exclusive(_) => LockMode::Exclusive,
        }
    }
}

#[derive(Debug, Clone)]
enum Write {
    InsertRider(i64, Rider),
    InsertLocation(i64, Location),
    InsertDriver(i64, Driver),
    DriverStatus(i64, DriverStatus),
    InsertRideRequest(i64, RideRequest),
    RideRequestStatus(i64, RideRequestStatus),
    InsertRide(i64, Ride),
}

fn require<V>(table: &BTreeMap<i64, V>, name: &'static str, id: i64) -> Result<()> {
    if table.contains_key(&id) {
        Ok(())
    } else {
        Err(DatabaseError::other(MemoryError::ForeignKey { table: name, id }))
    }
}

impl Write {
    /// Applies the write, checking the constraints the postgres schema has.
    fn apply(&self, tables: &mut Tables) -> Result<()> {
        match self {
            Self::InsertRider(id, rider) => {
                tables.riders.insert(*id, rider.clone());
            }
            Self::InsertLocation(id, location) => {
                tables.locations.insert(*id, location.clone());
            }
            Self::InsertDriver(id, driver) => {
                tables.drivers.insert(*id, driver.clone());
            }
            Self::DriverStatus(id, status) => {
                let driver =
                    tables.drivers.get_mut(id).ok_or(DatabaseError::NotFound)?;
                driver.status = *status;
            }
            Self::InsertRideRequest(id, request) => {
                require(&tables.riders, "riders", request.rider_id.raw())?;
                require(
                    &tables.locations,
                    "locations",
                    request.pickup_location_id.raw(),
                )?;
                require(
                    &tables.locations,
                    "locations",
                    request.dropoff_location_id.raw(),
                )?;
                tables.ride_requests.insert(*id, request.clone());
            }
            Self::RideRequestStatus(id, status) => {
                let request = tables
                    .ride_requests
                    .get_mut(id)
                    .ok_or(DatabaseError::NotFound)?;
                request.status = *status;
            }
            Self::InsertRide(id, ride) => {
                let request_id = ride.request_id.raw();
                require(&tables.ride_requests, "ride_requests", request_id)?;
                require(&tables.drivers, "drivers", ride.driver_id.raw())?;
                require(&tables.riders, "riders", ride.rider_id.raw())?;
                if tables
                    .rides
                    .values()
                    .any(|existing| existing.request_id.raw() == request_id)
                {
                    return Err(DatabaseError::other(MemoryError::DuplicateRide(
                        request_id,
                    )));
                }
                tables.rides.insert(*id, ride.clone());
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    sequences: Mutex<Sequences>,
    locks: Mutex<HashMap<RowKey, Arc<RwLock<()>>>>,
    faults: Mutex<Vec<Fault>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn row_lock(&self, key: RowKey) -> Arc<RwLock<()>> {
        lock(&self.locks).entry(key).or_default().clone()
    }

    /// Forgets row locks nobody holds or waits for. Guards and pending waits
    /// own a clone of the lock, so only the map's own reference is left then.
    fn prune<I: IntoIterator<Item = RowKey>>(&self, keys: I) {
        let mut locks = lock(&self.locks);
        for key in keys {
            if locks
                .get(&key)
                .is_some_and(|row_lock| Arc::strong_count(row_lock) == 1)
            {
                locks.remove(&key);
            }
        }
    }

    /// Fails once for every time `fault` was injected.
    fn trip(&self, fault: Fault) -> Result<()> {
        let mut faults = lock(&self.faults);
        match faults.iter().position(|armed| *armed == fault) {
            Some(index) => {
                faults.remove(index);
                Err(DatabaseError::other(MemoryError::Injected(fault)))
            }
            None => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `fault` operation fail, in whichever transaction it
    /// happens.
    pub fn inject_fault(&self, fault: Fault) {
        lock(&self.shared.faults).push(fault);
    }

    /// Number of committed rides.
    pub fn ride_count(&self) -> usize {
        lock(&self.shared.tables).rides.len()
    }

    /// Number of committed ride requests.
    pub fn ride_request_count(&self) -> usize {
        lock(&self.shared.tables).ride_requests.len()
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        lock(&self.shared.locks).len()
    }

    fn begin(&self) -> MemoryTransaction {
        MemoryTransaction {
            shared: self.shared.clone(),
            writes: vec![],
            held: HashMap::new(),
            lock_timeout: None,
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;
    type Autocommit = MemoryAutocommit;

    async fn transaction(&self) -> Result<Self::Transaction> {
        Ok(self.begin())
    }

    fn auto(&self) -> Self::Autocommit {
        MemoryAutocommit {
            database: self.clone(),
        }
    }
}

pub struct MemoryTransaction {
    shared: Arc<Shared>,
    writes: Vec<Write>,
    held: HashMap<RowKey, RowGuard>,
    lock_timeout: Option<Duration>,
}

impl MemoryTransaction {
    /// Committed state with this transaction's writes on top.
    fn view(&self) -> Result<Tables> {
        let mut tables = lock(&self.shared.tables).clone();
        for write in self.writes.iter() {
            write.apply(&mut tables)?;
        }
        Ok(tables)
    }

    /// Buffers a write after checking it applies to the current view.
    fn write(&mut self, write: Write) -> Result<()> {
        let mut view = self.view()?;
        write.apply(&mut view)?;
        self.writes.push(write);
        Ok(())
    }

    fn next_id(&self, sequence: impl FnOnce(&mut Sequences) -> &mut i64) -> i64 {
        let mut sequences = lock(&self.shared.sequences);
        next(sequence(&mut sequences))
    }

    async fn acquire(&mut self, key: RowKey, mode: LockMode) -> Result<()> {
        match self.held.get(&key).map(RowGuard::mode) {
            Some(LockMode::Exclusive) => return Ok(()),
            Some(LockMode::Shared) if mode == LockMode::Shared => return Ok(()),
            // upgrade, the shared guard has to go first
            Some(LockMode::Shared) => {
                self.held.remove(&key);
            }
            None => {}
        }

        let row_lock = self.shared.row_lock(key);
        let guard = match mode {
            LockMode::Shared => {
                self.bounded(row_lock.read_owned()).await.map(RowGuard::Shared)
            }
            LockMode::Exclusive => self
                .bounded(row_lock.write_owned())
                .await
                .map(RowGuard::Exclusive),
        };
        match guard {
            Ok(guard) => {
                self.held.insert(key, guard);
                Ok(())
            }
            Err(why) => {
                self.shared.prune([key]);
                Err(why)
            }
        }
    }

    async fn bounded<F, T>(&self, wait: F) -> Result<T>
    where
        F: std::future::Future<Output = T>,
    {
        match self.lock_timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| DatabaseError::LockTimeout),
            None => Ok(wait.await),
        }
    }

    /// Drops a lock which was only taken to evaluate a predicate that did not
    /// match.
    fn release_unless(&mut self, key: RowKey, was_held: bool) {
        if !was_held {
            self.held.remove(&key);
            self.shared.prune([key]);
        }
    }
}

/// Commit, rollback and dropping an unfinished transaction all release its
/// row locks here.
impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        let keys = self
            .held
            .drain()
            .map(|(key, _guard)| key)
            .collect::<Vec<_>>();
        self.shared.prune(keys);
    }
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn set_lock_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.lock_timeout = Some(timeout);
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.shared.trip(Fault::Commit)?;

        let mut tables = lock(&self.shared.tables);
        let mut staged = tables.clone();
        for write in self.writes.iter() {
            write.apply(&mut staged)?;
        }
        *tables = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl RowLocks for MemoryTransaction {
    async fn share_rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>> {
        let key = RowKey::Rider(id.raw());
        let was_held = self.held.contains_key(&key);
        self.acquire(key, LockMode::Shared).await?;

        let rider = self.view()?.riders.get(&id.raw()).cloned();
        if rider.is_none() {
            self.release_unless(key, was_held);
        }
        Ok(rider.map(|rider| WithId::new(id, rider)))
    }

    async fn lock_ride_request(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<Option<WithId<RideRequest>>> {
        let key = RowKey::RideRequest(id.raw());
        let was_held = self.held.contains_key(&key);
        self.acquire(key, LockMode::Exclusive).await?;

        let request = self
            .view()?
            .ride_requests
            .get(&id.raw())
            .filter(|request| request.status == status)
            .cloned();
        if request.is_none() {
            self.release_unless(key, was_held);
        }
        Ok(request.map(|request| WithId::new(id, request)))
    }

    async fn lock_driver(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<Option<WithId<Driver>>> {
        let key = RowKey::Driver(id.raw());
        let was_held = self.held.contains_key(&key);
        self.acquire(key, LockMode::Exclusive).await?;

        let driver = self
            .view()?
            .drivers
            .get(&id.raw())
            .filter(|driver| driver.status == status)
            .cloned();
        if driver.is_none() {
            self.release_unless(key, was_held);
        }
        Ok(driver.map(|driver| WithId::new(id, driver)))
    }
}

#[async_trait]
impl RiderRepo for MemoryTransaction {
    async fn rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>> {
        Ok(self
            .view()?
            .riders
            .get(&id.raw())
            .cloned()
            .map(|rider| WithId::new(id, rider)))
    }

    async fn insert_rider(&mut self, rider: Rider) -> Result<WithId<Rider>> {
        let id = self.next_id(|sequences| &mut sequences.riders);
        self.write(Write::InsertRider(id, rider.clone()))?;
        Ok(WithId::new(Id::new(id), rider))
    }
}

#[async_trait]
impl LocationRepo for MemoryTransaction {
    async fn location(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        Ok(self
            .view()?
            .locations
            .get(&id.raw())
            .cloned()
            .map(|location| WithId::new(id, location)))
    }

    async fn insert_location(
        &mut self,
        location: Location,
    ) -> Result<WithId<Location>> {
        let id = self.next_id(|sequences| &mut sequences.locations);
        self.write(Write::InsertLocation(id, location.clone()))?;
        Ok(WithId::new(Id::new(id), location))
    }
}

#[async_trait]
impl DriverRepo for MemoryTransaction {
    async fn driver(&mut self, id: Id<Driver>) -> Result<Option<WithId<Driver>>> {
        Ok(self
            .view()?
            .drivers
            .get(&id.raw())
            .cloned()
            .map(|driver| WithId::new(id, driver)))
    }

    async fn insert_driver(&mut self, driver: Driver) -> Result<WithId<Driver>> {
        let id = self.next_id(|sequences| &mut sequences.drivers);
        self.write(Write::InsertDriver(id, driver.clone()))?;
        Ok(WithId::new(Id::new(id), driver))
    }

    async fn set_driver_status(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<()> {
        // an update locks the row, like in postgres
        self.acquire(RowKey::Driver(id.raw()), LockMode::Exclusive)
            .await?;
        self.shared.trip(Fault::SetDriverStatus)?;
        self.write(Write::DriverStatus(id.raw(), status))
    }
}

#[async_trait]
impl RideRequestRepo for MemoryTransaction {
    async fn ride_request(
        &mut self,
        id: Id<RideRequest>,
    ) -> Result<Option<WithId<RideRequest>>> {
        Ok(self
            .view()?
            .ride_requests
            .get(&id.raw())
            .cloned()
            .map(|request| WithId::new(id, request)))
    }

    async fn insert_ride_request(
        &mut self,
        request: RideRequest,
    ) -> Result<WithId<RideRequest>> {
        self.shared.trip(Fault::InsertRideRequest)?;
        let id = self.next_id(|sequences| &mut sequences.ride_requests);
        self.write(Write::InsertRideRequest(id, request.clone()))?;
        Ok(WithId::new(Id::new(id), request))
    }

    async fn set_ride_request_status(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<()> {
        self.acquire(RowKey::RideRequest(id.raw()), LockMode::Exclusive)
            .await?;
        self.shared.trip(Fault::SetRideRequestStatus)?;
        self.write(Write::RideRequestStatus(id.raw(), status))
    }
}

#[async_trait]
impl RideRepo for MemoryTransaction {
    async fn insert_ride(&mut self, ride: NewRide) -> Result<WithId<Ride>> {
        self.shared.trip(Fault::InsertRide)?;
        let id = self.next_id(|sequences| &mut sequences.rides);
        let ride = ride.started_at(Utc::now());
        self.write(Write::InsertRide(id, ride.clone()))?;
        Ok(WithId::new(Id::new(id), ride))
    }

    async fn rides_for_request(
        &mut self,
        request_id: Id<RideRequest>,
    ) -> Result<Vec<WithId<Ride>>> {
        Ok(self
            .view()?
            .rides
            .into_iter()
            .filter(|(_, ride)| ride.request_id == request_id)
            .map(|(id, ride)| WithId::new(Id::new(id), ride))
            .collect())
    }
}

/// Runs every statement in a transaction of its own.
pub struct MemoryAutocommit {
    database: MemoryDatabase,
}

impl DatabaseAutocommit for MemoryAutocommit {}

#[async_trait]
impl RiderRepo for MemoryAutocommit {
    async fn rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>> {
        self.database.begin().rider(id).await
    }

    async fn insert_rider(&mut self, rider: Rider) -> Result<WithId<Rider>> {
        let mut tx = self.database.begin();
        let rider = tx.insert_rider(rider).await?;
        tx.commit().await?;
        Ok(rider)
    }
}

#[async_trait]
impl LocationRepo for MemoryAutocommit {
    async fn location(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        self.database.begin().location(id).await
    }

    async fn insert_location(
        &mut self,
        location: Location,
    ) -> Result<WithId<Location>> {
        let mut tx = self.database.begin();
        let location = tx.insert_location(location).await?;
        tx.commit().await?;
        Ok(location)
    }
}

#[async_trait]
impl DriverRepo for MemoryAutocommit {
    async fn driver(&mut self, id: Id<Driver>) -> Result<Option<WithId<Driver>>> {
        self.database.begin().driver(id).await
    }

    async fn insert_driver(&mut self, driver: Driver) -> Result<WithId<Driver>> {
        let mut tx = self.database.begin();
        let driver = tx.insert_driver(driver).await?;
        tx.commit().await?;
        Ok(driver)
    }

    async fn set_driver_status(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<()> {
        let mut tx = self.database.begin();
        tx.set_driver_status(id, status).await?;
        tx.commit().await
    }
}

#[async_trait]
impl RideRequestRepo for MemoryAutocommit {
    async fn ride_request(
        &mut self,
        id: Id<RideRequest>,
    ) -> Result<Option<WithId<RideRequest>>> {
        self.database.begin().ride_request(id).await
    }

    async fn insert_ride_request(
        &mut self,
        request: RideRequest,
    ) -> Result<WithId<RideRequest>> {
        let mut tx = self.database.begin();
        let request = tx.insert_ride_request(request).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn set_ride_request_status(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<()> {
        let mut tx = self.database.begin();
        tx.set_ride_request_status(id, status).await?;
        tx.commit().await
    }
}

#[async_trait]
impl RideRepo for MemoryAutocommit {
    async fn insert_ride(&mut self, ride: NewRide) -> Result<WithId<Ride>> {
        let mut tx = self.database.begin();
        let ride = tx.insert_ride(ride).await?;
        tx.commit().await?;
        Ok(ride)
    }

    async fn rides_for_request(
        &mut self,
        request_id: Id<RideRequest>,
    ) -> Result<Vec<WithId<Ride>>> {
        self.database.begin().rides_for_request(request_id).await
    }
}
