use std::{env, error::Error, time::Duration};

use async_trait::async_trait;
use dispatch::database::{
    Database, DatabaseAutocommit, DatabaseTransaction, Result, RowLocks,
};
use model::{
    driver::{Driver, DriverStatus},
    ride_request::{RideRequest, RideRequestStatus},
    rider::Rider,
    WithId,
};
use queries::convert_error;
use sqlx::{postgres::PgPoolOptions, Transaction};
use utility::id::Id;

pub mod data_model;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => value.parse().ok()?,
            Err(_) => 10,
        };
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
            max_connections,
        })
    }

    pub(self) fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

pub struct PgDatabaseTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
}

#[async_trait]
impl<'a> DatabaseTransaction for PgDatabaseTransaction<'a> {
    async fn set_lock_timeout(&mut self, timeout: Duration) -> Result<()> {
        // transaction local, reset on commit or rollback
        sqlx::query("SELECT set_config('lock_timeout', $1, true);")
            .bind(format!("{}ms", timeout.as_millis().max(1)))
            .execute(&mut *self.tx)
            .await
            .map_err(convert_error)?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(convert_error)
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(convert_error)
    }
}

#[async_trait]
impl<'a> RowLocks for PgDatabaseTransaction<'a> {
    async fn share_rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>> {
        queries::rider::get_for_share(&mut *self.tx, id).await
    }

    async fn lock_ride_request(
        &mut self,
        id: Id<RideRequest>,
        status: RideRequestStatus,
    ) -> Result<Option<WithId<RideRequest>>> {
        queries::ride_request::get_for_update(&mut *self.tx, id, status).await
    }

    async fn lock_driver(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<Option<WithId<Driver>>> {
        queries::driver::get_for_update(&mut *self.tx, id, status).await
    }
}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
}

impl DatabaseAutocommit for PgDatabaseAutocommit {}

impl PgDatabase {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = PgPoolOptions::new()
            .max_connections(database_connection_info.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&url)
            .await?;

        log::info!(
            "connected to postgres at {}:{}/{}",
            database_connection_info.hostname,
            database_connection_info.port,
            database_connection_info.database
        );
        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("migrations applied");

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: sqlx::PgPool) -> Self {
        Self { connection: pool }
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction<'static>;
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
        }
    }

    async fn transaction(&self) -> Result<Self::Transaction> {
        let tx: Transaction<'static, sqlx::Postgres> =
            self.connection.begin().await.map_err(convert_error)?;

        Ok(PgDatabaseTransaction { tx })
    }
}
