use async_trait::async_trait;
use dispatch::database::{DriverRepo, Result};
use model::{
    driver::{Driver, DriverStatus},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::{parse_status, DatabaseRow};
use crate::{
    queries::driver::{get, insert, set_status},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

#[derive(Debug, Clone, FromRow)]
pub struct DriverRow {
    pub driver_id: i64,
    pub name: String,
    pub status: String,
}

impl DatabaseRow for DriverRow {
    type Model = Driver;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.driver_id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Driver {
            name: self.name,
            status: parse_status(&self.status)?,
        })
    }
}

#[async_trait]
impl DriverRepo for PgDatabaseAutocommit {
    async fn driver(&mut self, id: Id<Driver>) -> Result<Option<WithId<Driver>>> {
        get(&self.pool, id).await
    }

    async fn insert_driver(&mut self, driver: Driver) -> Result<WithId<Driver>> {
        insert(&self.pool, driver).await
    }

    async fn set_driver_status(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<()> {
        set_status(&self.pool, id, status).await
    }
}

#[async_trait]
impl<'a> DriverRepo for PgDatabaseTransaction<'a> {
    async fn driver(&mut self, id: Id<Driver>) -> Result<Option<WithId<Driver>>> {
        get(&mut *self.tx, id).await
    }

    async fn insert_driver(&mut self, driver: Driver) -> Result<WithId<Driver>> {
        insert(&mut *self.tx, driver).await
    }

    async fn set_driver_status(
        &mut self,
        id: Id<Driver>,
        status: DriverStatus,
    ) -> Result<()> {
        set_status(&mut *self.tx, id, status).await
    }
}
