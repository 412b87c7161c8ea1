use async_trait::async_trait;
use dispatch::database::{LocationRepo, Result};
use model::{location::Location, WithId};
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::DatabaseRow;
use crate::{
    queries::location::{get, insert},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

/// A pickup or dropoff point.
/// Table: `locations`
#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    pub location_id: i64,
    pub address: String,
}

impl DatabaseRow for LocationRow {
    type Model = Location;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.location_id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Location {
            address: self.address,
        })
    }
}

#[async_trait]
impl LocationRepo for PgDatabaseAutocommit {
    async fn location(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        get(&self.pool, id).await
    }

    async fn insert_location(
        &mut self,
        location: Location,
    ) -> Result<WithId<Location>> {
        insert(&self.pool, location).await
    }
}

#[async_trait]
impl<'a> LocationRepo for PgDatabaseTransaction<'a> {
    async fn location(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        get(&mut *self.tx, id).await
    }

    async fn insert_location(
        &mut self,
        location: Location,
    ) -> Result<WithId<Location>> {
        insert(&mut *self.tx, location).await
    }
}
