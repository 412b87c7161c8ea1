use async_trait::async_trait;
use dispatch::database::{Result, RiderRepo};
use model::{rider::Rider, WithId};
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::DatabaseRow;
use crate::{
    queries::rider::{get, insert},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

#[derive(Debug, Clone, FromRow)]
pub struct RiderRow {
    pub rider_id: i64,
    pub name: String,
}

impl DatabaseRow for RiderRow {
    type Model = Rider;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.rider_id)
    }

    fn to_model(self) -> Result<Self::Model> {
        Ok(Rider { name: self.name })
    }
}

#[async_trait]
impl RiderRepo for PgDatabaseAutocommit {
    async fn rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>> {
        get(&self.pool, id).await
    }

    async fn insert_rider(&mut self, rider: Rider) -> Result<WithId<Rider>> {
        insert(&self.pool, rider).await
    }
}

#[async_trait]
impl<'a> RiderRepo for PgDatabaseTransaction<'a> {
    async fn rider(&mut self, id: Id<Rider>) -> Result<Option<WithId<Rider>>> {
        get(&mut *self.tx, id).await
    }

    async fn insert_rider(&mut self, rider: Rider) -> Result<WithId<Rider>> {
        insert(&mut *self.tx, rider).await
    }
}
