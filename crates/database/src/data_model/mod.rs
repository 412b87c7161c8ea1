use std::str::FromStr;

use dispatch::database::{DatabaseError, Result};
use model::WithId;
use utility::id::{HasId, Id};

pub mod driver;
pub mod location;
pub mod ride;
pub mod ride_request;
pub mod rider;

/// A row as it is stored. Every table in this crate is keyed by a `BIGSERIAL`.
pub trait DatabaseRow {
    type Model: HasId<IdType = i64>;

    fn get_id(&self) -> Id<Self::Model>;
    fn to_model(self) -> Result<Self::Model>;
}

pub fn with_id<R: DatabaseRow>(row: R) -> Result<WithId<R::Model>> {
    let id = row.get_id();
    row.to_model().map(|model| WithId::new(id, model))
}

pub fn with_id_optional<R: DatabaseRow>(
    row: Option<R>,
) -> Result<Option<WithId<R::Model>>> {
    row.map(with_id).transpose()
}

pub fn with_ids<R: DatabaseRow>(rows: Vec<R>) -> Result<Vec<WithId<R::Model>>> {
    rows.into_iter().map(with_id).collect()
}

/// Statuses are stored as text, a value the model does not know is a storage
/// error.
pub(crate) fn parse_status<S>(value: &str) -> Result<S>
where
    S: FromStr,
    S::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(DatabaseError::other)
}
