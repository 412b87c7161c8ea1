use model::{
    driver::Driver, location::Location, ride_request::RideRequest, rider::Rider,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utility::id::{HasId, Id};

pub mod config;
pub mod database;
pub mod dispatcher;
pub mod intake;
pub mod matching;
pub mod routing;

use database::DatabaseError;
use routing::RoutingError;

/// Stable, machine checkable error kinds. Serialized as e.g.
/// `REQUEST_UNAVAILABLE`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    InvalidRider,
    InvalidLocation,
    RequestUnavailable,
    DriverUnavailable,
    EstimateUnavailable,
    StorageError,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),

    #[error("Rider {0} does not exist.")]
    InvalidRider(Id<Rider>),

    #[error("Location {0} does not exist.")]
    InvalidLocation(Id<Location>),

    #[error("Ride request {0} is invalid or already accepted.")]
    RequestUnavailable(Id<RideRequest>),

    #[error("Driver {0} is unavailable or not online.")]
    DriverUnavailable(Id<Driver>),

    #[error("Travel estimate unavailable ({}).", .0.status())]
    EstimateUnavailable(#[source] RoutingError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::InvalidRider(_) => ErrorKind::InvalidRider,
            Self::InvalidLocation(_) => ErrorKind::InvalidLocation,
            Self::RequestUnavailable(_) => ErrorKind::RequestUnavailable,
            Self::DriverUnavailable(_) => ErrorKind::DriverUnavailable,
            Self::EstimateUnavailable(_) => ErrorKind::EstimateUnavailable,
            Self::Storage(_) => ErrorKind::StorageError,
        }
    }

    /// The normal outcome of losing a race for a request or a driver.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::RequestUnavailable(_) | Self::DriverUnavailable(_)
        )
    }

    /// Failures of the store itself, as opposed to business outcomes.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Message which is safe to hand to callers. Storage errors do not expose
    /// any detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "An internal storage error occurred.".to_owned(),
            other => other.to_string(),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

pub(crate) fn positive_id<T>(id: Id<T>, field: &str) -> DispatchResult<Id<T>>
where
    T: HasId<IdType = i64>,
{
    if id.raw() > 0 {
        Ok(id)
    } else {
        Err(DispatchError::Validation(format!(
            "`{field}` must be a positive id, got {id}."
        )))
    }
}
