use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{location::Location, rider::Rider, status};

/// A rider's request for a ride between two locations, waiting for a driver.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RideRequest {
    pub rider_id: Id<Rider>,
    pub pickup_location_id: Id<Location>,
    pub dropoff_location_id: Id<Location>,
    pub status: RideRequestStatus,
    /// Currency units, rounded to cents.
    pub estimated_price: Option<f64>,
    /// Whole minutes.
    pub estimated_time: Option<i32>,
}

impl HasId for RideRequest {
    type IdType = i64;
}

impl RideRequest {
    /// A fresh request in the `requested` state.
    pub fn requested(
        rider_id: Id<Rider>,
        pickup_location_id: Id<Location>,
        dropoff_location_id: Id<Location>,
    ) -> Self {
        Self {
            rider_id,
            pickup_location_id,
            dropoff_location_id,
            status: RideRequestStatus::Requested,
            estimated_price: None,
            estimated_time: None,
        }
    }

    pub fn with_estimate(mut self, price: f64, time_minutes: i32) -> Self {
        self.estimated_price = Some(price);
        self.estimated_time = Some(time_minutes);
        self
    }
}

status! {
    /// `Requested -> Accepted` is the only transition dispatch performs.
    RideRequestStatus("ride request") {
        Requested => "requested",
        Accepted => "accepted",
        Cancelled => "cancelled",
    }
}
