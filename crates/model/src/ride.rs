use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    driver::Driver, location::Location, ride_request::RideRequest, rider::Rider,
    status,
};

/// A ride bound to a driver. Created exactly once per accepted request; rider
/// and locations are always copied from that request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Ride {
    pub request_id: Id<RideRequest>,
    pub driver_id: Id<Driver>,
    pub rider_id: Id<Rider>,
    pub pickup_location_id: Id<Location>,
    pub dropoff_location_id: Id<Location>,
    pub start_time: DateTime<Utc>,
    pub status: RideStatus,
}

impl HasId for Ride {
    type IdType = i64;
}

/// The fields of a ride which are not filled in by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRide {
    pub request_id: Id<RideRequest>,
    pub driver_id: Id<Driver>,
    pub rider_id: Id<Rider>,
    pub pickup_location_id: Id<Location>,
    pub dropoff_location_id: Id<Location>,
    pub status: RideStatus,
}

impl NewRide {
    /// Binds `driver_id` to the request. Rider and locations come from the
    /// request row only.
    pub fn from_request(
        request_id: Id<RideRequest>,
        request: &RideRequest,
        driver_id: Id<Driver>,
    ) -> Self {
        Self {
            request_id,
            driver_id,
            rider_id: request.rider_id,
            pickup_location_id: request.pickup_location_id,
            dropoff_location_id: request.dropoff_location_id,
            status: RideStatus::InProgress,
        }
    }

    pub fn started_at(self, start_time: DateTime<Utc>) -> Ride {
        Ride {
            request_id: self.request_id,
            driver_id: self.driver_id,
            rider_id: self.rider_id,
            pickup_location_id: self.pickup_location_id,
            dropoff_location_id: self.dropoff_location_id,
            start_time,
            status: self.status,
        }
    }
}

status! {
    RideStatus("ride") {
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}
