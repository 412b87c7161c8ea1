//! The routing collaborator: an external service estimating distance and
//! travel time between two addresses.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelEstimate {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

impl TravelEstimate {
    /// Travel time in whole minutes, truncated.
    pub fn whole_minutes(&self) -> i32 {
        self.duration_minutes.trunc() as i32
    }

    pub(crate) fn check(self) -> Result<Self, RoutingError> {
        let valid = |value: f64| value.is_finite() && value >= 0.0;
        if valid(self.distance_km) && valid(self.duration_minutes) {
            Ok(self)
        } else {
            Err(RoutingError::Malformed(format!(
                "distance {} km and duration {} min are not usable",
                self.distance_km, self.duration_minutes
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// The service answered with a non-OK status.
    #[error("routing service returned status {0}")]
    Status(String),

    #[error("routing service could not be reached: {0}")]
    Transport(String),

    #[error("routing service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("routing service returned an unusable response: {0}")]
    Malformed(String),

    #[error("travel estimates are disabled")]
    Disabled,
}

impl RoutingError {
    /// The upstream status, or a synthetic one if the service never answered
    /// with a status of its own.
    pub fn status(&self) -> &str {
        match self {
            Self::Status(status) => status,
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Malformed(_) => "MALFORMED_RESPONSE",
            Self::Disabled => "DISABLED",
        }
    }
}

#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn estimate_travel(
        &self,
        origin_address: &str,
        destination_address: &str,
    ) -> Result<TravelEstimate, RoutingError>;
}

/// Stand-in for deployments which run intake without estimates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRouting;

#[async_trait]
impl RoutingService for NoRouting {
    async fn estimate_travel(
        &self,
        _origin_address: &str,
        _destination_address: &str,
    ) -> Result<TravelEstimate, RoutingError> {
        Err(RoutingError::Disabled)
    }
}

/// Calls the routing service, giving up after `timeout`.
pub async fn estimate_with_timeout(
    routing: &dyn RoutingService,
    origin_address: &str,
    destination_address: &str,
    timeout: Duration,
) -> Result<TravelEstimate, RoutingError> {
    tokio::time::timeout(
        timeout,
        routing.estimate_travel(origin_address, destination_address),
    )
    .await
    .map_err(|_| RoutingError::Timeout(timeout))?
    .and_then(TravelEstimate::check)
}
