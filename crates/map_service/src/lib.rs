use std::{env, time::Duration};

use async_trait::async_trait;
use dispatch::routing::{RoutingError, RoutingService, TravelEstimate};
use serde::{Deserialize, Serialize};

use types::{DistanceMatrixResponse, STATUS_OK};

pub mod types;

pub const MAPS_API_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapServiceCredentials {
    pub api_key: String,
    pub url: String,
}

impl MapServiceCredentials {
    /// Reads `MAPS_API_KEY` and, optionally, `MAPS_API_URL`.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("MAPS_API_KEY").ok()?;
        let url = env::var("MAPS_API_URL").unwrap_or_else(|_| MAPS_API_URL.to_owned());
        Some(Self { api_key, url })
    }
}

/// Distance matrix client asking for a single origin/destination pair.
#[derive(Clone)]
pub struct MapServiceClient {
    inner: reqwest::Client,
    credentials: MapServiceCredentials,
}

impl MapServiceClient {
    pub fn new(
        credentials: MapServiceCredentials,
        timeout: Duration,
    ) -> Result<Self, RoutingError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { inner, credentials })
    }
}

#[async_trait]
impl RoutingService for MapServiceClient {
    async fn estimate_travel(
        &self,
        origin_address: &str,
        destination_address: &str,
    ) -> Result<TravelEstimate, RoutingError> {
        log::debug!("requesting distance from `{origin_address}` to `{destination_address}`");

        let response = self
            .inner
            .get(&self.credentials.url)
            .query(&[
                ("origins", origin_address),
                ("destinations", destination_address),
                ("key", self.credentials.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Transport(format!(
                "unexpected http status {status}"
            )));
        }

        let body = response.text().await.map_err(transport_error)?;
        let matrix: DistanceMatrixResponse = serde_json::from_str(&body)
            .map_err(|why| RoutingError::Malformed(why.to_string()))?;
        estimate_from(matrix)
    }
}

fn transport_error(why: reqwest::Error) -> RoutingError {
    RoutingError::Transport(why.to_string())
}

/// Picks the first element of the matrix. Distances come in meters, durations
/// in seconds.
pub fn estimate_from(
    matrix: DistanceMatrixResponse,
) -> Result<TravelEstimate, RoutingError> {
    if matrix.status != STATUS_OK {
        if let Some(message) = &matrix.error_message {
            log::warn!("distance matrix answered {}: {message}", matrix.status);
        }
        return Err(RoutingError::Status(matrix.status));
    }

    let element = matrix
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| RoutingError::Malformed("empty distance matrix".to_owned()))?;
    if element.status != STATUS_OK {
        return Err(RoutingError::Status(element.status));
    }

    match (element.distance, element.duration) {
        (Some(distance), Some(duration)) => Ok(TravelEstimate {
            distance_km: distance.value / 1000.0,
            duration_minutes: duration.value / 60.0,
        }),
        _ => Err(RoutingError::Malformed(
            "element without distance or duration".to_owned(),
        )),
    }
}
