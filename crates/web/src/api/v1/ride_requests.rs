use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{Method, StatusCode},
    Json,
};
use dispatch::database::Database;
use model::{
    location::Location,
    ride_request::{RideRequest, RideRequestStatus},
    rider::Rider,
    WithId,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{
    common::{RouteErrorResponse, RouteResult},
    WebState,
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RideRequestBody {
    pub rider_id: Id<Rider>,
    pub pickup_location_id: Id<Location>,
    pub dropoff_location_id: Id<Location>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RideRequestCreated {
    pub request_id: Id<RideRequest>,
    pub status: RideRequestStatus,
    pub estimated_price: Option<f64>,
    pub estimated_time: Option<i32>,
}

impl From<WithId<RideRequest>> for RideRequestCreated {
    fn from(value: WithId<RideRequest>) -> Self {
        Self {
            request_id: value.id,
            status: value.content.status,
            estimated_price: value.content.estimated_price,
            estimated_time: value.content.estimated_time,
        }
    }
}

pub(crate) async fn submit_request<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { dispatcher }): State<WebState<D>>,
    body: Result<Json<RideRequestBody>, JsonRejection>,
) -> RouteResult<(StatusCode, Json<RideRequestCreated>)> {
    let reject = |why: RouteErrorResponse| {
        why.with_method(&Method::POST).with_uri(original_uri.path())
    };

    let Json(body) = body.map_err(|why| reject(why.into()))?;
    dispatcher
        .submit_request(
            body.rider_id,
            body.pickup_location_id,
            body.dropoff_location_id,
        )
        .await
        .map(|request| (StatusCode::CREATED, Json(request.into())))
        .map_err(|why| reject(why.into()))
}
