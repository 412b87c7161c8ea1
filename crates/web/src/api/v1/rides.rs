use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{Method, StatusCode},
    Json,
};
use dispatch::database::Database;
use model::{
    driver::Driver,
    ride::{Ride, RideStatus},
    ride_request::RideRequest,
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
pub struct RideAcceptBody {
    pub driver_id: Id<Driver>,
    pub request_id: Id<RideRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RideAccepted {
    pub ride_id: Id<Ride>,
    pub status: RideStatus,
}

impl From<WithId<Ride>> for RideAccepted {
    fn from(value: WithId<Ride>) -> Self {
        Self {
            ride_id: value.id,
            status: value.content.status,
        }
    }
}

pub(crate) async fn accept_request<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { dispatcher }): State<WebState<D>>,
    body: Result<Json<RideAcceptBody>, JsonRejection>,
) -> RouteResult<(StatusCode, Json<RideAccepted>)> {
    let reject = |why: RouteErrorResponse| {
        why.with_method(&Method::POST).with_uri(original_uri.path())
    };

    let Json(body) = body.map_err(|why| reject(why.into()))?;
    dispatcher
        .accept_request(body.driver_id, body.request_id)
        .await
        .map(|ride| (StatusCode::CREATED, Json(ride.into())))
        .map_err(|why| reject(why.into()))
}
