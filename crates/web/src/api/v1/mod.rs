use axum::{
    routing::{get, on, post},
    Router,
};
use dispatch::database::Database;

use crate::{
    common::{route_not_found, schema, METHOD_FILTER_ALL},
    WebState,
};

mod ride_requests;
mod rides;

pub use ride_requests::{RideRequestBody, RideRequestCreated};
pub use rides::{RideAcceptBody, RideAccepted};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/ride-request", post(ride_requests::submit_request::<D>))
        .route("/ride-request/schema", get(schema::<RideRequestCreated>))
        .route("/ride-request/body/schema", get(schema::<RideRequestBody>))
        .route("/ride-accept", post(rides::accept_request::<D>))
        .route("/ride-accept/schema", get(schema::<RideAccepted>))
        .route("/ride-accept/body/schema", get(schema::<RideAcceptBody>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}
