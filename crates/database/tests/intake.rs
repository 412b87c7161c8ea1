mod common;

use std::time::Duration;

use common::{FixedRouting, Fixture};
use database::memory::Fault;
use dispatch::{config::DispatchConfig, routing::RoutingError, DispatchError, ErrorKind};
use model::ride_request::RideRequestStatus;
use utility::id::Id;

#[tokio::test]
async fn request_is_stored_with_estimate() {
    let fixture = Fixture::new().await;
    let routing = FixedRouting::answering(10.0, 12.9);
    let dispatcher = fixture.dispatcher(routing.clone(), DispatchConfig::default());

    let request = dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .unwrap();

    assert_eq!(request.content.status, RideRequestStatus::Requested);
    assert_eq!(request.content.rider_id, fixture.rider);
    assert_eq!(request.content.pickup_location_id, fixture.pickup);
    assert_eq!(request.content.dropoff_location_id, fixture.dropoff);
    assert_eq!(request.content.estimated_price, Some(25.0));
    assert_eq!(request.content.estimated_time, Some(12));
    assert_eq!(routing.calls(), 1);

    assert_eq!(fixture.request(request.id).await, request.content);
}

#[tokio::test]
async fn price_is_rounded_to_cents() {
    let fixture = Fixture::new().await;
    let dispatcher = fixture.dispatcher(
        FixedRouting::answering(3.3333, 7.0),
        DispatchConfig::default(),
    );

    let request = dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .unwrap();
    assert_eq!(request.content.estimated_price, Some(11.67));
}

#[tokio::test]
async fn estimates_can_be_disabled() {
    let fixture = Fixture::new().await;
    let routing = FixedRouting::answering(10.0, 12.0);
    let dispatcher = fixture.dispatcher(
        routing.clone(),
        DispatchConfig {
            with_estimate: false,
            ..DispatchConfig::default()
        },
    );

    let request = dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .unwrap();
    assert_eq!(request.content.estimated_price, None);
    assert_eq!(request.content.estimated_time, None);
    assert_eq!(routing.calls(), 0);
}

#[tokio::test]
async fn unknown_rider_creates_nothing() {
    let fixture = Fixture::new().await;
    let routing = FixedRouting::answering(10.0, 12.0);
    let dispatcher = fixture.dispatcher(routing.clone(), DispatchConfig::default());

    let why = dispatcher
        .submit_request(Id::new(999), fixture.pickup, fixture.dropoff)
        .await
        .unwrap_err();
    assert!(matches!(why, DispatchError::InvalidRider(id) if id == Id::new(999)));
    assert_eq!(fixture.database.ride_request_count(), 0);
    assert_eq!(routing.calls(), 0);
}

#[tokio::test]
async fn unknown_locations_create_nothing() {
    let fixture = Fixture::new().await;
    let dispatcher = fixture.dispatcher(
        FixedRouting::answering(10.0, 12.0),
        DispatchConfig::default(),
    );

    let why = dispatcher
        .submit_request(fixture.rider, Id::new(404), fixture.dropoff)
        .await
        .unwrap_err();
    assert_eq!(why.kind(), ErrorKind::InvalidLocation);

    let why = dispatcher
        .submit_request(fixture.rider, fixture.pickup, Id::new(405))
        .await
        .unwrap_err();
    assert!(matches!(why, DispatchError::InvalidLocation(id) if id == Id::new(405)));

    assert_eq!(fixture.database.ride_request_count(), 0);
}

#[tokio::test]
async fn ids_are_validated_before_any_lookup() {
    let fixture = Fixture::new().await;
    let routing = FixedRouting::answering(10.0, 12.0);
    let dispatcher = fixture.dispatcher(routing.clone(), DispatchConfig::default());

    let why = dispatcher
        .submit_request(fixture.rider, Id::new(0), fixture.dropoff)
        .await
        .unwrap_err();
    assert_eq!(why.kind(), ErrorKind::ValidationError);
    assert!(why.to_string().contains("pickup_location_id"));
    assert_eq!(routing.calls(), 0);
}

#[tokio::test]
async fn routing_failure_creates_nothing() {
    let fixture = Fixture::new().await;
    let dispatcher = fixture.dispatcher(
        FixedRouting::failing(RoutingError::Status("ZERO_RESULTS".to_owned())),
        DispatchConfig::default(),
    );

    let why = dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .unwrap_err();
    assert_eq!(why.kind(), ErrorKind::EstimateUnavailable);
    assert!(why.public_message().contains("ZERO_RESULTS"));
    assert_eq!(fixture.database.ride_request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_routing_times_out() {
    let fixture = Fixture::new().await;
    let dispatcher = fixture.dispatcher(
        FixedRouting::hanging(Duration::from_secs(60)),
        DispatchConfig {
            routing_timeout: Duration::from_millis(500),
            ..DispatchConfig::default()
        },
    );

    let why = dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .unwrap_err();
    assert!(matches!(
        why,
        DispatchError::EstimateUnavailable(RoutingError::Timeout(_))
    ));
    assert_eq!(fixture.database.ride_request_count(), 0);
}

#[tokio::test]
async fn failed_insert_leaves_no_row() {
    let fixture = Fixture::new().await;
    let dispatcher = fixture.dispatcher(
        FixedRouting::answering(10.0, 12.0),
        DispatchConfig::default(),
    );

    fixture.database.inject_fault(Fault::InsertRideRequest);
    let why = dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .unwrap_err();
    assert!(why.is_internal());
    assert_eq!(why.public_message(), "An internal storage error occurred.");
    assert_eq!(fixture.database.ride_request_count(), 0);

    fixture.database.inject_fault(Fault::Commit);
    assert!(dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .is_err());
    assert_eq!(fixture.database.ride_request_count(), 0);

    dispatcher
        .submit_request(fixture.rider, fixture.pickup, fixture.dropoff)
        .await
        .unwrap();
    assert_eq!(fixture.database.ride_request_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_of_one_rider_all_succeed() {
    let fixture = Fixture::new().await;
    let dispatcher = fixture.dispatcher(
        FixedRouting::answering(2.0, 5.0),
        DispatchConfig::default(),
    );

    let submissions = (0..8).map(|_| {
        let dispatcher = dispatcher.clone();
        let (rider, pickup, dropoff) = (fixture.rider, fixture.pickup, fixture.dropoff);
        tokio::spawn(async move { dispatcher.submit_request(rider, pickup, dropoff).await })
    });
    for submission in futures::future::join_all(submissions).await {
        submission.unwrap().unwrap();
    }
    assert_eq!(fixture.database.ride_request_count(), 8);
}
