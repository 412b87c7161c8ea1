mod common;

use std::time::Duration;

use common::Fixture;
use database::memory::Fault;
use dispatch::{
    config::DispatchConfig,
    database::{Database, DatabaseTransaction, RideRepo},
    matching::accept_within,
    DispatchError, ErrorKind,
};
use model::{
    driver::DriverStatus, ride::RideStatus, ride_request::RideRequestStatus,
};
use utility::id::Id;

#[tokio::test]
async fn accepted_ride_copies_the_request() {
    let fixture = Fixture::new().await;
    let driver = fixture.online_driver("Grace").await;
    let request = fixture.pending_request().await;
    let dispatcher = fixture.matcher(DispatchConfig::default());

    let ride = dispatcher.accept_request(driver, request).await.unwrap();

    assert_eq!(ride.content.request_id, request);
    assert_eq!(ride.content.driver_id, driver);
    assert_eq!(ride.content.rider_id, fixture.rider);
    assert_eq!(ride.content.pickup_location_id, fixture.pickup);
    assert_eq!(ride.content.dropoff_location_id, fixture.dropoff);
    assert_eq!(ride.content.status, RideStatus::InProgress);

    assert_eq!(
        fixture.request(request).await.status,
        RideRequestStatus::Accepted
    );
    assert_eq!(fixture.driver_status(driver).await, DriverStatus::OnRide);
}

#[tokio::test]
async fn second_accept_is_rejected() {
    let fixture = Fixture::new().await;
    let first = fixture.online_driver("Grace").await;
    let second = fixture.online_driver("Linus").await;
    let request = fixture.pending_request().await;
    let dispatcher = fixture.matcher(DispatchConfig::default());

    dispatcher.accept_request(first, request).await.unwrap();
    let why = dispatcher.accept_request(second, request).await.unwrap_err();
    assert!(matches!(why, DispatchError::RequestUnavailable(id) if id == request));
    assert_eq!(why.kind(), ErrorKind::RequestUnavailable);

    // no side effects on the losing driver
    assert_eq!(fixture.driver_status(second).await, DriverStatus::Online);
    assert_eq!(fixture.database.ride_count(), 1);
}

#[tokio::test]
async fn unknown_request_is_unavailable() {
    let fixture = Fixture::new().await;
    let driver = fixture.online_driver("Grace").await;
    let dispatcher = fixture.matcher(DispatchConfig::default());

    let why = dispatcher.accept_request(driver, Id::new(77)).await.unwrap_err();
    assert_eq!(why.kind(), ErrorKind::RequestUnavailable);
    assert_eq!(fixture.driver_status(driver).await, DriverStatus::Online);
}

#[tokio::test]
async fn drivers_must_be_online() {
    let fixture = Fixture::new().await;
    let offline = fixture.driver("Alan", DriverStatus::Offline).await;
    let request = fixture.pending_request().await;
    let dispatcher = fixture.matcher(DispatchConfig::default());

    let why = dispatcher.accept_request(offline, request).await.unwrap_err();
    assert!(matches!(why, DispatchError::DriverUnavailable(id) if id == offline));

    let why = dispatcher
        .accept_request(Id::new(404), request)
        .await
        .unwrap_err();
    assert_eq!(why.kind(), ErrorKind::DriverUnavailable);

    // the request lock was released with the rollback
    assert_eq!(
        fixture.request(request).await.status,
        RideRequestStatus::Requested
    );
    assert_eq!(fixture.database.ride_count(), 0);
}

#[tokio::test]
async fn a_driver_on_a_ride_cannot_accept_again() {
    let fixture = Fixture::new().await;
    let driver = fixture.online_driver("Grace").await;
    let first = fixture.pending_request().await;
    let second = fixture.pending_request().await;
    let dispatcher = fixture.matcher(DispatchConfig::default());

    dispatcher.accept_request(driver, first).await.unwrap();
    let why = dispatcher.accept_request(driver, second).await.unwrap_err();
    assert_eq!(why.kind(), ErrorKind::DriverUnavailable);
    assert_eq!(
        fixture.request(second).await.status,
        RideRequestStatus::Requested
    );
}

#[tokio::test]
async fn ids_are_validated() {
    let fixture = Fixture::new().await;
    let dispatcher = fixture.matcher(DispatchConfig::default());

    let why = dispatcher
        .accept_request(Id::new(-3), Id::new(1))
        .await
        .unwrap_err();
    assert_eq!(why.kind(), ErrorKind::ValidationError);
    assert!(why.to_string().contains("driver_id"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn at_most_one_acceptor_wins() {
    let fixture = Fixture::new().await;
    let request = fixture.pending_request().await;
    let mut drivers = vec![];
    for index in 0..16 {
        drivers.push(fixture.online_driver(&format!("driver {index}")).await);
    }
    let dispatcher = fixture.matcher(DispatchConfig::default());

    let attempts = drivers.iter().map(|driver| {
        let dispatcher = dispatcher.clone();
        let driver = *driver;
        tokio::spawn(async move { dispatcher.accept_request(driver, request).await })
    });
    let outcomes = futures::future::join_all(attempts).await;

    let mut winners = vec![];
    for outcome in outcomes {
        match outcome.unwrap() {
            Ok(ride) => winners.push(ride),
            Err(why) => assert_eq!(why.kind(), ErrorKind::RequestUnavailable),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(fixture.database.ride_count(), 1);

    let winner = winners[0].content.driver_id;
    for driver in drivers {
        let expected = if driver == winner {
            DriverStatus::OnRide
        } else {
            DriverStatus::Online
        };
        assert_eq!(fixture.driver_status(driver).await, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_driver_wins_at_most_one_request() {
    let fixture = Fixture::new().await;
    let driver = fixture.online_driver("Grace").await;
    let requests = [
        fixture.pending_request().await,
        fixture.pending_request().await,
        fixture.pending_request().await,
    ];
    let dispatcher = fixture.matcher(DispatchConfig::default());

    let attempts = requests.iter().map(|request| {
        let dispatcher = dispatcher.clone();
        let request = *request;
        tokio::spawn(async move { dispatcher.accept_request(driver, request).await })
    });
    let outcomes = futures::future::join_all(attempts).await;

    let accepted = outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap())
        .filter(|outcome| match outcome {
            Ok(_) => true,
            Err(why) => {
                assert_eq!(why.kind(), ErrorKind::DriverUnavailable);
                false
            }
        })
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(fixture.database.ride_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiting_acceptor_sees_the_committed_accept() {
    let fixture = Fixture::new().await;
    let first = fixture.online_driver("Grace").await;
    let second = fixture.online_driver("Linus").await;
    let request = fixture.pending_request().await;
    let config = DispatchConfig::default();
    let dispatcher = fixture.matcher(config.clone());

    let mut tx = fixture.database.transaction().await.unwrap();
    accept_within(&mut tx, &config, first, request).await.unwrap();

    let waiting = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.accept_request(second, request).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiting.is_finished());

    tx.commit().await.unwrap();
    let why = waiting.await.unwrap().unwrap_err();
    assert_eq!(why.kind(), ErrorKind::RequestUnavailable);
    assert_eq!(fixture.driver_status(second).await, DriverStatus::Online);
    assert_eq!(fixture.database.ride_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiting_acceptor_wins_after_a_rollback() {
    let fixture = Fixture::new().await;
    let first = fixture.online_driver("Grace").await;
    let second = fixture.online_driver("Linus").await;
    let request = fixture.pending_request().await;
    let config = DispatchConfig::default();
    let dispatcher = fixture.matcher(config.clone());

    let mut tx = fixture.database.transaction().await.unwrap();
    accept_within(&mut tx, &config, first, request).await.unwrap();

    let waiting = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.accept_request(second, request).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    tx.rollback().await.unwrap();
    let ride = waiting.await.unwrap().unwrap();
    assert_eq!(ride.content.driver_id, second);
    assert_eq!(fixture.driver_status(first).await, DriverStatus::Online);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lock_waits_time_out_as_storage_errors() {
    let fixture = Fixture::new().await;
    let first = fixture.online_driver("Grace").await;
    let second = fixture.online_driver("Linus").await;
    let request = fixture.pending_request().await;
    let config = DispatchConfig::default();
    let impatient = fixture.matcher(DispatchConfig {
        lock_timeout: Duration::from_millis(50),
        ..config.clone()
    });

    let mut tx = fixture.database.transaction().await.unwrap();
    accept_within(&mut tx, &config, first, request).await.unwrap();

    let why = impatient.accept_request(second, request).await.unwrap_err();
    assert_eq!(why.kind(), ErrorKind::StorageError);
    assert!(why.is_internal());

    tx.rollback().await.unwrap();
    impatient.accept_request(second, request).await.unwrap();
}

#[tokio::test]
async fn failures_inside_the_transaction_change_nothing() {
    for fault in [
        Fault::SetRideRequestStatus,
        Fault::SetDriverStatus,
        Fault::InsertRide,
        Fault::Commit,
    ] {
        let fixture = Fixture::new().await;
        let driver = fixture.online_driver("Grace").await;
        let request = fixture.pending_request().await;
        let dispatcher = fixture.matcher(DispatchConfig::default());

        fixture.database.inject_fault(fault);
        let why = dispatcher.accept_request(driver, request).await.unwrap_err();
        assert_eq!(why.kind(), ErrorKind::StorageError, "{fault:?}");

        assert_eq!(
            fixture.request(request).await.status,
            RideRequestStatus::Requested,
            "{fault:?}"
        );
        assert_eq!(fixture.driver_status(driver).await, DriverStatus::Online);
        assert_eq!(fixture.database.ride_count(), 0, "{fault:?}");

        // nothing stays locked
        let ride = dispatcher.accept_request(driver, request).await.unwrap();
        let rides = fixture
            .database
            .auto()
            .rides_for_request(request)
            .await
            .unwrap();
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].id, ride.id);
    }
}
