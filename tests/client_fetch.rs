// Fetch layer behaviour against a mocked bookings API.
use chrono::{DateTime, Utc};
use mockito::{Matcher, Server};
use roomweek::client::{BookingClient, RetryPolicy};
use roomweek::error::{FailureKind, FetchError};
use roomweek::model::Room;
use std::time::Duration;

fn room() -> Room {
    Room {
        id: "room-1".to_string(),
        code: "010.05.68".to_string(),
        name: "Swanston Group Study Room".to_string(),
    }
}

fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    (
        "2025-08-10T14:00:00Z".parse().unwrap(),
        "2025-08-15T13:59:59.999Z".parse().unwrap(),
    )
}

fn no_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        backoff_ms: 1,
    }
}

fn client(url: &str) -> BookingClient {
    BookingClient::new(url, "test-token", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetch_parses_a_bare_array_response() {
    let mut server = Server::new_async().await;
    let body = serde_json::json!([{
        "StartDateTime": "2025-08-11T00:00:00.000Z",
        "EndDateTime": "2025-08-11T01:00:00.000Z",
        "Owner": "S1234567"
    }]);
    let mock = server
        .mock("GET", "/api/Resources/room-1/BookingRequests")
        .match_query(Matcher::UrlEncoded(
            "CheckSplitPermissions".to_string(),
            "true".to_string(),
        ))
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let (start, end) = window();
    let (bookings, malformed) = client(&server.url())
        .fetch_bookings(&room(), start, end, &no_retry())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(bookings.len(), 1);
    assert_eq!(malformed, 0);
    assert_eq!(bookings[0].room_id, "room-1");
    assert_eq!(bookings[0].fields.get("Owner").unwrap(), "S1234567");
}

#[tokio::test]
async fn fetch_parses_an_items_wrapper_and_counts_malformed() {
    let mut server = Server::new_async().await;
    let body = serde_json::json!({"items": [
        {
            "StartDateTime": "2025-08-11T00:00:00.000Z",
            "EndDateTime": "2025-08-11T01:00:00.000Z",
            "Owner": "S1234567"
        },
        { "Owner": "no instants here" }
    ]});
    let _mock = server
        .mock("GET", "/api/Resources/room-1/BookingRequests")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let (start, end) = window();
    let (bookings, malformed) = client(&server.url())
        .fetch_bookings(&room(), start, end, &no_retry())
        .await
        .unwrap();

    assert_eq!(bookings.len(), 1);
    assert_eq!(malformed, 1);
}

#[tokio::test]
async fn unauthorized_is_never_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/Resources/room-1/BookingRequests")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("token expired")
        .expect(1)
        .create_async()
        .await;

    let (start, end) = window();
    let retry = RetryPolicy {
        max_retries: 3,
        backoff_ms: 1,
    };
    let err = client(&server.url())
        .fetch_bookings(&room(), start, end, &retry)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(err, FetchError::Unauthorized { status: 401 });
    assert_eq!(err.kind(), FailureKind::Authorization);
}

#[tokio::test]
async fn server_errors_are_retried_a_bounded_number_of_times() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/Resources/room-1/BookingRequests")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("down for maintenance")
        .expect(3) // initial try + 2 retries
        .create_async()
        .await;

    let (start, end) = window();
    let retry = RetryPolicy {
        max_retries: 2,
        backoff_ms: 1,
    };
    let err = client(&server.url())
        .fetch_bookings(&room(), start, end, &retry)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.kind(), FailureKind::Transient);
    assert!(err.is_retriable());
    match err {
        FetchError::Status { status, preview } => {
            assert_eq!(status, 503);
            assert!(preview.contains("maintenance"));
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_window_is_rejected_before_any_request() {
    let server = Server::new_async().await;
    let (start, end) = window();
    // Swapped bounds: start >= end.
    let err = client(&server.url())
        .fetch_bookings(&room(), end, start, &no_retry())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidWindow { .. }));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn empty_room_id_and_empty_credential_are_rejected() {
    let server = Server::new_async().await;
    let (start, end) = window();

    let mut bad_room = room();
    bad_room.id = "  ".to_string();
    let err = client(&server.url())
        .fetch_bookings(&bad_room, start, end, &no_retry())
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::EmptyRoomId);

    assert_eq!(
        BookingClient::new(&server.url(), "", Duration::from_secs(5)).unwrap_err(),
        FetchError::EmptyCredential
    );
}
