#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for the REST surface: credentials, validation, routes
//! and request bodies, observed through a recording executor.

mod common;

use common::{test_config, RecordingExecutor, ADMIN_KEY, CLIENT_KEY, UID};
use reqwest::Method;
use serde_json::json;
use socketlink_client::{ApiClient, MessagingAction, SocketlinkConfig, SocketlinkError};
use tokio_test::{assert_err, assert_ok};

fn api() -> (ApiClient, RecordingExecutor) {
    let executor = RecordingExecutor::new();
    let api = ApiClient::with_executor(&test_config(), executor.clone()).unwrap();
    (api, executor)
}

fn admin_only_api() -> (ApiClient, RecordingExecutor) {
    let executor = RecordingExecutor::new();
    let config = SocketlinkConfig::new(common::TEST_URL)
        .with_admin_api_key(ADMIN_KEY)
        .with_uid(UID);
    let api = ApiClient::with_executor(&config, executor.clone()).unwrap();
    (api, executor)
}

// ── Validation never reaches the executor ───────────────────────────

#[tokio::test]
async fn empty_lists_are_rejected_before_any_request() {
    let (api, executor) = api();
    let none: [&str; 0] = [];

    assert_err!(api.get_all_users_in_given_rooms(&none).await);
    assert_err!(api.get_subscriptions_for_given_users(&none).await);
    assert_err!(api.broadcast_message_to_given_rooms("hi", &none).await);
    assert_err!(api.broadcast_message_to_given_users("hi", &none).await);
    assert_err!(api.ban_users_in_given_rooms("room1", &none).await);
    assert_err!(api.ban_users_from_the_server(&none).await);
    assert_err!(api.unban_users_from_given_rooms("room1", &none).await);
    assert_err!(api.unban_users_from_the_server(&none).await);
    assert_err!(
        api.enable_disable_messaging_globally_for_given_users(MessagingAction::Disable, &none)
            .await
    );
    assert_err!(
        api.enable_disable_messaging_in_rooms_for_given_users(
            MessagingAction::Disable,
            "room1",
            &none
        )
        .await
    );

    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn empty_strings_are_rejected_before_any_request() {
    let (api, executor) = api();

    let err = api.subscribe_to_room("").await.unwrap_err();
    assert!(matches!(err, SocketlinkError::InvalidArgument(_)));
    assert!(err.is_precondition());
    assert_err!(api.unsubscribe_from_room("").await);
    assert_err!(api.broadcast_message_to_everyone("").await);
    assert_err!(api.broadcast_message_to_given_rooms("", &["room1"]).await);
    assert_err!(api.ban_users_in_given_rooms("", &["bob"]).await);
    assert_err!(api.get_messages_for_room("", UID).await);
    assert_err!(api.get_messages_for_room("room1", "").await);

    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn empty_list_error_message_names_the_argument() {
    let (api, _) = api();
    let none: [&str; 0] = [];
    let err = api.ban_users_from_the_server(&none).await.unwrap_err();
    assert_eq!(err.to_string(), "invalid argument: uids array cannot be empty");
}

#[tokio::test]
async fn admin_calls_without_admin_key_fail_fast() {
    let executor = RecordingExecutor::new();
    let config = SocketlinkConfig::new(common::TEST_URL).with_client_api_key(CLIENT_KEY);
    let api = ApiClient::with_executor(&config, executor.clone()).unwrap();

    let err = api.fetch_all_rooms().await.unwrap_err();
    assert!(matches!(err, SocketlinkError::MissingAdminApiKey));
    assert_err!(api.get_usage_metrics().await);
    assert_err!(api.ban_users_from_the_server(&["bob"]).await);
    assert_err!(api.delete_local_database().await);

    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn empty_admin_key_counts_as_missing() {
    let executor = RecordingExecutor::new();
    let config = SocketlinkConfig::new(common::TEST_URL).with_admin_api_key("");
    let api = ApiClient::with_executor(&config, executor.clone()).unwrap();

    let err = api.get_banned_users().await.unwrap_err();
    assert!(matches!(err, SocketlinkError::MissingAdminApiKey));
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn client_calls_without_client_key_fail_fast() {
    let (api, executor) = admin_only_api();

    let err = api.subscribe_to_room("room1").await.unwrap_err();
    assert!(matches!(err, SocketlinkError::MissingClientApiKey));
    assert_eq!(err.to_string(), "clientApiKey is required");
    assert_err!(api.get_messages_for_room("room1", UID).await);

    assert!(executor.requests().is_empty());
}

#[test]
fn insecure_url_is_rejected_at_construction() {
    let config = SocketlinkConfig::new("http://socketlink.test").with_admin_api_key(ADMIN_KEY);
    let err = ApiClient::with_executor(&config, RecordingExecutor::new()).unwrap_err();
    assert!(matches!(err, SocketlinkError::InsecureUrl(_)));
}

// ── Routes, headers and bodies ──────────────────────────────────────

#[tokio::test]
async fn ban_in_room_posts_room_user_pairs() {
    let (api, executor) = api();
    assert_ok!(api.ban_users_in_given_rooms("room1", &["alice"]).await);

    let request = executor.single_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url.as_str(), "https://socketlink.test/api/v1/rooms/users/ban");
    assert_eq!(request.header("api-key"), Some(ADMIN_KEY));
    assert_eq!(request.header("uid"), None);
    assert_eq!(request.body, Some(json!([{ "rid": "room1", "uid": ["alice"] }])));
}

#[tokio::test]
async fn server_wide_ban_and_unban_target_the_global_room() {
    let (api, executor) = api();
    assert_ok!(api.ban_users_from_the_server(&["bob", "carol"]).await);
    assert_ok!(api.unban_users_from_the_server(&["bob"]).await);

    let requests = executor.requests();
    assert_eq!(requests[0].url.path(), "/api/v1/rooms/users/ban");
    assert_eq!(
        requests[0].body,
        Some(json!([{ "rid": "global", "uid": ["bob", "carol"] }]))
    );
    assert_eq!(requests[1].url.path(), "/api/v1/rooms/users/unban");
    assert_eq!(requests[1].body, Some(json!([{ "rid": "global", "uid": ["bob"] }])));
}

#[tokio::test]
async fn unban_in_room_uses_unban_path() {
    let (api, executor) = api();
    assert_ok!(api.unban_users_from_given_rooms("room7", &["dave"]).await);

    let request = executor.single_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url.path(), "/api/v1/rooms/users/unban");
    assert_eq!(request.body, Some(json!([{ "rid": "room7", "uid": ["dave"] }])));
}

#[tokio::test]
async fn server_messaging_toggle_is_a_bodiless_put() {
    let (api, executor) = api();
    assert_ok!(
        api.enable_disable_messaging_in_server(MessagingAction::Disable)
            .await
    );

    let request = executor.single_request();
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.url.path(), "/api/v1/server/messaging/disable");
    assert_eq!(request.body, None);
}

#[tokio::test]
async fn user_messaging_toggles_post_room_user_pairs() {
    let (api, executor) = api();
    assert_ok!(
        api.enable_disable_messaging_globally_for_given_users(MessagingAction::Enable, &["bob"])
            .await
    );
    assert_ok!(
        api.enable_disable_messaging_in_rooms_for_given_users(
            MessagingAction::Disable,
            "room2",
            &["carol"]
        )
        .await
    );

    let requests = executor.requests();
    assert_eq!(requests[0].url.path(), "/api/v1/rooms/messaging/enable");
    assert_eq!(requests[0].body, Some(json!([{ "rid": "global", "uid": ["bob"] }])));
    assert_eq!(requests[1].url.path(), "/api/v1/rooms/messaging/disable");
    assert_eq!(requests[1].body, Some(json!([{ "rid": "room2", "uid": ["carol"] }])));
}

#[tokio::test]
async fn messaging_action_parsed_from_string() {
    let (api, executor) = api();
    let action: MessagingAction = "enable".parse().unwrap();
    assert_ok!(api.enable_disable_messaging_in_server(action).await);
    assert_eq!(executor.single_request().url.path(), "/api/v1/server/messaging/enable");

    let err = "pause".parse::<MessagingAction>().unwrap_err();
    assert!(matches!(err, SocketlinkError::InvalidAction(ref a) if a == "pause"));
}

#[tokio::test]
async fn broadcasts_carry_message_and_targets() {
    let (api, executor) = api();
    assert_ok!(api.broadcast_message_to_everyone("maintenance").await);
    assert_ok!(api.broadcast_message_to_given_rooms("hi rooms", &["r1", "r2"]).await);
    assert_ok!(api.broadcast_message_to_given_users("hi users", &["u1"]).await);

    let requests = executor.requests();
    assert_eq!(requests[0].url.path(), "/api/v1/broadcast");
    assert_eq!(requests[0].body, Some(json!({ "message": "maintenance" })));
    assert_eq!(requests[1].url.path(), "/api/v1/rooms/broadcast");
    assert_eq!(
        requests[1].body,
        Some(json!({ "message": "hi rooms", "rid": ["r1", "r2"] }))
    );
    assert_eq!(requests[2].url.path(), "/api/v1/users/broadcast");
    assert_eq!(
        requests[2].body,
        Some(json!({ "message": "hi users", "uid": ["u1"] }))
    );
    assert!(requests.iter().all(|r| r.method == Method::POST));
}

#[tokio::test]
async fn room_and_subscription_queries() {
    let (api, executor) = api();
    assert_ok!(api.get_all_users_in_given_rooms(&["r1"]).await);
    assert_ok!(api.get_subscriptions_for_given_users(&["u1", "u2"]).await);
    assert_ok!(api.get_subscriptions_for_all_users().await);

    let requests = executor.requests();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].url.path(), "/api/v1/rooms/users");
    assert_eq!(requests[0].body, Some(json!({ "rid": ["r1"] })));
    assert_eq!(requests[1].url.path(), "/api/v1/users/subscriptions");
    assert_eq!(requests[1].body, Some(json!({ "uid": ["u1", "u2"] })));
    assert_eq!(requests[2].method, Method::GET);
    assert_eq!(requests[2].url.path(), "/api/v1/users/subscriptions/all");
}

#[tokio::test]
async fn bodiless_admin_reads_use_expected_routes() {
    let (api, executor) = api();
    assert_ok!(api.get_usage_metrics().await);
    assert_ok!(api.sync_mysql().await);
    assert_ok!(api.fetch_all_rooms().await);
    assert_ok!(api.get_orphan_users().await);
    assert_ok!(api.get_banned_users().await);
    assert_ok!(api.get_users_with_messaging_disabled().await);
    assert_ok!(api.delete_local_database().await);

    let seen: Vec<(Method, String)> = executor
        .requests()
        .into_iter()
        .map(|r| (r.method, r.url.path().to_owned()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (Method::GET, "/api/v1/metrics".to_owned()),
            (Method::GET, "/api/v1/mysql/sync".to_owned()),
            (Method::GET, "/api/v1/rooms/users/all".to_owned()),
            (Method::GET, "/api/v1/users/orphan".to_owned()),
            (Method::GET, "/api/v1/users/banned".to_owned()),
            (Method::GET, "/api/v1/users/messaging/disabled".to_owned()),
            (Method::DELETE, "/api/v1/database".to_owned()),
        ]
    );
    assert!(executor
        .requests()
        .iter()
        .all(|r| r.header("api-key") == Some(ADMIN_KEY) && r.body.is_none()));
}

#[tokio::test]
async fn client_scoped_calls_send_client_key_and_uid() {
    let (api, executor) = api();
    assert_ok!(api.subscribe_to_room("lobby").await);
    assert_ok!(api.unsubscribe_from_room("lobby").await);
    assert_ok!(api.get_messages_for_room("lobby", "someone-else").await);

    let requests = executor.requests();
    assert_eq!(requests[0].url.path(), "/api/v1/users/subscribe/room/lobby");
    assert_eq!(requests[1].url.path(), "/api/v1/users/unsubscribe/room/lobby");
    assert_eq!(requests[2].url.path(), "/api/v1/messages/room/lobby");
    for request in &requests {
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.header("api-key"), Some(CLIENT_KEY));
        // The identity uid, not the argument.
        assert_eq!(request.header("uid"), Some(UID));
    }
}

#[tokio::test]
async fn room_id_is_percent_encoded() {
    let (api, executor) = api();
    assert_ok!(api.subscribe_to_room("team a/b").await);
    assert_eq!(
        executor.single_request().url.as_str(),
        "https://socketlink.test/api/v1/users/subscribe/room/team%20a%2Fb"
    );
}

#[tokio::test]
async fn ping_needs_no_credentials() {
    let executor = RecordingExecutor::new();
    let config = SocketlinkConfig::new(common::TEST_URL);
    let api = ApiClient::with_executor(&config, executor.clone()).unwrap();

    assert_ok!(api.ping_server().await);
    let request = executor.single_request();
    assert_eq!(request.url.path(), "/api/v1/ping");
    assert!(request.headers.is_empty());
}

// ── Responses ───────────────────────────────────────────────────────

#[tokio::test]
async fn response_body_is_returned_verbatim() {
    let (api, executor) = api();
    executor.respond_with(Ok(json!({ "rooms": [{ "rid": "r1", "uid": ["alice"] }] })));

    let body = api.fetch_all_rooms().await.unwrap();
    assert_eq!(body["rooms"][0]["rid"], "r1");
}

#[tokio::test]
async fn executor_errors_propagate_unchanged() {
    let (api, executor) = api();
    executor.respond_with(Err(SocketlinkError::Api {
        status: Some(403),
        message: "Invalid api key".into(),
    }));

    let err = api.get_banned_users().await.unwrap_err();
    assert_eq!(err.to_string(), "API request error: Invalid api key");
    assert!(!err.is_precondition());
}
