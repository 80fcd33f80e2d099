// Integration tests: the HTTP adapter and the directory controller against a mock user service.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use url::Url;
use userdir_manager::{
    ApiError, Completion, HttpUserApi, NewUser, Request, UserApi, UserDirectory, UserField, UserId,
    UserRecord,
};

fn api_for(server: &MockServer) -> HttpUserApi {
    let base = Url::parse(&server.base_url()).unwrap();
    HttpUserApi::with_timeout(base, Duration::from_secs(5)).unwrap()
}

fn directory_for(server: &MockServer) -> UserDirectory {
    UserDirectory::new(Arc::new(api_for(server)))
}

#[tokio::test]
async fn list_all_reads_users_and_keeps_extra_fields() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200).json_body(json!([
                {"id": 1, "name": "Ann", "email": "a@x.com", "phone": "555"},
                {"id": "b-2", "name": "Bob", "email": "b@y.com"}
            ]));
        })
        .await;

    let users = api_for(&server).list_all().await.unwrap();

    mock.assert_async().await;
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].id, UserId::Number(1));
    assert_eq!(users[0].extra.get("phone"), Some(&json!("555")));
    assert_eq!(users[1].id, UserId::Text("b-2".to_string()));
}

#[tokio::test]
async fn one_odd_record_does_not_fail_the_fetch() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200).json_body(json!([
                {"id": -1, "name": "Neg", "email": "n@x"},
                {"id": 2, "name": null, "email": "two@x"}
            ]));
        })
        .await;

    let mut dir = directory_for(&server);
    dir.initialize().await;

    let state = dir.state();
    assert!(state.error().is_none());
    assert_eq!(state.users().len(), 2);
    assert_eq!(state.users()[0].id.to_string(), "-1");
    assert_eq!(state.users()[1].name, "");
}

#[tokio::test]
async fn create_posts_name_and_email() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/users")
                .json_body(json!({"name": "Cy", "email": "c@z.com"}));
            then.status(201)
                .json_body(json!({"id": 11, "name": "Cy", "email": "c@z.com"}));
        })
        .await;

    let created = api_for(&server)
        .create(&NewUser {
            name: "Cy".into(),
            email: "c@z.com".into(),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created, UserRecord::new(11u64, "Cy", "c@z.com"));
}

#[tokio::test]
async fn delete_accepts_any_success_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/users/4");
            then.status(200).body("{}");
        })
        .await;

    api_for(&server).delete(&UserId::Number(4)).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(PUT).path("/users/9");
            then.status(404);
        })
        .await;

    let err = api_for(&server)
        .update(&UserId::Number(9), &UserRecord::new(9u64, "X", "x@x"))
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert!(matches!(err, ApiError::Status { .. }));
}

#[tokio::test]
async fn initialize_failure_sets_fetch_message() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(500);
        })
        .await;

    let mut dir = directory_for(&server);
    dir.initialize().await;

    let state = dir.state();
    assert!(!state.is_loading());
    assert!(state.users().is_empty());
    assert_eq!(state.error(), Some("Failed to fetch users"));
    assert_eq!(state.in_flight(), 0);
}

#[tokio::test]
async fn unreachable_service_is_a_fetch_failure() {
    // Nothing listens on the discard port.
    let base = Url::parse("http://127.0.0.1:9/").unwrap();
    let api = HttpUserApi::with_timeout(base, Duration::from_secs(2)).unwrap();
    let mut dir = UserDirectory::new(Arc::new(api));

    dir.initialize().await;

    assert_eq!(dir.state().error(), Some("Failed to fetch users"));
    assert!(!dir.state().is_loading());
}

#[tokio::test]
async fn save_edit_sends_whole_record_and_replaces_it() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200).json_body(json!([
                {"id": 1, "name": "Ann", "email": "a@x.com",
                 "address": {"city": "Gwenborough"}}
            ]));
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT).path("/users/1").json_body(json!({
                "id": 1, "name": "Anna", "email": "a@x.com",
                "address": {"city": "Gwenborough"}
            }));
            then.status(200).json_body(json!({
                "id": 1, "name": "Anna", "email": "a@x.com",
                "address": {"city": "Gwenborough"}
            }));
        })
        .await;

    let mut dir = directory_for(&server);
    dir.initialize().await;
    list.assert_async().await;

    let ann = dir.state().users()[0].clone();
    dir.begin_edit(&ann);
    dir.update_editing_field(UserField::Name, "Anna");
    assert_eq!(dir.state().users()[0].name, "Ann");

    dir.save_edit().await;
    put.assert_async().await;

    let state = dir.state();
    assert!(state.editing_user().is_none());
    assert!(state.error().is_none());
    assert_eq!(state.users()[0].name, "Anna");
    assert_eq!(
        state.users()[0].extra.get("address"),
        Some(&json!({"city": "Gwenborough"}))
    );
}

#[tokio::test]
async fn failed_delete_keeps_the_record() {
    let server = MockServer::start_async().await;
    let _list = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200)
                .json_body(json!([{"id": 3, "name": "Cat", "email": "c@c"}]));
        })
        .await;
    let _del = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/users/3");
            then.status(503);
        })
        .await;

    let mut dir = directory_for(&server);
    dir.initialize().await;
    dir.delete_user(UserId::Number(3)).await;

    assert_eq!(dir.state().users().len(), 1);
    assert_eq!(dir.state().error(), Some("Failed to delete user"));

    dir.state_mut().dismiss_error();
    assert!(dir.state().error().is_none());
}

#[tokio::test]
async fn add_then_search_finds_new_user() {
    let server = MockServer::start_async().await;
    let _list = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200)
                .json_body(json!([{"id": 1, "name": "Ann", "email": "a@x.com"}]));
        })
        .await;
    let _create = server
        .mock_async(|when, then| {
            when.method(POST).path("/users");
            then.status(201)
                .json_body(json!({"id": 11, "name": "Zed", "email": "zed@q.org"}));
        })
        .await;

    let mut dir = directory_for(&server);
    dir.initialize().await;
    dir.add_user("Zed", "zed@q.org").await;
    assert_eq!(dir.state().users().len(), 2);

    dir.set_search_term("Q.ORG");
    let visible = dir.visible_users();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, UserId::Number(11));

    dir.set_search_term("");
    assert_eq!(dir.visible_users().len(), 2);
}

#[tokio::test]
async fn spawned_requests_report_back_over_the_channel() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/users");
            then.status(200)
                .json_body(json!([{"id": 5, "name": "Eve", "email": "e@e"}]));
        })
        .await;

    let mut dir = directory_for(&server);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let request = dir.state_mut().begin_initialize();
    assert_eq!(request, Request::ListAll);
    assert!(dir.state().is_loading());

    dir.spawn(&tokio::runtime::Handle::current(), request, tx)
        .await
        .unwrap();
    let completion = rx.recv().await.unwrap();
    assert!(matches!(completion, Completion::Listed(Ok(_))));
    dir.apply(completion);

    mock.assert_async().await;
    assert!(!dir.state().is_loading());
    assert_eq!(dir.state().users()[0].name, "Eve");
    assert_eq!(dir.state().in_flight(), 0);
}
