use std::time::{Duration, SystemTime};

use lumera_core::{
    ClientError, GroupUpdater, KindFilter, LoginMethod, LumeraClient, NodeKind, PhotoSetKind,
    PhotoSetUpdater,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RPC: &str = "/api/v1/rpc";

fn rpc_ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": result, "error": null }))
}

fn home_tree(server_uri: &str) -> serde_json::Value {
    json!({
        "$type": "Group",
        "Id": 1,
        "Title": "Home",
        "Elements": [
            {
                "$type": "Group",
                "Id": 10,
                "Title": "Travel",
                "Elements": [
                    {
                        "$type": "PhotoSet",
                        "Id": 100,
                        "Title": "Iceland",
                        "UploadUrl": format!("{server_uri}/up/100")
                    }
                ]
            }
        ]
    })
}

async fn logged_in_client(server: &MockServer) -> LumeraClient {
    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "AuthenticatePlain" })))
        .respond_with(rpc_ok(json!("test-token")))
        .mount(server)
        .await;

    let mut client = LumeraClient::with_base_url(&server.uri(), "ansel").unwrap();
    client.login("pw", LoginMethod::Plain).await.unwrap();
    client
}

#[tokio::test]
async fn resolve_fetches_the_tree_once() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({
            "method": "LoadGroupHierarchy",
            "params": ["ansel"]
        })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .expect(1)
        .mount(&server)
        .await;

    let node = client
        .resolve("/Home/Travel/Iceland", KindFilter::PhotoSet)
        .await
        .unwrap()
        .expect("photo set");
    assert_eq!(node.id, 100);
    assert_eq!(node.kind, NodeKind::PhotoSet);

    // Served from the cache; the expect(1) above fails otherwise.
    let node = client
        .resolve("/Home/Travel", KindFilter::Group)
        .await
        .unwrap()
        .expect("group");
    assert_eq!(node.id, 10);

    assert!(
        client
            .resolve("/Home/Travel/Iceland", KindFilter::Group)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn create_group_invalidates_the_cached_tree() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    // First snapshot has no Vacation group; after the create, the refetched
    // snapshot must be consulted instead of the stale cache.
    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({
            "method": "CreateGroup",
            "params": [1, { "Title": "Vacation" }]
        })))
        .respond_with(rpc_ok(json!({
            "$type": "Group",
            "Id": 20,
            "Title": "Vacation",
            "PageUrl": "https://lumera.photos/ansel/vacation"
        })))
        .mount(&server)
        .await;

    let created = client
        .create_group("/Home", GroupUpdater::titled("Vacation"))
        .await
        .unwrap();
    assert_eq!(created.id, 20);
    assert_eq!(
        created.page_url.as_deref(),
        Some("https://lumera.photos/ansel/vacation")
    );

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(json!({
            "$type": "Group",
            "Id": 1,
            "Title": "Home",
            "Elements": [
                { "$type": "Group", "Id": 20, "Title": "Vacation" }
            ]
        })))
        .mount(&server)
        .await;

    let node = client
        .resolve("/Home/Vacation", KindFilter::Group)
        .await
        .unwrap()
        .expect("created group is visible");
    assert_eq!(node.id, 20);
}

#[tokio::test]
async fn create_group_fails_without_parent() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .mount(&server)
        .await;

    let err = client
        .create_group("/Home/Nowhere", GroupUpdater::titled("Lost"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::GroupNotFound { path } if path == "/Home/Nowhere"));
}

#[tokio::test]
async fn create_photo_set_sends_kind_and_sparse_updater() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .mount(&server)
        .await;

    // The updater must come across with only its populated fields.
    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({
            "method": "CreatePhotoSet",
            "params": [10, "Gallery", {
                "Title": "Japan",
                "Keywords": ["film", "street"]
            }]
        })))
        .respond_with(rpc_ok(json!({
            "Id": 101,
            "Title": "Japan",
            "UploadUrl": format!("{}/up/101", server.uri())
        })))
        .mount(&server)
        .await;

    let updater = PhotoSetUpdater {
        keywords: Some(vec!["film".to_owned(), "street".to_owned()]),
        ..PhotoSetUpdater::titled("Japan")
    };
    let snapshot = client
        .create_photo_set("/Home/Travel", PhotoSetKind::Gallery, updater)
        .await
        .unwrap();

    assert_eq!(snapshot.id, 101);
    assert!(snapshot.photos.is_empty());
}

#[tokio::test]
async fn photo_set_at_loads_the_photo_listing() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({
            "method": "LoadPhotoSet",
            "params": [100, "Level2", true]
        })))
        .respond_with(rpc_ok(json!({
            "Id": 100,
            "Title": "Iceland",
            "UploadUrl": format!("{}/up/100", server.uri()),
            "Photos": [
                { "Id": 9001, "FileName": "geyser.jpg", "Size": 5000 },
                { "Id": 9002, "FileName": "lagoon.jpg", "Size": 7200 }
            ]
        })))
        .mount(&server)
        .await;

    let snapshot = client
        .photo_set_at("/Home/Travel/Iceland")
        .await
        .unwrap()
        .expect("photo set");

    assert_eq!(snapshot.photos.len(), 2);
    let photo = snapshot.photo_by_file_name("geyser.jpg").expect("photo");
    assert_eq!(photo.id, 9001);
    assert_eq!(photo.size, 5000);
    assert!(snapshot.photo_by_file_name("missing.jpg").is_none());
}

#[tokio::test]
async fn photo_set_at_returns_none_for_missing_path() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .mount(&server)
        .await;

    assert!(client.photo_set_at("/Home/Nope").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_photo_returns_the_service_flag() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({
            "method": "DeletePhoto",
            "params": [9001]
        })))
        .respond_with(rpc_ok(json!(true)))
        .mount(&server)
        .await;

    assert!(client.delete_photo(9001).await.unwrap());
}

#[tokio::test]
async fn upload_photo_hits_the_container_upload_url() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/up/100"))
        .and(query_param("filename", "geyser.jpg"))
        .and(query_param("modified", "Fri, 02 Jan 1970 00:00:00 GMT"))
        .and(header("Content-Type", "image/jpeg"))
        .and(header("X-Lumera-Token", "test-token"))
        .and(body_string("raw-jpeg"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(86_400);
    client
        .upload_photo(
            "/Home/Travel/Iceland",
            "geyser.jpg",
            modified,
            b"raw-jpeg".to_vec(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn upload_photo_without_container_fails() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(rpc_ok(home_tree(&server.uri())))
        .mount(&server)
        .await;

    let err = client
        .upload_photo("/Home/Travel", "a.jpg", SystemTime::UNIX_EPOCH, vec![1])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::ContainerNotFound { path } if path == "/Home/Travel"));
}

#[test]
fn updaters_serialize_only_populated_fields() {
    let value = serde_json::to_value(GroupUpdater::titled("Hikes")).unwrap();
    assert_eq!(value, json!({ "Title": "Hikes" }));

    let updater = PhotoSetUpdater {
        caption: Some("spring".to_owned()),
        ..PhotoSetUpdater::titled("Blossoms")
    };
    let value = serde_json::to_value(updater).unwrap();
    assert_eq!(value, json!({ "Title": "Blossoms", "Caption": "spring" }));
}

#[tokio::test]
async fn service_error_carries_the_message() {
    let server = MockServer::start().await;
    let mut client = logged_in_client(&server).await;

    Mock::given(method("POST"))
        .and(path(RPC))
        .and(body_partial_json(json!({ "method": "LoadGroupHierarchy" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": { "code": 5005, "message": "hierarchy unavailable" }
        })))
        .mount(&server)
        .await;

    let err = client
        .resolve("/Home", KindFilter::Any)
        .await
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("hierarchy unavailable"), "got {text}");
    assert!(!err.is_retryable());
}
