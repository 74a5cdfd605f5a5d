#![allow(clippy::unwrap_used)]
// Integration tests for `BugswarmClient` using wiremock.

use bytes::Bytes;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bugswarm_api::{
    BugswarmClient, Error, Invitation, InvitationStatus, KeyType, MemberType, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BugswarmClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = BugswarmClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn invitation(status: &str) -> Invitation {
    serde_json::from_value(json!({
        "id": "inv-1",
        "from": "alice",
        "to": "bob",
        "resource_id": "res-1",
        "swarm_id": "sw-1",
        "resource_type": "consumer",
        "status": status
    }))
    .unwrap()
}

// ── Auth header ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_key_header_sent() {
    let server = MockServer::start().await;
    let addr = server.address();
    let transport = TransportConfig {
        secure: false,
        ..TransportConfig::default()
    };
    let key = SecretString::from("cfg-key".to_string());
    let client =
        BugswarmClient::new(&addr.ip().to_string(), addr.port(), &key, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/swarms"))
        .and(header("x-bugswarmapikey", "cfg-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let swarms = client.list_swarms().await.unwrap();
    assert!(swarms.is_empty());
}

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_key() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/resources"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_resources().await;
    assert!(
        matches!(result, Err(Error::InvalidApiKey)),
        "expected InvalidApiKey, got: {result:?}"
    );
}

// ── Swarms ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_swarms() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/swarms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "sw-1", "name": "Lab", "public": false, "user_id": "alice",
              "resources": [{ "resource_id": "res-1", "resource_type": "producer" }] },
            { "id": "sw-2", "name": "Garage", "public": true }
        ])))
        .mount(&server)
        .await;

    let swarms = client.list_swarms().await.unwrap();
    assert_eq!(swarms.len(), 2);
    assert_eq!(swarms[0].name, "Lab");
    assert_eq!(swarms[0].members[0].member_type, MemberType::Producer);
    assert!(swarms[1].is_public);
}

#[tokio::test]
async fn test_get_swarm_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/swarms/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get_swarm("missing").await.unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got: {err:?}");
}

#[tokio::test]
async fn test_create_swarm() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/swarms"))
        .and(body_json(json!({ "name": "Lab", "description": "sensors", "public": false })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "sw-9", "name": "Lab" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let swarm = client.create_swarm("Lab", Some("sensors"), false).await.unwrap();
    assert_eq!(swarm.id, "sw-9");
}

#[tokio::test]
async fn test_list_swarm_resources_filtered_by_type() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/swarms/sw-1/resources"))
        .and(query_param("type", "consumer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "swarm_id": "sw-1", "resource_id": "res-2", "resource_type": "consumer" }
        ])))
        .mount(&server)
        .await;

    let members = client
        .list_swarm_resources("sw-1", Some(MemberType::Consumer))
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].resource_id, "res-2");
}

#[tokio::test]
async fn test_add_swarm_resource() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/swarms/sw-1/resources"))
        .and(body_json(json!({ "resource_id": "res-1", "resource_type": "producer" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client
        .add_swarm_resource("sw-1", "res-1", MemberType::Producer)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_error_message_extracted() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/swarms/sw-1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errors": [{ "description": "swarm is locked" }]
        })))
        .mount(&server)
        .await;

    let result = client.delete_swarm("sw-1").await;
    match result {
        Err(Error::Http { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "swarm is locked");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

// ── Resources ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_resource_absent_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/resources/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client.get_resource("gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_resource() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/resources"))
        .and(body_json(json!({
            "name": "pi-kitchen",
            "description": "Raspberry Pi",
            "machine_type": "pc",
            "position": { "latitude": 0.0, "longitude": 0.0 }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "res-new",
            "name": "pi-kitchen",
            "machine_type": "pc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resource = client
        .create_resource("pi-kitchen", "Raspberry Pi", "pc", 0.0, 0.0)
        .await
        .unwrap();
    assert_eq!(resource.resource_id, "res-new");
}

#[tokio::test]
async fn test_upload_binary() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/upload/alice/res-1/camera"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_string("JPEG"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .upload_binary("alice", "res-1", "camera", Bytes::from_static(b"JPEG"))
        .await
        .unwrap();
}

// ── Invitations ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_accept_invitation() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/resources/res-1/invitations/inv-1"))
        .and(body_json(json!({ "status": "accepted" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .respond_to_invitation(&invitation("new"), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_answered_invitation_is_rejected_locally() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let inv = invitation("accepted");
    assert_eq!(inv.status, InvitationStatus::Accepted);

    let result = client.respond_to_invitation(&inv, false).await;
    assert!(
        matches!(result, Err(Error::InvitationClosed { .. })),
        "expected InvitationClosed, got: {result:?}"
    );
}

#[tokio::test]
async fn test_list_received_invitations() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/resources/res-1/invitations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "inv-1", "from": "alice", "to": "bob", "resource_id": "res-1",
              "swarm_id": "sw-1", "resource_type": "consumer", "status": "new" }
        ])))
        .mount(&server)
        .await;

    let invitations = client.list_received_invitations("res-1").await.unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].status, InvitationStatus::New);
}

// ── Keys ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_key_uses_basic_auth() {
    let (server, client) = setup().await;

    // "alice:s3cret" base64-encoded
    Mock::given(method("POST"))
        .and(path("/keys/participation"))
        .and(header("authorization", "Basic YWxpY2U6czNjcmV0"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "key": "p-key",
            "type": "participation",
            "active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let password = SecretString::from("s3cret".to_string());
    let key = client
        .create_key("alice", &password, KeyType::Participation)
        .await
        .unwrap();
    assert_eq!(key.key, "p-key");
    assert_eq!(key.key_type, KeyType::Participation);
}
