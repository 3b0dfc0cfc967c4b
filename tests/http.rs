//! HTTP surface tests against a stub bundler or no upstream at all:
//! unsupported chains and unknown operation ids fail before any outbound
//! call, and the submit flow is exercised end to end.

use alloy::primitives::{Address, B256};
use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::post as post_route,
};
use gasless_relay::{
    chains::Chains,
    config::RelayConfig,
    rpc::Relay,
    storage::{PendingOperation, RelayStorage, StorageApi},
    types::UserOperation,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

fn relay(config: RelayConfig) -> (Router, RelayStorage) {
    let storage = RelayStorage::in_memory();
    let router = Relay::new(Chains::new(&config), storage.clone()).into_router();
    (router, storage)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn check_on_unsupported_chain_is_disabled_not_an_error() {
    let (router, _) = relay(RelayConfig::default());
    let (status, body) = send(
        router,
        Request::get("/gasless/check/0x1111111111111111111111111111111111111111/1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["delegator"], Value::Null);
    assert_eq!(body["error"], "Unsupported chain");
}

#[tokio::test]
async fn prepare_on_unsupported_chain_is_rejected() {
    let (router, storage) = relay(RelayConfig::default());
    let (status, body) = send(
        router,
        post(
            "/gasless/prepare",
            json!({
                "address": "0x1111111111111111111111111111111111111111",
                "chainId": 1,
                "calls": []
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unsupported chain 1");
    // A failed prepare parks nothing.
    assert_eq!(storage.pending_count().await, 0);
}

#[tokio::test]
async fn submit_with_unknown_op_id_is_rejected() {
    let (router, _) = relay(RelayConfig::default());
    let (status, body) = send(
        router,
        post(
            "/gasless/submit",
            json!({
                "opId": "0xdddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd",
                "signature": "0x00"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "operation not found or expired");
}

/// Accepts the operation under a hash of its own and reports it included but
/// reverted on the first receipt poll.
async fn bundler_stub(Json(req): Json<Value>) -> Json<Value> {
    let result = match req["method"].as_str() {
        Some("eth_sendUserOperation") => {
            json!("0x9999999999999999999999999999999999999999999999999999999999999999")
        }
        Some("eth_getUserOperationReceipt") => json!({
            "success": false,
            "receipt": {
                "transactionHash":
                    "0x2222222222222222222222222222222222222222222222222222222222222222"
            }
        }),
        _ => Value::Null,
    };
    Json(json!({"jsonrpc": "2.0", "id": req["id"], "result": result}))
}

#[tokio::test]
async fn submit_reports_the_signed_hash_and_the_on_chain_revert() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().route("/", post_route(bundler_stub))).await.unwrap()
    });

    let mut config = RelayConfig::default();
    let bundler_url = Url::parse(&format!("http://{addr}/")).unwrap();
    for chain in config.chains.values_mut() {
        chain.bundler_url = bundler_url.clone();
    }
    let (router, storage) = relay(config);

    let signed_hash = B256::repeat_byte(0x5a);
    let op_id = storage
        .put_pending_op(PendingOperation {
            user_op: UserOperation::default(),
            user_op_hash: signed_hash,
            chain_id: 80002,
            sender: Address::repeat_byte(0x11),
        })
        .await;

    let (status, body) =
        send(router, post("/gasless/submit", json!({"opId": op_id, "signature": "0x00"}))).await;

    // Included but reverted: a soft failure carrying the inclusion details,
    // keyed on the hash the user signed even though the stub tracks another.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body.get("pending").is_none());
    assert_eq!(body["userOpHash"], format!("{signed_hash}"));
    assert_eq!(
        body["txHash"],
        "0x2222222222222222222222222222222222222222222222222222222222222222"
    );
    assert_eq!(body["gasless"], true);
    assert!(body["explorerUrl"].as_str().unwrap().ends_with(body["txHash"].as_str().unwrap()));
    assert_eq!(storage.pending_count().await, 0);
}
