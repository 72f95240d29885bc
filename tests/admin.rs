//! Bearer-protected operator views.

mod common;

use common::{bind, config, peer, start};
use pairwatch::arbitration::ScriptedDraws;
use reqwest::StatusCode;

#[tokio::test]
async fn test_admin_requires_key() {
    let (listener, url) = bind().await;
    let mut node_config = config("instance-1", "instance-1");
    node_config.admin.enabled = true;
    node_config.admin.api_key = "letmein".into();
    node_config.peers = vec![peer("instance-2", "http://127.0.0.1:9")];
    let node = start(node_config, listener, url, ScriptedDraws::default());

    let denied = node.client.admin("status", "wrong").await.unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let status: serde_json::Value = node.client.admin("status", "letmein").await.unwrap().json().await.unwrap();
    assert_eq!(status["identity"], "instance-1");
    assert_eq!(status["restart_pending"], false);
    assert!(status["version"].is_string());

    let peers: serde_json::Value = node.client.admin("peers", "letmein").await.unwrap().json().await.unwrap();
    assert_eq!(peers[0]["identity"], "instance-2");
    assert_eq!(peers[0]["alive"], true);

    let workers: serde_json::Value = node.client.admin("workers", "letmein").await.unwrap().json().await.unwrap();
    assert_eq!(workers, serde_json::json!([]));
}

#[tokio::test]
async fn test_admin_disabled_routes_absent() {
    let (listener, url) = bind().await;
    let node = start(config("instance-1", "instance-1"), listener, url, ScriptedDraws::default());
    let response = node.client.admin("status", "anything").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
