//! GitHub webhook 入口
//!
//! POST /github
//!
//! 签名校验由 `VerifiedWebhook` 完成；只处理 `release` 事件的 `published` 动作。
//! 匹配到父版本后在后台安装，请求本身立即返回通用确认，
//! 不暴露匹配结果或安装结果

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ParentVersion;
use crate::domain::{ReleaseEvent, ReleaseInfo};
use crate::middleware::VerifiedWebhook;
use crate::services::release::trigger_install;
use crate::state::AppState;

/// 事件处理结果
#[derive(Debug)]
pub enum WebhookOutcome {
    /// 需要安装
    Install {
        parent: ParentVersion,
        release: ReleaseInfo,
    },
    /// GitHub 创建 webhook 时发送的 ping
    Ping,
    /// 忽略（原因只记录日志）
    Ignored(String),
}

/// 创建 webhook 路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/github", post(github_webhook))
}

/// 判断已验签的事件是否需要安装
pub fn classify_event(state: &AppState, event: &str, body: &[u8]) -> WebhookOutcome {
    match event {
        "release" => {}
        "ping" => return WebhookOutcome::Ping,
        other => return WebhookOutcome::Ignored(format!("unsupported event '{}'", other)),
    }

    let payload: ReleaseEvent = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => return WebhookOutcome::Ignored(format!("malformed release payload: {}", e)),
    };

    if !payload.is_published() {
        return WebhookOutcome::Ignored(format!("release action '{}'", payload.action));
    }

    let Some(parent) = state.match_release(
        &payload.repository.full_name,
        payload.release.target_commitish.as_deref(),
    ) else {
        return WebhookOutcome::Ignored(format!(
            "no parent configured for {}",
            payload.repository.full_name
        ));
    };

    WebhookOutcome::Install {
        parent: parent.clone(),
        release: payload.release,
    }
}

/// GitHub webhook
///
/// POST /github
async fn github_webhook(State(state): State<Arc<AppState>>, webhook: VerifiedWebhook) -> Json<Value> {
    match classify_event(&state, &webhook.event, &webhook.body) {
        WebhookOutcome::Install { parent, release } => {
            info!(
                parent = %parent.name,
                tag = %release.tag_name,
                delivery = ?webhook.delivery,
                "Release published, scheduling install"
            );
            tokio::spawn(trigger_install(state.clone(), parent, Some(release)));
        }
        WebhookOutcome::Ping => {
            debug!(delivery = ?webhook.delivery, "Received webhook ping");
        }
        WebhookOutcome::Ignored(reason) => {
            info!(event = %webhook.event, delivery = ?webhook.delivery, reason = %reason, "Ignoring webhook delivery");
        }
    }

    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::publish::PublisherSet;
    use crate::test_support::{eventually, parent, sign, test_state, MockLoader, RecordingEndpoint, TEST_SECRET};
    use axum::{body::Body, http::Request, http::StatusCode};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    fn release_payload(action: &str, repository: &str, tag: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "action": action,
            "release": {
                "id": 11,
                "tag_name": tag,
                "target_commitish": "master",
                "assets": []
            },
            "repository": { "full_name": repository }
        }))
        .unwrap()
    }

    fn request(event: &str, body: Vec<u8>, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::post("/github")
            .header("content-type", "application/json")
            .header("x-github-event", event)
            .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958");
        if let Some(signature) = signature {
            builder = builder.header("x-hub-signature-256", signature);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn setup(root: &std::path::Path) -> (Arc<AppState>, Arc<MockLoader>, Arc<Mutex<Vec<String>>>) {
        let loader = Arc::new(MockLoader::new(&[("CloudNet.zip", b"zip")]));
        let endpoint = RecordingEndpoint::new("recording");
        let calls = endpoint.calls.clone();
        let state = test_state(
            root,
            loader.clone(),
            PublisherSet::from_enabled(vec![Box::new(endpoint)]),
            vec![parent("v3")],
        )
        .await;
        (state, loader, calls)
    }

    #[tokio::test]
    async fn test_signed_release_installs_once() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, loader, calls) = setup(tmp.path()).await;

        let body = release_payload("published", "CloudNetService/v3", "3.4.0");
        let signature = sign(TEST_SECRET, &body);
        let response = router()
            .with_state(state.clone())
            .oneshot(request("release", body, Some(signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(
            eventually(|| {
                let calls = calls.clone();
                async move { calls.lock().await.len() == 1 }
            })
            .await
        );
        assert!(state.registry.get("v3", "3.4.0").await.unwrap().is_some());
        assert_eq!(loader.fetch_count(), 1);
        assert!(tmp.path().join("archive/v3/3.4.0/CloudNet.zip").exists());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_installs_once() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _loader, calls) = setup(tmp.path()).await;

        let body = release_payload("published", "CloudNetService/v3", "3.4.0");
        for _ in 0..2 {
            let response = router()
                .with_state(state.clone())
                .oneshot(request("release", body.clone(), Some(sign(TEST_SECRET, &body))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(
            eventually(|| {
                let calls = calls.clone();
                async move { !calls.lock().await.is_empty() }
            })
            .await
        );
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(calls.lock().await.len(), 1);
        assert_eq!(state.registry.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, loader, _calls) = setup(tmp.path()).await;

        let body = release_payload("published", "CloudNetService/v3", "3.4.0");
        let forged = sign("wrong secret", &body);

        for signature in [Some(forged), None, Some("sha256=nothex".to_string())] {
            let response = router()
                .with_state(state.clone())
                .oneshot(request("release", body.clone(), signature))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(loader.fetch_count(), 0);
        assert!(state.registry.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ignored_events_acknowledged() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, loader, _calls) = setup(tmp.path()).await;

        let cases = [
            ("ping", br#"{"zen":"Keep it logically awesome."}"#.to_vec()),
            ("push", br#"{"ref":"refs/heads/master"}"#.to_vec()),
            ("release", release_payload("created", "CloudNetService/v3", "3.4.0")),
            ("release", release_payload("published", "someone/else", "3.4.0")),
            ("release", b"not json".to_vec()),
        ];

        for (event, body) in cases {
            let signature = sign(TEST_SECRET, &body);
            let response = router()
                .with_state(state.clone())
                .oneshot(request(event, body, Some(signature)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json, json!({ "status": "ok" }));
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(loader.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_classify_event() {
        let tmp = tempfile::tempdir().unwrap();
        let (state, _loader, _calls) = setup(tmp.path()).await;

        let body = release_payload("published", "cloudnetservice/V3", "3.4.0");
        match classify_event(&state, "release", &body) {
            WebhookOutcome::Install { parent, release } => {
                assert_eq!(parent.name, "v3");
                assert_eq!(release.tag_name, "3.4.0");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert!(matches!(
            classify_event(&state, "release", &release_payload("deleted", "CloudNetService/v3", "3.4.0")),
            WebhookOutcome::Ignored(_)
        ));
        assert!(matches!(classify_event(&state, "ping", b"{}"), WebhookOutcome::Ping));
    }
}
