//! GitHub webhook 签名校验
//!
//! 提供 `VerifiedWebhook` extractor：读取完整请求体，用共享密钥计算
//! HMAC-SHA256 并与 `X-Hub-Signature-256` 做常量时间比较。
//! 校验通过之前不解析 payload

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::HeaderMap,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

use crate::config::env::constants::MAX_WEBHOOK_BODY_BYTES;
use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// 签名校验失败原因（只用于日志，不返回给调用方）
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    MissingSecret,
    #[error("signature header is missing")]
    MissingSignature,
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
}

/// 校验 `sha256=<hex>` 格式的签名
pub fn verify_signature(secret: Option<&str>, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
    let secret = secret.filter(|s| !s.is_empty()).ok_or(SignatureError::MissingSecret)?;
    let header = header.ok_or(SignatureError::MissingSignature)?;

    let expected = header
        .trim()
        .strip_prefix("sha256=")
        .and_then(|h| hex::decode(h).ok())
        .ok_or(SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::MissingSecret)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// 签名已校验的 webhook 请求
#[derive(Debug, Clone)]
pub struct VerifiedWebhook {
    /// `X-GitHub-Event`
    pub event: String,
    /// `X-GitHub-Delivery`
    pub delivery: Option<String>,
    pub body: Bytes,
}

#[async_trait]
impl FromRequest<Arc<AppState>> for VerifiedWebhook {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let headers = req.headers();
        let event = header_str(headers, EVENT_HEADER).unwrap_or_default();
        let delivery = header_str(headers, DELIVERY_HEADER);
        let signature = header_str(headers, SIGNATURE_HEADER);

        let body = axum::body::to_bytes(req.into_body(), MAX_WEBHOOK_BODY_BYTES)
            .await
            .map_err(|_| ApiError::bad_request("request body is unreadable or too large"))?;

        if let Err(e) = verify_signature(state.config.webhook_secret.as_deref(), signature.as_deref(), &body) {
            tracing::warn!(event = %event, delivery = ?delivery, reason = %e, "Rejected webhook delivery");
            return Err(ApiError::unauthorized());
        }

        Ok(Self { event, delivery, body })
    }
}
