//! 请求中间件
//!
//! 以 extractor 形式提供的请求前置校验

pub mod api_guard;
pub mod signature;

pub use api_guard::RequireApiEnabled;
pub use signature::{verify_signature, SignatureError, VerifiedWebhook};
