//! Edge Bouncer Infrastructure Layer
//!
//! Remote-surface implementations of the application ports: the decision
//! feed stream client and the CDN / edge-WAF / Fastly-style backends,
//! plus the signed HTTP transports they share.
pub mod cdn;
pub mod edgewaf;
pub mod fastly;
pub mod feed;
pub mod tencent;

mod http;
