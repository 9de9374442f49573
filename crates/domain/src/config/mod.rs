//! Configuration module for the edge bouncer
//!
//! Structures organized by concern:
//! - `root`: main configuration, CLI overrides, load/validate
//! - `feed`: decision feed (LAPI) connection settings
//! - `cdn`: CDN IP-filter backend settings
//! - `waf`: edge-WAF custom-rule backend settings
//! - `fastly`: Fastly-style account/service settings
//! - `errors`: configuration errors

pub mod cdn;
pub mod errors;
pub mod fastly;
pub mod feed;
pub mod root;
pub mod waf;

pub use cdn::CdnConfig;
pub use errors::ConfigError;
pub use fastly::{FastlyAccountConfig, FastlyConfig, FastlyServiceConfig};
pub use feed::DecisionFeedConfig;
pub use root::{CliOverrides, Config};
pub use waf::WafConfig;
