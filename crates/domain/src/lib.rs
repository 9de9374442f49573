//! Edge Bouncer Domain Layer
pub mod config;
pub mod decision;
pub mod errors;
pub mod ip_group;
pub mod ip_list;
pub mod ip_set;
pub mod ledger;

pub use config::{CliOverrides, Config, ConfigError};
pub use decision::{Action, BanEntry, BanList, Decision, Scope};
pub use errors::BouncerError;
pub use ip_group::{GroupStats, IpGroupPartitioner};
pub use ip_list::{DiscardLog, DiscardReason, IpBlocklist, IpListBuilder};
pub use ip_set::Ipv4CidrSet;
pub use ledger::DecisionLedger;
