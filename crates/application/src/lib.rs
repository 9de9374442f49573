//! Edge Bouncer Application Layer
//!
//! Ports abstract the decision feed and the remote edge surfaces; use
//! cases hold the synchronization logic driven by the jobs crate.
pub mod ports;
pub mod use_cases;

pub use use_cases::{SyncDecisionsUseCase, SyncStats};
