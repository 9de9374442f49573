//! Streaming client for the CrowdSec-style Local API decision feed.
//!
//! A background task polls `GET /v1/decisions/stream` on the configured
//! interval (`startup=true` on the first call) and pushes the parsed
//! batches into drain queues. The control task only ever touches the
//! queues, never the poller state.

mod stream_client;
mod wire;

pub use stream_client::CrowdsecStreamClient;
