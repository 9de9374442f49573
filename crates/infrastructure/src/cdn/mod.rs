//! CDN backend: projects the ban set onto the single managed blacklist
//! rule of an accelerated domain's IP filter.

mod backend;
mod types;

pub use backend::{CdnApi, CdnBackend, HttpCdnApi};
pub use types::{DomainConfig, IpFilter, IpFilterRule};
