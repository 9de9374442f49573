pub mod backend;
pub mod decision_feed;

pub use backend::Backend;
pub use decision_feed::DecisionFeed;
