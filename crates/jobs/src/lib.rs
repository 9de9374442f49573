pub mod decision_sync;
pub mod runner;

pub use decision_sync::DecisionSyncJob;
pub use runner::JobRunner;
