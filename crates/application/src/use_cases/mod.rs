pub mod sync_decisions;

pub use sync_decisions::{SyncDecisionsUseCase, SyncStats};
