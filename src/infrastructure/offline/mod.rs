pub mod recovery;
mod rows;
mod sqlite_action_store;

pub use recovery::{RecoveryEmitter, RecoveryReport, StartupRecovery};
pub use sqlite_action_store::SqliteActionStore;
