pub mod channel_registry;
pub mod dispatch_service;
pub mod journal_service;
pub mod queue_service;
pub mod session_service;
pub mod sync_service;

pub use channel_registry::{
    ChangeHandler, ChangeSpec, ChannelHandle, ChannelRegistration, ChannelRegistry,
};
pub use dispatch_service::{DispatchOutcome, DispatchService};
pub use journal_service::{AppendOutcome, JournalService};
pub use queue_service::{EnqueueOutcome, QueueService};
pub use session_service::{SessionService, SessionSubscription};
pub use sync_service::{ProgressSubscription, SyncEngine, SyncRun};
