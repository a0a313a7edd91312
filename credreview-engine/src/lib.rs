pub mod commit;
pub mod config;
pub mod draft_store;
pub mod interpreter;
pub mod pending_queue;
pub mod reconciliation;
pub mod registry;
pub mod session;
pub mod workflow;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub use commit::{
    CommitListener, CommitOrchestrator, CommitReport, CommitSettings, DraftCleanupPolicy,
    MutationOutcome,
};
pub use config::Config;
pub use draft_store::{DraftSnapshot, DraftStore, PersistenceFailure};
pub use pending_queue::PendingQueue;
pub use reconciliation::{open_session, reconcile};
pub use registry::{HttpRegistryClient, MutationAck, RegistryClient};
pub use session::{ReviewSession, SessionPhase, SharedSession};
pub use workflow::{ActionOutcome, ReviewWorkflow};

/// Install the fmt subscriber used by hosts and tests.
///
/// Logs at INFO unless `RUST_LOG` says otherwise. Calling it again once a
/// subscriber is installed does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
