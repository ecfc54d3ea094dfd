//! Session lifecycle: context, orchestration, and outcome.

pub mod context;
pub mod manager;

pub use context::SessionContext;
pub use manager::{LifecycleState, SessionManager, SessionOutcome};
