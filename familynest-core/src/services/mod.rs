//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions.

pub mod event_log;
mod session;

pub use event_log::{EntryPoint, EventCount, EventFilter, EventLog, LogEvent, RecordedEvent, SessionEvent};
pub use session::SessionManager;
