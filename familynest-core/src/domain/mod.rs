//! Core domain entities
//!
//! All entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub(crate) mod ids;
pub mod result;
mod session;
mod transaction;
mod user;

pub use account::Account;
pub use session::{Session, SessionPhase};
pub use transaction::Transaction;
pub use user::{Role, User};
