//! Session registry module.
//!
//! Handles the lifecycle of kernel-bound sessions: durable session rows,
//! lookup and mutation over a fixed column set, and reconciliation of
//! stored rows against the live kernel registry.

mod error;
mod models;
mod repository;
mod service;

pub use error::{SessionError, SessionResult};
pub use models::{
    NotebookHandle, SessionChanges, SessionColumn, SessionIdentity, SessionModel, SessionRecord,
    SessionSelector,
};
pub use repository::SessionRepository;
pub use service::{SessionService, SessionServiceConfig};
