//! Kernel registry trait and status models.
//!
//! The session registry never manages kernel processes itself; it consumes
//! a [`KernelRegistry`] owned by the embedding server to start, stop and
//! observe kernels.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution state reported by a live kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Kernel process is starting up.
    Starting,
    /// Kernel is waiting for work.
    Idle,
    /// Kernel is executing.
    Busy,
    /// Kernel is restarting.
    Restarting,
    /// Kernel process is gone.
    Dead,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionState::Starting => write!(f, "starting"),
            ExecutionState::Idle => write!(f, "idle"),
            ExecutionState::Busy => write!(f, "busy"),
            ExecutionState::Restarting => write!(f, "restarting"),
            ExecutionState::Dead => write!(f, "dead"),
        }
    }
}

impl std::str::FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starting" => Ok(ExecutionState::Starting),
            "idle" => Ok(ExecutionState::Idle),
            "busy" => Ok(ExecutionState::Busy),
            "restarting" => Ok(ExecutionState::Restarting),
            "dead" => Ok(ExecutionState::Dead),
            _ => Err(format!("unknown execution state: {}", s)),
        }
    }
}

/// Serializable snapshot of a live kernel, embedded in session models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelStatus {
    /// Kernel ID.
    pub id: String,
    /// Kernel spec name (e.g., "python3").
    pub name: String,
    /// Last time the kernel did any work.
    pub last_activity: Option<DateTime<Utc>>,
    /// Current execution state.
    pub execution_state: ExecutionState,
    /// Number of client connections to the kernel's channels.
    pub connections: u32,
}

/// Registry of live kernel processes.
///
/// Implementations own process lifecycle; the session registry only asks
/// them to start, stop and report on kernels. All methods are async even
/// where an implementation answers from memory, so callers never need to
/// special-case.
#[async_trait]
pub trait KernelRegistry: Send + Sync {
    /// Start a new kernel with `path` as its working directory.
    ///
    /// Fails if the named kernel spec is unknown or the process cannot be
    /// spawned.
    async fn start_kernel(&self, path: &Path, kernel_name: Option<&str>) -> Result<String>;

    /// Shut a kernel down. Fails if the kernel ID is unknown.
    async fn shutdown_kernel(&self, kernel_id: &str) -> Result<()>;

    /// Whether the kernel is currently alive.
    async fn is_alive(&self, kernel_id: &str) -> bool;

    /// Status snapshot for a live kernel.
    async fn kernel_status(&self, kernel_id: &str) -> Result<KernelStatus>;
}
