//! Shared fixtures for session registry tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use kernelhub::contents::ContentsResolver;
use kernelhub::kernel::{ExecutionState, KernelRegistry, KernelStatus};
use kernelhub::session::{SessionService, SessionServiceConfig};

/// Kernel registry test double backed by an in-memory map.
///
/// Kernels can be killed out-of-band with [`MockKernelRegistry::kill`] to
/// simulate a crash the session registry has not observed yet.
#[derive(Default)]
pub struct MockKernelRegistry {
    kernels: Mutex<HashMap<String, KernelStatus>>,
    shutdowns: Mutex<Vec<String>>,
    start_delay: Mutex<Option<Duration>>,
    fail_start: AtomicBool,
    fail_shutdown: AtomicBool,
}

impl MockKernelRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remove a kernel without going through the session registry.
    pub fn kill(&self, kernel_id: &str) {
        self.kernels.lock().unwrap().remove(kernel_id);
    }

    pub fn alive_count(&self) -> usize {
        self.kernels.lock().unwrap().len()
    }

    /// Kernel IDs that were shut down through the registry, in order.
    pub fn shutdown_log(&self) -> Vec<String> {
        self.shutdowns.lock().unwrap().clone()
    }

    /// Delay every kernel start, so tests can observe in-flight creates.
    pub fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_shutdown(&self, fail: bool) {
        self.fail_shutdown.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KernelRegistry for MockKernelRegistry {
    async fn start_kernel(&self, _path: &Path, kernel_name: Option<&str>) -> Result<String> {
        let delay = *self.start_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(anyhow!("no such kernel spec: {:?}", kernel_name));
        }

        let id = Uuid::new_v4().to_string();
        let status = KernelStatus {
            id: id.clone(),
            name: kernel_name.unwrap_or("python3").to_string(),
            last_activity: Some(Utc::now()),
            execution_state: ExecutionState::Idle,
            connections: 0,
        };
        self.kernels.lock().unwrap().insert(id.clone(), status);
        Ok(id)
    }

    async fn shutdown_kernel(&self, kernel_id: &str) -> Result<()> {
        if self.fail_shutdown.load(Ordering::SeqCst) {
            return Err(anyhow!("kernel '{}' refused to shut down", kernel_id));
        }
        if self.kernels.lock().unwrap().remove(kernel_id).is_none() {
            return Err(anyhow!("unknown kernel: {}", kernel_id));
        }
        self.shutdowns.lock().unwrap().push(kernel_id.to_string());
        Ok(())
    }

    async fn is_alive(&self, kernel_id: &str) -> bool {
        self.kernels.lock().unwrap().contains_key(kernel_id)
    }

    async fn kernel_status(&self, kernel_id: &str) -> Result<KernelStatus> {
        self.kernels
            .lock()
            .unwrap()
            .get(kernel_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown kernel: {}", kernel_id))
    }
}

/// Contents resolver that roots every kernel under a fixed directory.
pub struct StubContentsResolver {
    root: PathBuf,
}

impl StubContentsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self { root: root.into() })
    }
}

#[async_trait]
impl ContentsResolver for StubContentsResolver {
    async fn resolve_kernel_path(&self, logical_path: &str) -> Result<PathBuf> {
        let parent = Path::new(logical_path.trim_start_matches('/'))
            .parent()
            .unwrap_or_else(|| Path::new(""));
        Ok(self.root.join(parent))
    }
}

/// Service over an ephemeral store, with its mock kernel registry.
pub async fn test_service() -> (Arc<SessionService>, Arc<MockKernelRegistry>) {
    let kernels = MockKernelRegistry::new();
    let service = service_with(SessionServiceConfig::default(), kernels.clone()).await;
    (service, kernels)
}

/// Service over an arbitrary store location and kernel registry.
pub async fn service_with(
    config: SessionServiceConfig,
    kernels: Arc<MockKernelRegistry>,
) -> Arc<SessionService> {
    let contents = StubContentsResolver::new("/tmp/kernelhub-tests");
    let service = SessionService::new(config, kernels, contents)
        .await
        .expect("session service");
    Arc::new(service)
}
