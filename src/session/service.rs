//! Session lifecycle service.
//!
//! Implements session creation, lookup, update, listing and deletion on
//! top of the repository, reconciling every row it reads against the live
//! kernel registry. A session whose kernel died without the session being
//! deleted is an orphan; reconciliation culls it.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::{SessionError, SessionResult};
use super::models::{
    SessionChanges, SessionIdentity, SessionModel, SessionRecord, SessionSelector,
};
use super::repository::SessionRepository;
use crate::contents::ContentsResolver;
use crate::db::{Database, DatabaseLocation};
use crate::kernel::KernelRegistry;

/// Session service configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionServiceConfig {
    /// Where the session table lives. Ephemeral by default.
    pub database: DatabaseLocation,
}

/// Service for managing kernel-bound sessions.
pub struct SessionService {
    repo: SessionRepository,
    kernels: Arc<dyn KernelRegistry>,
    contents: Arc<dyn ContentsResolver>,
    pending: Mutex<Vec<SessionIdentity>>,
}

impl SessionService {
    /// Open the backing store, ensure its schema, and build the service.
    ///
    /// `kernels` and `contents` are externally owned singletons; the
    /// service never manages their lifecycle.
    pub async fn new(
        config: SessionServiceConfig,
        kernels: Arc<dyn KernelRegistry>,
        contents: Arc<dyn ContentsResolver>,
    ) -> SessionResult<Self> {
        let repo = SessionRepository::new(Database::open(&config.database)?);
        repo.ensure_schema().await?;
        Ok(Self {
            repo,
            kernels,
            contents,
            pending: Mutex::new(Vec::new()),
        })
    }

    fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Whether a session exists at `path` and its kernel is still alive.
    ///
    /// A row whose kernel died is culled here as a side effect and
    /// reported as absent.
    pub async fn session_exists(&self, path: &str) -> SessionResult<bool> {
        let rows = self.repo.select(&SessionSelector::by_path(path)).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(self.row_to_model(row, true).await?.is_some()),
            None => Ok(false),
        }
    }

    /// Create a session at `path` and return its model.
    ///
    /// Reuses `kernel_id` if that kernel is currently alive; otherwise
    /// starts a new kernel in the directory the contents resolver picks
    /// for `path`. The create is tracked as pending for its whole
    /// duration, including failed kernel starts.
    pub async fn create_session(
        &self,
        path: &str,
        name: Option<String>,
        session_type: Option<String>,
        kernel_name: Option<&str>,
        kernel_id: Option<&str>,
    ) -> SessionResult<SessionModel> {
        let session_id = Self::new_session_id();
        let pending = SessionIdentity::with_session_id(&session_id);
        self.note_pending(pending.clone()).await;

        let result = self
            .create_session_inner(&session_id, path, name, session_type, kernel_name, kernel_id)
            .await;

        self.clear_pending(&pending).await;
        result
    }

    async fn create_session_inner(
        &self,
        session_id: &str,
        path: &str,
        name: Option<String>,
        session_type: Option<String>,
        kernel_name: Option<&str>,
        kernel_id: Option<&str>,
    ) -> SessionResult<SessionModel> {
        let kernel_id = match kernel_id {
            Some(id) if self.kernels.is_alive(id).await => id.to_string(),
            _ => {
                self.start_kernel_for_session(session_id, path, kernel_name)
                    .await?
            }
        };

        let record = SessionRecord {
            session_id: session_id.to_string(),
            path: path.to_string(),
            name,
            session_type,
            kernel_id: kernel_id.clone(),
        };
        self.repo.insert(&record).await?;
        info!("created session {} bound to kernel {}", session_id, kernel_id);

        // Read the row back through the reconciling path so the returned
        // model carries live kernel status.
        self.get_session(&SessionSelector::by_session_id(session_id))
            .await
    }

    /// Start a new kernel for a session being created.
    async fn start_kernel_for_session(
        &self,
        session_id: &str,
        path: &str,
        kernel_name: Option<&str>,
    ) -> SessionResult<String> {
        let kernel_path = self
            .contents
            .resolve_kernel_path(path)
            .await
            .map_err(SessionError::Contents)?;
        let kernel_id = self
            .kernels
            .start_kernel(&kernel_path, kernel_name)
            .await
            .map_err(SessionError::Kernel)?;
        self.update_pending(session_id, &kernel_id).await;
        Ok(kernel_id)
    }

    /// Model for the first session matching `selector`.
    ///
    /// Fails `NotFound` if no row matches, or if the matched row's kernel
    /// turns out to be dead (the row is culled on the way out).
    pub async fn get_session(&self, selector: &SessionSelector) -> SessionResult<SessionModel> {
        let rows = self.repo.select(selector).await?;
        let Some(row) = rows.into_iter().next() else {
            return Err(SessionError::NotFound(selector.describe()));
        };
        match self.row_to_model(row, false).await? {
            Some(model) => Ok(model),
            None => Err(SessionError::NotFound(selector.describe())),
        }
    }

    /// Apply `changes` to an existing session.
    ///
    /// The existence check runs first and culls the session if its kernel
    /// is dead; an empty change set is a no-op.
    pub async fn update_session(
        &self,
        session_id: &str,
        changes: &SessionChanges,
    ) -> SessionResult<()> {
        self.get_session(&SessionSelector::by_session_id(session_id))
            .await?;
        if changes.is_empty() {
            return Ok(());
        }
        self.repo.update(session_id, changes).await
    }

    /// Models for every session whose kernel is still alive.
    ///
    /// Rows are snapshotted before any reconciliation because culling
    /// deletes rows mid-iteration; orphaned sessions are dropped from the
    /// result silently.
    pub async fn list_sessions(&self) -> SessionResult<Vec<SessionModel>> {
        let rows = self.repo.select_all().await?;
        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(model) = self.row_to_model(row, true).await? {
                sessions.push(model);
            }
        }
        Ok(sessions)
    }

    /// Shut down a session's kernel and remove its row.
    ///
    /// If kernel shutdown fails the error propagates and the row is left
    /// in place, so a still-running kernel is never silently abandoned;
    /// the next reconciliation pass culls the row once the kernel is
    /// observed dead.
    pub async fn delete_session(&self, session_id: &str) -> SessionResult<()> {
        let session = self
            .get_session(&SessionSelector::by_session_id(session_id))
            .await?;
        self.kernels
            .shutdown_kernel(&session.kernel.id)
            .await
            .map_err(SessionError::Kernel)?;
        self.repo.delete(session_id).await?;
        info!("deleted session {}", session_id);
        Ok(())
    }

    /// Reconcile one row against the live kernel registry.
    ///
    /// A dead kernel orphans the session: the row is deleted directly
    /// from storage (there is nothing left to shut down) and the result
    /// is `None` for tolerant callers or `NotFound` for strict ones. The
    /// check-then-delete sequence is not transactional; a concurrent
    /// caller can interleave between the two store calls.
    async fn row_to_model(
        &self,
        row: SessionRecord,
        tolerate_culled: bool,
    ) -> SessionResult<Option<SessionModel>> {
        if !self.kernels.is_alive(&row.kernel_id).await {
            self.repo.delete(&row.session_id).await?;
            let msg = format!(
                "kernel '{}' appears to have been culled or died unexpectedly, \
                 invalidating session '{}'; the session has been removed",
                row.kernel_id, row.session_id
            );
            if tolerate_culled {
                warn!("{}", msg);
                return Ok(None);
            }
            return Err(SessionError::NotFound(msg));
        }

        let kernel = self
            .kernels
            .kernel_status(&row.kernel_id)
            .await
            .map_err(SessionError::Kernel)?;
        Ok(Some(SessionModel::compose(row, kernel)))
    }

    async fn note_pending(&self, record: SessionIdentity) {
        self.pending.lock().await.push(record);
    }

    async fn update_pending(&self, session_id: &str, kernel_id: &str) {
        let probe = SessionIdentity::with_session_id(session_id);
        let mut pending = self.pending.lock().await;
        if let Some(entry) = pending.iter_mut().find(|entry| entry.matches(&probe)) {
            entry.kernel_id = Some(kernel_id.to_string());
        }
    }

    async fn clear_pending(&self, record: &SessionIdentity) {
        self.pending.lock().await.retain(|entry| !entry.matches(record));
    }

    /// Whether a create matching `record` is currently in flight.
    pub async fn has_pending(&self, record: &SessionIdentity) -> bool {
        self.pending
            .lock()
            .await
            .iter()
            .any(|entry| entry.matches(record))
    }

    /// Number of creates currently in flight.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Release the storage handle. Idempotent.
    pub async fn close(&self) {
        self.repo.close().await;
    }
}
