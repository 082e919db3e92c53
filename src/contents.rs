//! Contents resolver trait.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

/// Maps a session's logical resource path to the filesystem directory its
/// kernel should start in.
///
/// Owned by the contents layer of the embedding server; the session
/// registry only consults it when starting a kernel for a new session.
#[async_trait]
pub trait ContentsResolver: Send + Sync {
    /// Resolve the kernel working directory for `logical_path`.
    async fn resolve_kernel_path(&self, logical_path: &str) -> Result<PathBuf>;
}
