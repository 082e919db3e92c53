//! Session data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::error::{SessionError, SessionResult};
use crate::kernel::KernelStatus;

/// The session table's fixed column set.
///
/// Filters and updates are expressed in terms of this enum, so a column
/// outside the set cannot reach the storage layer; raw strings are
/// validated against it only at the query boundary
/// ([`SessionSelector::from_pairs`], [`SessionChanges::from_pairs`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionColumn {
    SessionId,
    Path,
    Name,
    Type,
    KernelId,
}

impl SessionColumn {
    /// Column name as it appears in the session table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionColumn::SessionId => "session_id",
            SessionColumn::Path => "path",
            SessionColumn::Name => "name",
            SessionColumn::Type => "type",
            SessionColumn::KernelId => "kernel_id",
        }
    }
}

impl std::fmt::Display for SessionColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionColumn {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session_id" => Ok(SessionColumn::SessionId),
            "path" => Ok(SessionColumn::Path),
            "name" => Ok(SessionColumn::Name),
            "type" => Ok(SessionColumn::Type),
            "kernel_id" => Ok(SessionColumn::KernelId),
            _ => Err(SessionError::InvalidColumn(s.to_string())),
        }
    }
}

/// A persisted session row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    /// Unique session ID, assigned at creation and never reused.
    pub session_id: String,
    /// Logical resource path the session is bound to.
    pub path: String,
    /// Display name.
    pub name: Option<String>,
    /// Free-form classification, e.g. "notebook" or "console".
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub session_type: Option<String>,
    /// ID of the kernel bound to this session. The kernel was alive when
    /// the row was written; liveness is re-checked on every read.
    pub kernel_id: String,
}

/// Row filter over the session table. Non-empty by construction.
#[derive(Debug, Clone)]
pub struct SessionSelector {
    terms: Vec<(SessionColumn, String)>,
}

impl SessionSelector {
    /// Selector with a single term.
    pub fn new(column: SessionColumn, value: impl Into<String>) -> Self {
        Self {
            terms: vec![(column, value.into())],
        }
    }

    /// Add a further term; all terms must match.
    pub fn and(mut self, column: SessionColumn, value: impl Into<String>) -> Self {
        self.terms.push((column, value.into()));
        self
    }

    /// Selector matching a session by ID.
    pub fn by_session_id(session_id: impl Into<String>) -> Self {
        Self::new(SessionColumn::SessionId, session_id)
    }

    /// Selector matching sessions at a logical path.
    pub fn by_path(path: impl Into<String>) -> Self {
        Self::new(SessionColumn::Path, path)
    }

    /// Build a selector from raw key/value pairs, validating every key
    /// against the column set.
    pub fn from_pairs<I, K, V>(pairs: I) -> SessionResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut terms = Vec::new();
        for (key, value) in pairs {
            terms.push((key.as_ref().parse::<SessionColumn>()?, value.into()));
        }
        if terms.is_empty() {
            return Err(SessionError::EmptySelector);
        }
        Ok(Self { terms })
    }

    /// The selector's terms, in insertion order.
    pub fn terms(&self) -> &[(SessionColumn, String)] {
        &self.terms
    }

    /// Human-readable form for "not found" messages.
    pub fn describe(&self) -> String {
        self.terms
            .iter()
            .map(|(column, value)| format!("{}='{}'", column, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Column updates for an existing session row. An empty change set is a
/// valid no-op.
#[derive(Debug, Clone, Default)]
pub struct SessionChanges {
    pub session_id: Option<String>,
    pub path: Option<String>,
    pub name: Option<String>,
    pub session_type: Option<String>,
    pub kernel_id: Option<String>,
}

impl SessionChanges {
    /// Whether no column is being changed.
    pub fn is_empty(&self) -> bool {
        self.session_id.is_none()
            && self.path.is_none()
            && self.name.is_none()
            && self.session_type.is_none()
            && self.kernel_id.is_none()
    }

    /// Build a change set from raw key/value pairs, validating every key
    /// against the column set.
    pub fn from_pairs<I, K, V>(pairs: I) -> SessionResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut changes = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref().parse::<SessionColumn>()? {
                SessionColumn::SessionId => &mut changes.session_id,
                SessionColumn::Path => &mut changes.path,
                SessionColumn::Name => &mut changes.name,
                SessionColumn::Type => &mut changes.session_type,
                SessionColumn::KernelId => &mut changes.kernel_id,
            };
            *slot = Some(value.into());
        }
        Ok(changes)
    }

    /// The changed columns and their new values, in column-set order.
    pub fn terms(&self) -> Vec<(SessionColumn, &str)> {
        let mut terms = Vec::new();
        if let Some(value) = &self.session_id {
            terms.push((SessionColumn::SessionId, value.as_str()));
        }
        if let Some(value) = &self.path {
            terms.push((SessionColumn::Path, value.as_str()));
        }
        if let Some(value) = &self.name {
            terms.push((SessionColumn::Name, value.as_str()));
        }
        if let Some(value) = &self.session_type {
            terms.push((SessionColumn::Type, value.as_str()));
        }
        if let Some(value) = &self.kernel_id {
            terms.push((SessionColumn::KernelId, value.as_str()));
        }
        terms
    }
}

/// Partial identification of a session: whichever of the session ID and
/// kernel ID the holder happens to know.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub session_id: Option<String>,
    pub kernel_id: Option<String>,
}

fn both_present_and_equal(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

impl SessionIdentity {
    /// Identity known only by session ID.
    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            kernel_id: None,
        }
    }

    /// Identity known only by kernel ID.
    pub fn with_kernel_id(kernel_id: impl Into<String>) -> Self {
        Self {
            session_id: None,
            kernel_id: Some(kernel_id.into()),
        }
    }

    /// Whether two identities refer to the same session: their session IDs
    /// match and are both present, or their kernel IDs match and are both
    /// present.
    pub fn matches(&self, other: &SessionIdentity) -> bool {
        both_present_and_equal(self.session_id.as_deref(), other.session_id.as_deref())
            || both_present_and_equal(self.kernel_id.as_deref(), other.kernel_id.as_deref())
    }
}

/// Deprecated duplicate of the path/name pair, kept on notebook sessions
/// for clients of the old API shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookHandle {
    pub path: String,
    pub name: Option<String>,
}

/// API-facing session model: the persisted fields plus the live kernel
/// status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionModel {
    pub id: String,
    pub path: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub session_type: Option<String>,
    pub kernel: KernelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebook: Option<NotebookHandle>,
}

impl SessionModel {
    /// Compose the model for a row and its live kernel.
    pub fn compose(record: SessionRecord, kernel: KernelStatus) -> Self {
        let notebook = (record.session_type.as_deref() == Some("notebook")).then(|| {
            NotebookHandle {
                path: record.path.clone(),
                name: record.name.clone(),
            }
        });
        Self {
            id: record.session_id,
            path: record.path,
            name: record.name,
            session_type: record.session_type,
            kernel,
            notebook,
        }
    }
}
