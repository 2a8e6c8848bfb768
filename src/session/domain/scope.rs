//! Orchestration scope encoded into backend session metadata.
//!
//! Backends persist session metadata as a flat string map and know nothing
//! about projects or workspaces. The orchestrator therefore encodes its
//! scope fields under namespaced, versioned keys inside that map and decodes
//! them back when it lists or inspects sessions. Unknown keys are always
//! preserved untouched, so foreign metadata survives a round trip.

use super::metadata::SessionMetadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key carrying the owning project identifier.
pub const SCOPE_KEY_PROJECT_ID: &str = "gropius.v1.project_id";
/// Metadata key carrying the repository path the session works in.
pub const SCOPE_KEY_REPO_PATH: &str = "gropius.v1.repo_path";
/// Metadata key carrying the workspace identifier.
pub const SCOPE_KEY_WORKSPACE_ID: &str = "gropius.v1.workspace_id";
/// Metadata key carrying the free-form purpose label.
pub const SCOPE_KEY_LABEL: &str = "gropius.v1.label";

/// Orchestration ownership fields attached to an agent session.
///
/// All fields are optional; a scope with no fields set encodes to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScope {
    /// Project the session belongs to.
    pub project_id: Option<Uuid>,
    /// Repository path the session operates on.
    pub repo_path: Option<String>,
    /// Workspace the session belongs to.
    pub workspace_id: Option<String>,
    /// Free-form label describing the session's purpose.
    pub label: Option<String>,
}

impl SessionScope {
    /// Creates a scope with no fields set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            project_id: None,
            repo_path: None,
            workspace_id: None,
            label: None,
        }
    }

    /// Sets the owning project identifier.
    #[must_use]
    pub const fn with_project_id(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the repository path.
    #[must_use]
    pub fn with_repo_path(mut self, repo_path: impl Into<String>) -> Self {
        self.repo_path = Some(repo_path.into());
        self
    }

    /// Sets the workspace identifier.
    #[must_use]
    pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    /// Sets the purpose label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.repo_path.is_none()
            && self.workspace_id.is_none()
            && self.label.is_none()
    }
}

/// Encodes scope fields into session metadata under namespaced keys.
///
/// Caller-supplied metadata is copied into the result first; scope fields
/// then overwrite any colliding namespaced keys, because the orchestrator is
/// authoritative for its own namespace. Returns `None` only when both inputs
/// are absent.
///
/// # Examples
///
/// ```
/// use gropius::session::domain::{decode_scope, encode_scope, SessionScope};
/// use uuid::Uuid;
///
/// let scope = SessionScope::new()
///     .with_project_id(Uuid::new_v4())
///     .with_label("execute:release");
/// let metadata = encode_scope(Some(&scope), None).expect("scope has fields set");
/// assert_eq!(decode_scope(Some(&metadata)), Some(scope));
/// ```
#[must_use]
pub fn encode_scope(
    scope: Option<&SessionScope>,
    extra: Option<&SessionMetadata>,
) -> Option<SessionMetadata> {
    if scope.is_none() && extra.is_none() {
        return None;
    }
    let mut metadata = extra.cloned().unwrap_or_default();
    if let Some(fields) = scope {
        if let Some(project_id) = fields.project_id {
            metadata.insert(SCOPE_KEY_PROJECT_ID, project_id.to_string());
        }
        if let Some(repo_path) = &fields.repo_path {
            metadata.insert(SCOPE_KEY_REPO_PATH, repo_path.clone());
        }
        if let Some(workspace_id) = &fields.workspace_id {
            metadata.insert(SCOPE_KEY_WORKSPACE_ID, workspace_id.clone());
        }
        if let Some(label) = &fields.label {
            metadata.insert(SCOPE_KEY_LABEL, label.clone());
        }
    }
    Some(metadata)
}

/// Decodes scope fields back out of session metadata.
///
/// Unknown keys are ignored. A project identifier that fails to parse as a
/// UUID is skipped rather than failing the whole decode, since foreign
/// writers may collide with the namespace. Returns `None` when the metadata
/// is absent or carries no recognised scope field.
#[must_use]
pub fn decode_scope(metadata: Option<&SessionMetadata>) -> Option<SessionScope> {
    let entries = metadata?;
    let scope = SessionScope {
        project_id: entries
            .get(SCOPE_KEY_PROJECT_ID)
            .and_then(|raw| Uuid::parse_str(raw).ok()),
        repo_path: entries.get(SCOPE_KEY_REPO_PATH).map(str::to_owned),
        workspace_id: entries.get(SCOPE_KEY_WORKSPACE_ID).map(str::to_owned),
        label: entries.get(SCOPE_KEY_LABEL).map(str::to_owned),
    };
    if scope.is_empty() { None } else { Some(scope) }
}
