//! Task and project read models used to build execution prompts.
//!
//! Both records are owned by the collaborating planning store; execution
//! only reads them, so they carry just the fields prompts and session
//! scoping need.

use super::ids::{ProjectId, TaskId};
use serde::{Deserialize, Serialize};

/// The task whose subtasks a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier.
    pub id: TaskId,
    /// Project the task belongs to.
    pub project_id: ProjectId,
    /// Short title of the task.
    pub title: String,
    /// Longer description of the task, possibly empty.
    pub description: String,
}

impl TaskRecord {
    /// Creates a task record.
    #[must_use]
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            project_id,
            title: title.into(),
            description: String::new(),
        }
    }

    /// Sets the longer task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The project a task belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project identifier.
    pub id: ProjectId,
    /// Human-readable project name.
    pub name: String,
    /// Path of the repository execution sessions work in.
    pub repo_path: String,
}

impl ProjectRecord {
    /// Creates a project record.
    #[must_use]
    pub fn new(name: impl Into<String>, repo_path: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            repo_path: repo_path.into(),
        }
    }
}
