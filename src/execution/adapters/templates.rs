//! Template-driven prompt building for execution sessions.

use crate::execution::domain::{ProjectRecord, Subtask, TaskRecord};
use crate::execution::ports::{PromptBuilder, PromptError};
use minijinja::Environment;
use serde_json::{Map, Value, json};

/// Prompt template used when no custom template is configured.
///
/// Rendered with `project`, `task`, and `subtask` objects in scope.
pub const DEFAULT_EXECUTION_TEMPLATE: &str = "\
You are working on the project \"{{ project.name }}\" in the repository at {{ project.repo_path }}.

Task: {{ task.title }}
{%- if task.description %}
{{ task.description }}
{%- endif %}

Current subtask ({{ subtask.position }}): {{ subtask.title }}
{%- if subtask.description %}
{{ subtask.description }}
{%- endif %}

Complete this subtask fully, then reply with a short summary of what you did.";

/// [`PromptBuilder`] rendering a `minijinja` template.
#[derive(Debug, Clone)]
pub struct TemplatePromptBuilder {
    template: String,
}

impl TemplatePromptBuilder {
    /// Creates a builder using [`DEFAULT_EXECUTION_TEMPLATE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            template: DEFAULT_EXECUTION_TEMPLATE.to_owned(),
        }
    }

    /// Creates a builder rendering a custom template.
    #[must_use]
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Default for TemplatePromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(
        &self,
        subtask: &Subtask,
        task: &TaskRecord,
        project: &ProjectRecord,
    ) -> Result<String, PromptError> {
        let context = build_prompt_context(subtask, task, project);
        let env = Environment::new();
        env.render_str(&self.template, context)
            .map_err(|err| PromptError::Render(err.to_string()))
    }
}

/// Builds the render context shared by all prompt templates.
fn build_prompt_context(
    subtask: &Subtask,
    task: &TaskRecord,
    project: &ProjectRecord,
) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert(
        "project".to_owned(),
        json!({
            "name": project.name,
            "repo_path": project.repo_path,
        }),
    );
    context.insert(
        "task".to_owned(),
        json!({
            "title": task.title,
            "description": task.description,
        }),
    );
    context.insert(
        "subtask".to_owned(),
        json!({
            "title": subtask.title,
            "description": subtask.description,
            "position": subtask.position,
        }),
    );
    context
}
