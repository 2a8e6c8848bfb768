//! Port definition for backend client construction.

use super::client::{AgentClient, ClientResult};
use crate::session::domain::ServiceName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Static configuration for one agent backend service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Human-readable name shown in user interfaces.
    pub display_name: String,
    /// Model used when a session does not pin one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Models the backend accepts; an empty list accepts any model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    /// Backend-specific settings passed through to the client.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub settings: HashMap<String, String>,
}

impl BackendConfig {
    /// Creates a configuration with only a display name.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            default_model: None,
            models: Vec::new(),
            settings: HashMap::new(),
        }
    }

    /// Sets the model used when sessions do not pin one.
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Restricts the backend to an explicit model list.
    #[must_use]
    pub fn with_models(mut self, models: impl IntoIterator<Item = String>) -> Self {
        self.models = models.into_iter().collect();
        self
    }

    /// Adds a backend-specific setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Returns `true` when the backend accepts the given model.
    #[must_use]
    pub fn accepts_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|known| known == model)
    }
}

/// Constructs backend clients from configuration.
///
/// The registry calls this at most once per service name; the returned
/// client is cached and shared for the lifetime of the registry.
pub trait ClientFactory: Send + Sync {
    /// Builds a client for the named service.
    ///
    /// # Errors
    ///
    /// Returns [`crate::session::ports::ClientError::BackendUnavailable`]
    /// when the backend cannot be constructed from its configuration.
    fn build(
        &self,
        service: &ServiceName,
        config: &BackendConfig,
    ) -> ClientResult<Arc<dyn AgentClient>>;
}
