//! Lazy, cached resolution of backend clients by service name.

use crate::session::domain::ServiceName;
use crate::session::ports::{AgentClient, BackendConfig, ClientError, ClientFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors surfaced by the client registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// No backend is configured under the requested name.
    #[error("unknown backend service: {0}")]
    UnknownService(ServiceName),

    /// The factory failed to build a client for a configured backend.
    #[error("failed to construct client for '{service}': {source}")]
    Construction {
        /// Service whose client could not be built.
        service: ServiceName,
        /// Underlying construction failure.
        #[source]
        source: ClientError,
    },

    /// The client cache lock was poisoned by a panicking thread.
    #[error("registry cache unavailable: {0}")]
    CachePoisoned(String),
}

/// Registry resolving service names to shared backend clients.
///
/// Clients are expensive to construct, so the registry builds each one
/// lazily on first request and caches it; every later request for the same
/// name returns the same shared instance. A construction failure is not
/// cached and the next request retries. Configuration is fixed at
/// construction time; clients are injected wherever sessions are needed
/// rather than reached through any global state.
pub struct ClientRegistry {
    configs: HashMap<ServiceName, BackendConfig>,
    factory: Arc<dyn ClientFactory>,
    clients: RwLock<HashMap<ServiceName, Arc<dyn AgentClient>>>,
}

impl ClientRegistry {
    /// Creates a registry over the given backend configurations.
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        configs: impl IntoIterator<Item = (ServiceName, BackendConfig)>,
    ) -> Self {
        Self {
            configs: configs.into_iter().collect(),
            factory,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the configuration for a service, if it is known.
    #[must_use]
    pub fn config(&self, service: &ServiceName) -> Option<&BackendConfig> {
        self.configs.get(service)
    }

    /// Names of all configured services, sorted for stable presentation.
    #[must_use]
    pub fn services(&self) -> Vec<ServiceName> {
        let mut names: Vec<ServiceName> = self.configs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves the shared client for a service, constructing it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownService`] for names with no
    /// configuration and [`RegistryError::Construction`] when the factory
    /// fails; construction failures are not cached.
    pub fn get_client(&self, service: &ServiceName) -> Result<Arc<dyn AgentClient>, RegistryError> {
        let config = self
            .configs
            .get(service)
            .ok_or_else(|| RegistryError::UnknownService(service.clone()))?;
        {
            let clients = self
                .clients
                .read()
                .map_err(|err| RegistryError::CachePoisoned(err.to_string()))?;
            if let Some(client) = clients.get(service) {
                return Ok(Arc::clone(client));
            }
        }
        let mut clients = self
            .clients
            .write()
            .map_err(|err| RegistryError::CachePoisoned(err.to_string()))?;
        if let Some(client) = clients.get(service) {
            return Ok(Arc::clone(client));
        }
        tracing::debug!(service = %service, "constructing backend client");
        let client = self
            .factory
            .build(service, config)
            .map_err(|source| RegistryError::Construction {
                service: service.clone(),
                source,
            })?;
        clients.insert(service.clone(), Arc::clone(&client));
        Ok(client)
    }
}
