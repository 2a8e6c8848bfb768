//! Factory producing in-memory clients for any configured service.

use super::client::InMemoryAgentClient;
use crate::session::domain::ServiceName;
use crate::session::ports::{AgentClient, BackendConfig, ClientFactory, ClientResult};
use mockable::DefaultClock;
use std::sync::Arc;

/// [`ClientFactory`] that builds an [`InMemoryAgentClient`] per service.
///
/// Configuration is accepted but otherwise ignored; the in-memory backend
/// has nothing to configure.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryClientFactory;

impl ClientFactory for InMemoryClientFactory {
    fn build(
        &self,
        service: &ServiceName,
        _config: &BackendConfig,
    ) -> ClientResult<Arc<dyn AgentClient>> {
        Ok(Arc::new(InMemoryAgentClient::new(
            service.clone(),
            Arc::new(DefaultClock),
        )))
    }
}
