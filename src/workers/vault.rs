//! Vault control seam used by the lifecycle workers.

use async_trait::async_trait;
use tracing::debug;

use crate::discovery::VaultEndpoint;
use crate::error::WorkerError;

/// Operations the lifecycle workers perform against one vault server.
///
/// `Fail` errors are reported and retried on the next tick; `Fatal` errors
/// stop the worker and drain the supervisor.
#[async_trait]
pub trait VaultControl: Send + Sync + 'static {
    /// Initializes the vault server at `endpoint`.
    async fn initialize(&self, endpoint: &VaultEndpoint) -> Result<(), WorkerError>;

    /// Unseals the vault server at `endpoint`.
    async fn unseal(&self, endpoint: &VaultEndpoint) -> Result<(), WorkerError>;
}

/// Logs each request and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredVaultControl;

#[async_trait]
impl VaultControl for DeferredVaultControl {
    async fn initialize(&self, endpoint: &VaultEndpoint) -> Result<(), WorkerError> {
        debug!(%endpoint, "vault initialization not performed");
        Ok(())
    }

    async fn unseal(&self, endpoint: &VaultEndpoint) -> Result<(), WorkerError> {
        debug!(%endpoint, "vault unseal not performed");
        Ok(())
    }
}
