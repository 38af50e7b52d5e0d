use std::sync::Arc;

use crate::config::{Config, DebugFlags};
use crate::discovery::{OrchestratorApi, Resolver};
use crate::events::{Bus, DEFAULT_CAPACITY};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workers::{BoxWorker, DeferredVaultControl, VaultControl};

use super::{alive::AliveTracker, supervisor::Supervisor};

/// Builder for a [`Supervisor`].
pub struct SupervisorBuilder {
    config: Config,
    api: Arc<dyn OrchestratorApi>,
    control: Arc<dyn VaultControl>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    extra_workers: Vec<BoxWorker>,
    flags: DebugFlags,
    bus_capacity: usize,
}

impl SupervisorBuilder {
    /// Creates a builder resolving discovery through `api`.
    pub fn new(config: Config, api: Arc<dyn OrchestratorApi>) -> Self {
        Self {
            config,
            api,
            control: Arc::new(DeferredVaultControl),
            subscribers: Vec::new(),
            extra_workers: Vec::new(),
            flags: DebugFlags::default(),
            bus_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Sets the client used by the lifecycle workers.
    ///
    /// Defaults to [`DeferredVaultControl`].
    pub fn with_vault_control(mut self, control: Arc<dyn VaultControl>) -> Self {
        self.control = control;
        self
    }

    /// Sets event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a worker started alongside the health endpoint and lifecycle workers.
    ///
    /// Such workers get no discovery handoff.
    pub fn with_worker(mut self, worker: BoxWorker) -> Self {
        self.extra_workers.push(worker);
        self
    }

    /// Sets the debug toggles.
    pub fn with_flags(mut self, flags: DebugFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the event bus capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builds the supervisor.
    ///
    /// Spawns the subscriber workers, so it must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let queries = self.config.cluster_queries();
        let resolver = Resolver::new(self.api, self.flags);

        Arc::new(Supervisor::new_internal(
            self.config,
            queries,
            resolver,
            self.control,
            self.extra_workers,
            bus,
            subs,
            Arc::new(AliveTracker::new()),
        ))
    }
}
