//! Fluent builder for constructing a [`Session`].

use std::sync::Arc;

use rp_replicant::{ModelLibrary, ReplicantController};

use crate::backend::Backend;
use crate::config::SessionConfig;
use crate::manager::AgentManager;
use crate::subsystem::{DataRequests, Subsystem};
use crate::{Session, SessionResult};

/// Fluent builder for [`Session<B>`].
///
/// # Required inputs
///
/// - [`SessionConfig`]: tick cap, replicants, data-request settings
/// - `Arc<ModelLibrary>`: shared model and animation metadata
/// - `B: Backend`: where batches go
///
/// # Optional inputs
///
/// | Method                      | Default                                   |
/// |-----------------------------|-------------------------------------------|
/// | `.subsystem(s)`             | none besides the built-in data requests   |
/// | `.without_data_requests()`  | a [`DataRequests`] subsystem runs first   |
///
/// # Example
///
/// ```rust,ignore
/// let mut session = SessionBuilder::new(config, library, ScriptedBackend::new())
///     .build()?;
/// session.start(&mut NoopObserver)?;
/// session.request(ReplicantId(0), Behavior::turn_by(90.0))?;
/// session.run_until_done(ReplicantId(0), &mut NoopObserver)?;
/// ```
pub struct SessionBuilder<B: Backend> {
    config:        SessionConfig,
    library:       Arc<ModelLibrary>,
    backend:       B,
    subsystems:    Vec<Box<dyn Subsystem>>,
    data_requests: bool,
}

impl<B: Backend> SessionBuilder<B> {
    pub fn new(config: SessionConfig, library: Arc<ModelLibrary>, backend: B) -> Self {
        Self {
            config,
            library,
            backend,
            subsystems:    Vec::new(),
            data_requests: true,
        }
    }

    /// Add a subsystem.  Subsystems advance in the order they are added,
    /// after the built-in data requests and before every replicant.
    pub fn subsystem(mut self, subsystem: Box<dyn Subsystem>) -> Self {
        self.subsystems.push(subsystem);
        self
    }

    /// Leave out the built-in [`DataRequests`] subsystem.
    pub fn without_data_requests(mut self) -> Self {
        self.data_requests = false;
        self
    }

    /// Validate the config, build one controller per configured replicant,
    /// and return a session ready to [`start`][Session::start].
    pub fn build(self) -> SessionResult<Session<B>> {
        self.config.validate()?;

        let mut manager = AgentManager::new();
        if self.data_requests {
            manager.add_subsystem(Box::new(DataRequests::new(
                self.config.collisions,
                self.config.rigidbodies,
            )));
        }
        for s in self.subsystems {
            manager.add_subsystem(s);
        }
        for r in &self.config.replicants {
            let controller = ReplicantController::new(r.clone(), Arc::clone(&self.library))?;
            manager.add_replicant(controller)?;
        }

        Ok(Session::new(self.config, manager, self.backend))
    }
}
