//! Process-wide export pipeline slot
//!
//! At most one [`ExportPipeline`] is live per registry. The first
//! `get_or_create` call constructs it; every later call, from any thread,
//! receives the same handle. A failed construction leaves the slot empty so
//! the next call tries again.

use super::config::ExportConfig;
use super::pipeline::ExportPipeline;
use super::transport::OtlpHttpTransport;
use crate::core::{Diagnostics, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to the live pipeline
pub type ExportPipelineHandle = Arc<ExportPipeline>;

static GLOBAL: PipelineRegistry = PipelineRegistry::new();

pub struct PipelineRegistry {
    slot: Mutex<Option<ExportPipelineHandle>>,
    constructed: AtomicUsize,
}

impl PipelineRegistry {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            constructed: AtomicUsize::new(0),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static PipelineRegistry {
        &GLOBAL
    }

    /// Return the live pipeline, building an OTLP/HTTP one on first use.
    ///
    /// The configuration only matters for the call that constructs the
    /// pipeline; later calls get the existing one unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::EmitterError::PipelineConstruction`] when the
    /// transport or worker cannot be built.
    pub fn get_or_create(&self, config: &ExportConfig) -> Result<ExportPipelineHandle> {
        self.get_or_create_with(config, |config| {
            let transport = OtlpHttpTransport::new(config)?;
            ExportPipeline::start(config, Box::new(transport), Diagnostics::stderr())
        })
    }

    /// Like [`get_or_create`](Self::get_or_create) with a custom constructor.
    ///
    /// `factory` runs at most once per live pipeline, under the registry lock.
    pub fn get_or_create_with<F>(&self, config: &ExportConfig, factory: F) -> Result<ExportPipelineHandle>
    where
        F: FnOnce(&ExportConfig) -> Result<ExportPipeline>,
    {
        let mut slot = self.slot.lock();
        if let Some(ref existing) = *slot {
            return Ok(Arc::clone(existing));
        }

        let pipeline = Arc::new(factory(config)?);
        self.constructed.fetch_add(1, Ordering::SeqCst);
        *slot = Some(Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// The live pipeline, if any
    pub fn current(&self) -> Option<ExportPipelineHandle> {
        self.slot.lock().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Shut down and remove the live pipeline.
    ///
    /// The next `get_or_create` builds a fresh one. Returns `false` when the
    /// old worker did not finish within `timeout`.
    pub fn teardown(&self, timeout: Duration) -> bool {
        let taken = self.slot.lock().take();
        match taken {
            Some(pipeline) => pipeline.shutdown(timeout),
            None => true,
        }
    }

    /// Number of pipelines this registry has constructed
    pub fn constructed_count(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// A guard that tears the live pipeline down when dropped.
    ///
    /// A `static` registry is never dropped itself, so hold one of these in
    /// `main` to export what is still queued at process exit.
    pub fn shutdown_guard(&'static self, timeout: Duration) -> ShutdownGuard {
        ShutdownGuard {
            registry: self,
            timeout,
            armed: true,
        }
    }
}

/// Tears down a registry's pipeline on drop.
///
/// Created by [`PipelineRegistry::shutdown_guard`] or
/// [`Emitter::shutdown_guard`](crate::Emitter::shutdown_guard).
#[must_use = "the pipeline is torn down as soon as the guard is dropped"]
pub struct ShutdownGuard {
    registry: &'static PipelineRegistry,
    timeout: Duration,
    armed: bool,
}

impl ShutdownGuard {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tear down now instead of at drop.
    ///
    /// Returns `false` when queued records were dropped at the timeout.
    pub fn shutdown(mut self) -> bool {
        self.armed = false;
        self.registry.teardown(self.timeout)
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if self.armed {
            self.registry.teardown(self.timeout);
        }
    }
}

impl std::fmt::Debug for ShutdownGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownGuard")
            .field("timeout", &self.timeout)
            .field("armed", &self.armed)
            .finish()
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
