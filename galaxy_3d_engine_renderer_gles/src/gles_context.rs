/// GlesContext - Shared render backend state for all GLES buffers
///
/// Contains everything a buffer needs besides its own name:
/// - Driver entry points
/// - Capabilities detected once at creation
/// - The binding cache (may be torn down before the buffers)
/// - Backend configuration
///
/// Buffers receive the context explicitly (`Rc<dyn RenderBackendContext>`);
/// there is no global lookup. All of it is bound to the GL thread.

use std::cell::RefCell;
use std::rc::Rc;

use galaxy_3d_engine_core::galaxy3d::Result;
use galaxy_3d_engine_core::{engine_bail, engine_debug, engine_info};

use crate::gles_api::{BindTarget, BufferName, GlesApi};
use crate::gles_capabilities::{GlesCapabilities, GlesVersion};
use crate::gles_state_cache::{BindingCache, StateCacheManager};

/// Destination storage policy of a discarding buffer copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyRespecify {
    /// Re-specify the full buffer size (size stays fixed)
    #[default]
    FullSize,
    /// Re-specify exactly the copied length (destination offset must be 0)
    CopyLength,
}

/// GLES backend configuration
#[derive(Debug, Clone)]
pub struct GlesConfig {
    /// Label new buffers "Buffer #<name>" when the driver supports object labels
    pub debug_labels: bool,
    /// Drain and log glGetError after each driver call sequence
    pub check_errors: bool,
    /// Storage policy for `copy_data(.., discard_whole_buffer = true)`
    pub copy_respecify: CopyRespecify,
    /// Capabilities masked out after detection (driver workarounds, tests)
    pub disabled_capabilities: GlesCapabilities,
}

impl Default for GlesConfig {
    fn default() -> Self {
        Self {
            debug_labels: cfg!(debug_assertions),
            check_errors: cfg!(debug_assertions),
            copy_respecify: CopyRespecify::default(),
            disabled_capabilities: GlesCapabilities::empty(),
        }
    }
}

/// What a GPU buffer resource needs from its render backend
pub trait RenderBackendContext {
    /// Driver entry points
    fn api(&self) -> &dyn GlesApi;

    /// True if every bit of `capability` is available
    fn has_capability(&self, capability: GlesCapabilities) -> bool;

    /// Active binding cache, `None` once it has been torn down
    fn binding_cache(&self) -> Option<Rc<RefCell<dyn BindingCache>>>;

    /// Queue the deletion of `name` until the binding cache can evict it
    ///
    /// Used when the cache is borrowed at the time the buffer goes away.
    fn defer_buffer_delete(&self, target: BindTarget, name: BufferName);

    /// Backend configuration
    fn config(&self) -> &GlesConfig;
}

/// OpenGL ES render backend context
pub struct GlesContext {
    api: Rc<dyn GlesApi>,
    version: GlesVersion,
    capabilities: GlesCapabilities,
    state_cache: RefCell<Option<Rc<RefCell<StateCacheManager>>>>,
    /// Buffers released while the cache was borrowed
    deferred_deletes: RefCell<Vec<(BindTarget, BufferName)>>,
    config: GlesConfig,
}

impl GlesContext {
    /// Create a context, detecting capabilities from the driver
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the driver is older than OpenGL ES 2.0.
    pub fn new(api: Rc<dyn GlesApi>, config: GlesConfig) -> Result<Rc<Self>> {
        let version = api.version();
        if version < GlesVersion::ES_2_0 {
            engine_bail!("galaxy3d::gles::Context", InitializationFailed,
                "{} is not supported (OpenGL ES 2.0 required)", version);
        }

        let detected = GlesCapabilities::detect(version, api.extensions());
        let capabilities = detected - config.disabled_capabilities;

        engine_info!("galaxy3d::gles::Context", "{} context, buffer capabilities {:?}",
            version, capabilities);

        Ok(Self::with_capabilities(api, version, capabilities, config))
    }

    /// Create a context with an explicit capability set (no detection)
    pub fn with_capabilities(
        api: Rc<dyn GlesApi>,
        version: GlesVersion,
        capabilities: GlesCapabilities,
        config: GlesConfig,
    ) -> Rc<Self> {
        let state_cache = Rc::new(RefCell::new(StateCacheManager::new(api.clone())));
        Rc::new(Self {
            api,
            version,
            capabilities,
            state_cache: RefCell::new(Some(state_cache)),
            deferred_deletes: RefCell::new(Vec::new()),
            config,
        })
    }

    pub fn version(&self) -> GlesVersion {
        self.version
    }

    pub fn capabilities(&self) -> GlesCapabilities {
        self.capabilities
    }

    /// Concrete state cache, for inspection
    pub fn state_cache(&self) -> Option<Rc<RefCell<StateCacheManager>>> {
        self.state_cache.borrow().clone()
    }

    /// Tear down the binding cache (render system shutdown)
    ///
    /// Buffers destroyed afterwards delete their driver object directly.
    pub fn shutdown_state_cache(&self) {
        self.flush_deferred_deletes();
        self.state_cache.borrow_mut().take();
        self.flush_deferred_deletes();
    }

    /// Number of buffer deletions still waiting for the binding cache
    pub fn deferred_delete_count(&self) -> usize {
        self.deferred_deletes.borrow().len()
    }

    /// Delete queued buffers through the cache, or directly once it is gone
    ///
    /// Does nothing while the cache is still borrowed.
    fn flush_deferred_deletes(&self) {
        if self.deferred_deletes.borrow().is_empty() {
            return;
        }
        let state_cache = self.state_cache.borrow().clone();
        match state_cache {
            Some(cache) => {
                let Ok(mut cache) = cache.try_borrow_mut() else {
                    return;
                };
                for (target, name) in self.deferred_deletes.borrow_mut().drain(..) {
                    engine_debug!("galaxy3d::gles::Context", "Deleting deferred buffer #{}", name.0);
                    cache.delete_buffer(target, name);
                }
            }
            None => {
                for (_, name) in self.deferred_deletes.borrow_mut().drain(..) {
                    engine_debug!("galaxy3d::gles::Context", "Deleting deferred buffer #{} directly", name.0);
                    self.api.delete_buffer(name);
                }
            }
        }
    }
}

impl RenderBackendContext for GlesContext {
    fn api(&self) -> &dyn GlesApi {
        self.api.as_ref()
    }

    fn has_capability(&self, capability: GlesCapabilities) -> bool {
        self.capabilities.contains(capability)
    }

    fn binding_cache(&self) -> Option<Rc<RefCell<dyn BindingCache>>> {
        self.flush_deferred_deletes();
        self.state_cache
            .borrow()
            .clone()
            .map(|cache| cache as Rc<RefCell<dyn BindingCache>>)
    }

    fn defer_buffer_delete(&self, target: BindTarget, name: BufferName) {
        self.deferred_deletes.borrow_mut().push((target, name));
    }

    fn config(&self) -> &GlesConfig {
        &self.config
    }
}

impl Drop for GlesContext {
    fn drop(&mut self) {
        self.shutdown_state_cache();
    }
}

#[cfg(test)]
#[path = "gles_context_tests.rs"]
mod tests;
