/// StateCacheManager - Deduplicates buffer binds per GL context
///
/// Tracks which buffer name is bound to each binding point so repeated binds
/// of the same buffer skip the driver call. Every buffer deletion must go
/// through the cache so no slot keeps a freed name.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use galaxy_3d_engine_core::engine_trace;

use crate::gles_api::{BindTarget, BufferName, GlesApi};

/// Bind/delete contract consumed by GPU buffer resources
pub trait BindingCache {
    /// Bind `name` to `target`, skipping the driver call if already bound
    fn bind_buffer(&mut self, target: BindTarget, name: BufferName);

    /// Evict `name` from every slot and delete the driver object
    ///
    /// `target` is the slot family the buffer was created for; any other slot
    /// still holding the name (copy points, ...) is evicted as well.
    fn delete_buffer(&mut self, target: BindTarget, name: BufferName);
}

/// Per-context binding cache
pub struct StateCacheManager {
    api: Rc<dyn GlesApi>,
    bound: FxHashMap<BindTarget, BufferName>,
    skipped_binds: u64,
}

impl StateCacheManager {
    pub fn new(api: Rc<dyn GlesApi>) -> Self {
        Self {
            api,
            bound: FxHashMap::default(),
            skipped_binds: 0,
        }
    }

    /// Name currently recorded for `target`
    pub fn bound_buffer(&self, target: BindTarget) -> Option<BufferName> {
        self.bound.get(&target).copied().filter(BufferName::is_valid)
    }

    /// True if any slot still records `name`
    pub fn contains(&self, name: BufferName) -> bool {
        self.bound.values().any(|bound| *bound == name)
    }

    /// Number of binds answered from the cache
    pub fn skipped_binds(&self) -> u64 {
        self.skipped_binds
    }

    /// Forget every recorded binding (after external GL calls touched them)
    pub fn invalidate(&mut self) {
        self.bound.clear();
    }
}

impl BindingCache for StateCacheManager {
    fn bind_buffer(&mut self, target: BindTarget, name: BufferName) {
        if self.bound.get(&target) == Some(&name) {
            self.skipped_binds += 1;
            return;
        }
        self.api.bind_buffer(target, name);
        self.bound.insert(target, name);
    }

    fn delete_buffer(&mut self, target: BindTarget, name: BufferName) {
        if !name.is_valid() {
            return;
        }
        engine_trace!("galaxy3d::gles::StateCache", "Evict buffer #{} (target {:?})", name.0, target);
        // GL unbinds a deleted buffer from every point of the current context
        self.bound.retain(|_, bound| *bound != name);
        self.api.delete_buffer(name);
    }
}

#[cfg(test)]
#[path = "gles_state_cache_tests.rs"]
mod tests;
