/// Buffer - OpenGL ES hardware buffer (vertex, index or uniform data)
///
/// Owns exactly one GL buffer object for its whole lifetime:
/// - storage is reserved eagerly at creation with a usage-derived hint
/// - CPU access goes through lock/unlock (one outstanding lock at most),
///   or through direct read/write/copy calls while unlocked
/// - every operation rebinds through the binding cache first, so it does not
///   depend on what other buffers bound in between
/// - the GL object is deleted on drop, evicting the binding cache entry first

use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use galaxy_3d_engine_core::galaxy3d::buffer::{BufferDesc, BufferTarget, BufferUsage, LockOptions};
use galaxy_3d_engine_core::galaxy3d::Result;
use galaxy_3d_engine_core::{engine_bail, engine_debug, engine_err, engine_error, engine_trace, engine_warn};

use crate::gles_api::{BindTarget, BufferName, GlError, MapAccess};
use crate::gles_capabilities::GlesCapabilities;
use crate::gles_context::{CopyRespecify, RenderBackendContext};
use crate::gles_mapping::{allocation_hint, legacy_map_access, range_map_access, MappingStrategy};

const SOURCE: &str = "galaxy3d::gles::Buffer";

/// Upper bound on glGetError iterations when draining the error flags
const MAX_DRAINED_ERRORS: usize = 8;

/// Mapping state of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked {
        offset: usize,
        length: usize,
        strategy: MappingStrategy,
    },
}

/// OpenGL ES buffer object
pub struct GlesHardwareBuffer {
    /// Render backend (driver, capabilities, binding cache)
    ctx: Rc<dyn RenderBackendContext>,
    /// GL buffer name, never NONE while the buffer is alive
    name: BufferName,
    /// Target, size and usage, fixed for the buffer lifetime
    desc: BufferDesc,
    bind_target: BindTarget,
    lock_state: LockState,
}

impl GlesHardwareBuffer {
    /// Create a buffer and reserve `desc.size` bytes of uninitialized storage
    ///
    /// # Errors
    ///
    /// `AllocationError` if the driver returns no buffer name or cannot
    /// reserve the storage. Neither is retried.
    pub fn create(ctx: Rc<dyn RenderBackendContext>, desc: BufferDesc) -> Result<Self> {
        let name = ctx.api().gen_buffer();
        if !name.is_valid() {
            engine_bail!(SOURCE, AllocationError, "Cannot create GL ES buffer");
        }

        // From here on, an early return deletes the name through Drop
        let buffer = Self {
            ctx,
            name,
            bind_target: BindTarget::from(desc.target),
            desc,
            lock_state: LockState::Unlocked,
        };

        buffer.bind_self();

        if buffer.ctx.config().debug_labels && buffer.ctx.has_capability(GlesCapabilities::DEBUG_LABEL) {
            buffer.ctx.api().label_buffer(name, &format!("Buffer #{}", name.0));
        }
        // Only errors raised by the reservation below may fail the creation
        if let Some(error) = buffer.drain_gl_errors() {
            engine_warn!(SOURCE, "Discarding pending GL error {:?} before reserving buffer #{}", error, name.0);
        }

        buffer.ctx.api().buffer_data(buffer.bind_target, buffer.desc.size, None, allocation_hint(buffer.desc.usage));
        if let Some(error) = buffer.drain_gl_errors() {
            engine_bail!(SOURCE, AllocationError,
                "Cannot reserve {} bytes for buffer #{} ({:?})", buffer.desc.size, name.0, error);
        }

        engine_debug!(SOURCE, "Created buffer #{} ({:?}, {} bytes, {:?})",
            name.0, buffer.desc.target, buffer.desc.size, buffer.desc.usage);

        Ok(buffer)
    }

    // ===== ACCESSORS =====

    /// GL buffer name
    pub fn name(&self) -> BufferName { self.name }

    /// Binding point family
    pub fn target(&self) -> BufferTarget { self.desc.target }

    /// Size in bytes
    pub fn size(&self) -> usize { self.desc.size }

    /// Declared access pattern
    pub fn usage(&self) -> BufferUsage { self.desc.usage }

    pub fn lock_state(&self) -> LockState { self.lock_state }

    pub fn is_locked(&self) -> bool {
        matches!(self.lock_state, LockState::Locked { .. })
    }

    // ===== LOCK / UNLOCK =====

    /// Map `[offset, offset + length)` for CPU access
    ///
    /// The returned pointer addresses the first byte of the range and stays
    /// valid until `unlock`. Accessing bytes outside the range, or reading
    /// through a write-only mapping, is undefined behaviour at the driver level.
    ///
    /// # Errors
    ///
    /// - `PreconditionViolated`: already locked, empty range or range past the end
    ///   (checked before any driver call)
    /// - `UnsupportedOperation`: the driver has no mapping entry point
    /// - `MappingError`: the driver returned no mapping
    pub fn lock(&mut self, offset: usize, length: usize, options: LockOptions) -> Result<NonNull<u8>> {
        self.ensure_unlocked("lock")?;
        self.ensure_range("lock", offset, length)?;
        if length == 0 {
            engine_bail!(SOURCE, PreconditionViolated, "lock of an empty range on buffer #{}", self.name.0);
        }

        let strategy = MappingStrategy::from_query(|capability| self.ctx.has_capability(capability));
        let api = self.ctx.api();

        let mapped = match strategy {
            MappingStrategy::Unsupported => {
                engine_bail!(SOURCE, UnsupportedOperation,
                    "Buffer #{} cannot be locked: no buffer mapping support", self.name.0);
            }
            MappingStrategy::RangeMapping => {
                self.bind_self();
                let access = range_map_access(self.desc.usage, options);
                let mapped = api.map_buffer_range(self.bind_target, offset, length, access);
                self.check_gl_error("glMapBufferRange");
                // Already points at `offset`
                mapped
            }
            MappingStrategy::LegacyWholeMapping => {
                self.bind_self();
                if options.discards_contents() {
                    // Orphan the storage so the map does not wait for the GPU
                    api.buffer_data(self.bind_target, self.desc.size, None, allocation_hint(self.desc.usage));
                }
                let base = api.map_buffer_oes(self.bind_target, legacy_map_access(self.desc.usage));
                self.check_gl_error("glMapBufferOES");
                if base.is_null() {
                    base
                } else {
                    // SAFETY: the whole buffer is mapped and offset + length <= size
                    unsafe { base.add(offset) }
                }
            }
        };

        let mapped = NonNull::new(mapped).ok_or_else(|| engine_err!(SOURCE, MappingError,
            "Buffer: Out of memory, cannot map [{}, {}) of buffer #{}", offset, offset + length, self.name.0))?;

        self.lock_state = LockState::Locked { offset, length, strategy };
        engine_trace!(SOURCE, "Locked buffer #{} [{}, {}) {:?} via {:?}",
            self.name.0, offset, offset + length, options, strategy);

        Ok(mapped)
    }

    /// Close the outstanding lock
    ///
    /// Write-only ranged locks are flushed over the whole locked length first,
    /// since they were opened with explicit-flush semantics.
    ///
    /// # Errors
    ///
    /// - `PreconditionViolated`: the buffer is not locked
    /// - `CorruptionError`: the contents were lost while mapped; the lock is
    ///   closed anyway and the whole buffer must be rewritten
    pub fn unlock(&mut self) -> Result<()> {
        let (length, strategy) = match self.lock_state {
            LockState::Locked { length, strategy, .. } => (length, strategy),
            LockState::Unlocked => {
                engine_bail!(SOURCE, PreconditionViolated, "unlock of buffer #{} which is not locked", self.name.0);
            }
        };
        self.lock_state = LockState::Unlocked;

        self.bind_self();
        let api = self.ctx.api();

        if self.desc.usage.is_write_only() && strategy == MappingStrategy::RangeMapping {
            api.flush_mapped_buffer_range(self.bind_target, 0, length);
            self.check_gl_error("glFlushMappedBufferRange");
        }

        let intact = api.unmap_buffer(self.bind_target);
        self.check_gl_error("glUnmapBuffer");
        if !intact {
            engine_bail!(SOURCE, CorruptionError, "Buffer #{} data corrupted, please reload", self.name.0);
        }

        engine_trace!(SOURCE, "Unlocked buffer #{} ({} bytes)", self.name.0, length);
        Ok(())
    }

    /// Lock a range, hand it to `f` as a byte slice, then unlock
    ///
    /// The range is unlocked even when `f` only reads. For write-only buffers
    /// the slice contents before `f` writes are unspecified.
    pub fn lock_scoped<R>(
        &mut self,
        offset: usize,
        length: usize,
        options: LockOptions,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R> {
        let mapped = self.lock(offset, length, options)?;
        // SAFETY: the mapping covers `length` bytes from `mapped` until unlock,
        // and the slice does not outlive `f`
        let bytes = unsafe { std::slice::from_raw_parts_mut(mapped.as_ptr(), length) };
        let result = f(bytes);
        self.unlock()?;
        Ok(result)
    }

    // ===== DIRECT ACCESS =====

    /// Copy `dest.len()` bytes starting at `offset` into `dest`
    ///
    /// # Errors
    ///
    /// - `PreconditionViolated`: locked, or range past the end
    /// - `UnsupportedOperation`: ranged mapping is not available (no fallback)
    /// - `MappingError`: the read mapping could not be established (nothing copied)
    /// - `CorruptionError`: the contents were lost while mapped
    pub fn read_data(&mut self, offset: usize, dest: &mut [u8]) -> Result<()> {
        self.ensure_unlocked("read_data")?;
        let length = dest.len();
        self.ensure_range("read_data", offset, length)?;
        if !self.ctx.has_capability(GlesCapabilities::MAP_BUFFER_RANGE) {
            engine_bail!(SOURCE, UnsupportedOperation, "Read hardware buffer is not supported");
        }
        if length == 0 {
            return Ok(());
        }

        self.bind_self();
        let api = self.ctx.api();

        let src = api.map_buffer_range(self.bind_target, offset, length, MapAccess::READ);
        self.check_gl_error("glMapBufferRange");
        if src.is_null() {
            engine_bail!(SOURCE, MappingError,
                "Cannot map [{}, {}) of buffer #{} for reading", offset, offset + length, self.name.0);
        }

        // SAFETY: the driver mapped `length` readable bytes at `src`, `dest` is CPU memory
        unsafe { std::ptr::copy_nonoverlapping(src as *const u8, dest.as_mut_ptr(), length) };

        let intact = api.unmap_buffer(self.bind_target);
        self.check_gl_error("glUnmapBuffer");
        if !intact {
            engine_bail!(SOURCE, CorruptionError, "Buffer #{} data corrupted, please reload", self.name.0);
        }
        Ok(())
    }

    /// Write `source` at `offset`
    ///
    /// A write covering the whole buffer re-specifies the storage with the new
    /// contents. A partial write with `discard_whole_buffer` orphans the
    /// storage first, leaving every byte outside the written range undefined.
    ///
    /// # Errors
    ///
    /// `PreconditionViolated` if locked or the range is past the end.
    pub fn write_data(&mut self, offset: usize, source: &[u8], discard_whole_buffer: bool) -> Result<()> {
        self.ensure_unlocked("write_data")?;
        self.ensure_range("write_data", offset, source.len())?;
        if source.is_empty() {
            return Ok(());
        }

        self.bind_self();
        let api = self.ctx.api();
        let hint = allocation_hint(self.desc.usage);

        if offset == 0 && source.len() == self.desc.size {
            api.buffer_data(self.bind_target, self.desc.size, Some(source), hint);
            self.check_gl_error("glBufferData");
        } else {
            if discard_whole_buffer {
                api.buffer_data(self.bind_target, self.desc.size, None, hint);
            }
            api.buffer_sub_data(self.bind_target, offset, source);
            self.check_gl_error("glBufferSubData");
        }
        Ok(())
    }

    /// `write_data` over a slice of plain-old-data values
    pub fn write_pod<T: bytemuck::Pod>(&mut self, offset: usize, data: &[T], discard_whole_buffer: bool) -> Result<()> {
        self.write_data(offset, bytemuck::cast_slice(data), discard_whole_buffer)
    }

    /// `read_data` into a slice of plain-old-data values
    pub fn read_pod<T: bytemuck::Pod>(&mut self, offset: usize, out: &mut [T]) -> Result<()> {
        self.read_data(offset, bytemuck::cast_slice_mut(out))
    }

    // ===== DEVICE COPY =====

    /// Copy `length` bytes from buffer `source` at `src_offset` to `dst_offset`,
    /// without a CPU round-trip
    ///
    /// With `discard_whole_buffer` the destination storage is re-specified first
    /// (full size, or exactly `length` under `CopyRespecify::CopyLength`).
    ///
    /// # Panics
    ///
    /// In debug builds, when the context has no buffer copy support. Callers
    /// must check `GlesCapabilities::COPY_BUFFER` first; release builds return
    /// `PreconditionViolated` without touching the driver.
    pub fn copy_data(
        &mut self,
        source: BufferName,
        src_offset: usize,
        dst_offset: usize,
        length: usize,
        discard_whole_buffer: bool,
    ) -> Result<()> {
        if !self.ctx.has_capability(GlesCapabilities::COPY_BUFFER) {
            let err = engine_err!(SOURCE, PreconditionViolated,
                "copy_data on buffer #{} needs OpenGL ES 3.0 buffer copies", self.name.0);
            if cfg!(debug_assertions) {
                panic!("{}", err);
            }
            return Err(err);
        }
        self.ensure_unlocked("copy_data")?;
        if !source.is_valid() {
            engine_bail!(SOURCE, PreconditionViolated, "copy_data into buffer #{} from no buffer", self.name.0);
        }
        if source == self.name && discard_whole_buffer {
            // Re-specifying the storage would discard the source bytes
            engine_bail!(SOURCE, PreconditionViolated,
                "copy_data within buffer #{} cannot discard its own storage", self.name.0);
        }

        let respecify_size = match self.ctx.config().copy_respecify {
            CopyRespecify::CopyLength if discard_whole_buffer => length,
            _ => self.desc.size,
        };
        if !dst_offset.checked_add(length).is_some_and(|end| end <= respecify_size) {
            engine_bail!(SOURCE, PreconditionViolated,
                "copy_data range [{}, +{}) outside buffer #{} ({} bytes)", dst_offset, length, self.name.0, respecify_size);
        }
        if length == 0 {
            return Ok(());
        }

        let api = self.ctx.api();
        if discard_whole_buffer {
            self.bind_self();
            api.buffer_data(self.bind_target, respecify_size, None, allocation_hint(self.desc.usage));
        }

        self.bind(BindTarget::CopyRead, source);
        self.bind(BindTarget::CopyWrite, self.name);
        api.copy_buffer_sub_data(BindTarget::CopyRead, BindTarget::CopyWrite, src_offset, dst_offset, length);
        self.check_gl_error("glCopyBufferSubData");
        self.bind(BindTarget::CopyRead, BufferName::NONE);
        self.bind(BindTarget::CopyWrite, BufferName::NONE);

        engine_trace!(SOURCE, "Copied {} bytes from buffer #{} to buffer #{}", length, source.0, self.name.0);
        Ok(())
    }

    /// `copy_data` from another buffer, with the source range validated
    pub fn copy_from_buffer(
        &mut self,
        source: &GlesHardwareBuffer,
        src_offset: usize,
        dst_offset: usize,
        length: usize,
        discard_whole_buffer: bool,
    ) -> Result<()> {
        if source.is_locked() {
            engine_bail!(SOURCE, PreconditionViolated, "copy source buffer #{} is locked", source.name.0);
        }
        if !source.desc.contains_range(src_offset, length) {
            engine_bail!(SOURCE, PreconditionViolated,
                "copy range [{}, +{}) outside source buffer #{} ({} bytes)", src_offset, length, source.name.0, source.desc.size);
        }
        self.copy_data(source.name, src_offset, dst_offset, length, discard_whole_buffer)
    }

    // ===== DESTRUCTION =====

    /// Destroy the buffer now (same as dropping it)
    pub fn destroy(self) {
        drop(self);
    }

    fn destroy_buffer(&mut self) {
        if !self.name.is_valid() {
            return;
        }
        if self.is_locked() {
            engine_warn!(SOURCE, "Buffer #{} destroyed while locked, the driver releases the mapping", self.name.0);
        }

        match self.ctx.binding_cache() {
            Some(cache) => match cache.try_borrow_mut() {
                Ok(mut cache) => cache.delete_buffer(self.bind_target, self.name),
                Err(_) => {
                    engine_warn!(SOURCE, "Binding cache busy, deferring deletion of buffer #{}", self.name.0);
                    self.ctx.defer_buffer_delete(self.bind_target, self.name);
                }
            },
            None => {
                engine_debug!(SOURCE, "Binding cache gone, deleting buffer #{} directly", self.name.0);
                self.ctx.api().delete_buffer(self.name);
            }
        }

        engine_debug!(SOURCE, "Destroyed buffer #{}", self.name.0);
        self.name = BufferName::NONE;
        self.lock_state = LockState::Unlocked;
    }

    // ===== HELPERS =====

    fn bind_self(&self) {
        self.bind(self.bind_target, self.name);
    }

    fn bind(&self, target: BindTarget, name: BufferName) {
        match self.ctx.binding_cache() {
            Some(cache) => cache.borrow_mut().bind_buffer(target, name),
            None => self.ctx.api().bind_buffer(target, name),
        }
    }

    fn ensure_unlocked(&self, operation: &str) -> Result<()> {
        if let LockState::Locked { offset, length, .. } = self.lock_state {
            engine_bail!(SOURCE, PreconditionViolated,
                "{} on buffer #{} while [{}, {}) is locked", operation, self.name.0, offset, offset + length);
        }
        Ok(())
    }

    fn ensure_range(&self, operation: &str, offset: usize, length: usize) -> Result<()> {
        if !self.desc.contains_range(offset, length) {
            engine_bail!(SOURCE, PreconditionViolated,
                "{} range [{}, +{}) outside buffer #{} ({} bytes)", operation, offset, length, self.name.0, self.desc.size);
        }
        Ok(())
    }

    /// First pending driver error, clearing every flag
    fn drain_gl_errors(&self) -> Option<GlError> {
        let mut first = None;
        for _ in 0..MAX_DRAINED_ERRORS {
            match self.ctx.api().get_error() {
                GlError::NoError => break,
                error => {
                    first.get_or_insert(error);
                }
            }
        }
        first
    }

    fn check_gl_error(&self, call: &str) {
        if !self.ctx.config().check_errors {
            return;
        }
        if let Some(error) = self.drain_gl_errors() {
            engine_error!(SOURCE, "{} on buffer #{} raised {:?}", call, self.name.0, error);
        }
    }
}

impl fmt::Debug for GlesHardwareBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlesHardwareBuffer")
            .field("name", &self.name)
            .field("target", &self.desc.target)
            .field("size", &self.desc.size)
            .field("usage", &self.desc.usage)
            .field("lock_state", &self.lock_state)
            .finish()
    }
}

impl Drop for GlesHardwareBuffer {
    fn drop(&mut self) {
        self.destroy_buffer();
    }
}

#[cfg(test)]
#[path = "gles_buffer_tests.rs"]
mod tests;
