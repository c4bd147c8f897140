/// SoftwareGles - CPU-emulated OpenGL ES buffer driver (no GPU required)
///
/// Implements `GlesApi` with GL semantics close enough to exercise every
/// buffer code path headless:
/// - entry points are gated by the advertised version and extensions
/// - errors are sticky until `get_error` reads them
/// - mappings hand out a private staging copy; writes reach the buffer
///   only through explicit flushes or, without FLUSH_EXPLICIT, on unmap
/// - undefined storage is filled with `UNDEFINED_BYTE`
///
/// Every entry point except the queries is recorded in a call log.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::ptr::NonNull;

use crate::gles_api::{BindTarget, BufferName, GlError, GlUsage, GlesApi, LegacyMapAccess, MapAccess};
use crate::gles_capabilities::{
    GlesVersion, EXT_DEBUG_LABEL, EXT_MAP_BUFFER_RANGE, KHR_DEBUG, OES_MAPBUFFER,
};

/// Fill value of storage whose contents are undefined
pub const UNDEFINED_BYTE: u8 = 0xCD;

// ============================================================================
// Driver state
// ============================================================================

/// Live mapping of one buffer
struct Mapping {
    /// Offset of the mapped range inside the buffer
    offset: usize,
    /// Staging copy handed to the caller, owned (allocated with `Box`)
    staging: NonNull<[u8]>,
    writable: bool,
    flush_explicit: bool,
}

impl Mapping {
    fn new(offset: usize, initial: Vec<u8>, writable: bool, flush_explicit: bool) -> Self {
        Self {
            offset,
            staging: NonNull::from(Box::leak(initial.into_boxed_slice())),
            writable,
            flush_explicit,
        }
    }

    fn pointer(&self) -> *mut u8 {
        self.staging.as_ptr() as *mut u8
    }

    fn bytes(&self) -> &[u8] {
        // SAFETY: staging is owned by this mapping; callers only write through
        // the pointer between map and unmap, never concurrently with this read
        unsafe { self.staging.as_ref() }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: staging came from Box::leak in `new` and is freed only here
        unsafe { drop(Box::from_raw(self.staging.as_ptr())) };
    }
}

#[derive(Default)]
struct SoftBuffer {
    data: Vec<u8>,
    usage: Option<GlUsage>,
    label: Option<String>,
    mapping: Option<Mapping>,
}

#[derive(Default)]
struct DriverState {
    next_name: u32,
    buffers: FxHashMap<BufferName, SoftBuffer>,
    bindings: FxHashMap<BindTarget, BufferName>,
    error: Option<GlError>,
    calls: Vec<String>,
    out_of_names: bool,
    out_of_memory: bool,
    context_lost: bool,
}

impl DriverState {
    /// Record `error` unless an earlier one is still pending
    fn raise(&mut self, error: GlError) {
        self.error.get_or_insert(error);
    }

    fn bound_name(&self, target: BindTarget) -> Option<BufferName> {
        self.bindings.get(&target).copied().filter(BufferName::is_valid)
    }

    /// Buffer bound to `target`, raising INVALID_OPERATION if there is none
    fn bound_mut(&mut self, target: BindTarget) -> Option<&mut SoftBuffer> {
        let Some(name) = self.bound_name(target) else {
            self.raise(GlError::InvalidOperation);
            return None;
        };
        self.buffers.get_mut(&name)
    }
}

fn range_fits(offset: usize, length: usize, size: usize) -> bool {
    offset.checked_add(length).is_some_and(|end| end <= size)
}

fn format_access(access: MapAccess) -> String {
    let names: Vec<&str> = access.iter_names().map(|(name, _)| name).collect();
    if names.is_empty() {
        "0".to_string()
    } else {
        names.join(" | ")
    }
}

// ============================================================================
// SoftwareGles
// ============================================================================

pub struct SoftwareGles {
    version: GlesVersion,
    extensions: Vec<String>,
    state: RefCell<DriverState>,
}

impl SoftwareGles {
    pub fn new(version: GlesVersion, extensions: &[&str]) -> Self {
        Self {
            version,
            extensions: extensions.iter().map(|extension| extension.to_string()).collect(),
            state: RefCell::new(DriverState { next_name: 1, ..Default::default() }),
        }
    }

    /// Bare OpenGL ES 2.0, no buffer extensions
    pub fn gles2() -> Self {
        Self::new(GlesVersion::ES_2_0, &[])
    }

    /// OpenGL ES 3.0 with object labels
    pub fn gles3() -> Self {
        Self::new(GlesVersion::ES_3_0, &[KHR_DEBUG])
    }

    // ===== INSPECTION =====

    /// Recorded driver calls, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Number of recorded calls to the entry point `function`
    pub fn call_count(&self, function: &str) -> usize {
        let prefix = format!("{}(", function);
        self.state.borrow().calls.iter().filter(|call| call.starts_with(&prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Current storage of a live buffer
    pub fn buffer_contents(&self, name: BufferName) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&name).map(|buffer| buffer.data.clone())
    }

    /// Number of live buffer objects
    pub fn buffer_count(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn is_live(&self, name: BufferName) -> bool {
        self.state.borrow().buffers.contains_key(&name)
    }

    pub fn is_mapped(&self, name: BufferName) -> bool {
        self.state.borrow().buffers.get(&name).is_some_and(|buffer| buffer.mapping.is_some())
    }

    /// Buffer bound to `target` (`NONE` if unbound)
    pub fn bound(&self, target: BindTarget) -> BufferName {
        self.state.borrow().bound_name(target).unwrap_or(BufferName::NONE)
    }

    pub fn label(&self, name: BufferName) -> Option<String> {
        self.state.borrow().buffers.get(&name).and_then(|buffer| buffer.label.clone())
    }

    /// Hint of the last glBufferData on `name`
    pub fn usage_hint(&self, name: BufferName) -> Option<GlUsage> {
        self.state.borrow().buffers.get(&name).and_then(|buffer| buffer.usage)
    }

    /// Pending error without clearing it
    pub fn peek_error(&self) -> GlError {
        self.state.borrow().error.unwrap_or(GlError::NoError)
    }

    // ===== FAULT INJECTION =====

    /// glGenBuffers returns no name while set
    pub fn set_out_of_names(&self, out_of_names: bool) {
        self.state.borrow_mut().out_of_names = out_of_names;
    }

    /// Storage reservations and mappings fail with GL_OUT_OF_MEMORY while set
    pub fn set_out_of_memory(&self, out_of_memory: bool) {
        self.state.borrow_mut().out_of_memory = out_of_memory;
    }

    /// The next unmap reports lost contents and leaves that buffer undefined
    pub fn simulate_context_loss(&self) {
        self.state.borrow_mut().context_lost = true;
    }

    // ===== GATES =====

    fn has_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|supported| supported == extension)
    }

    fn is_es3(&self) -> bool {
        self.version >= GlesVersion::ES_3_0
    }

    fn supports_range_mapping(&self) -> bool {
        self.is_es3() || self.has_extension(EXT_MAP_BUFFER_RANGE)
    }

    fn supports_unmap(&self) -> bool {
        self.supports_range_mapping() || self.has_extension(OES_MAPBUFFER)
    }

    fn supports_target(&self, target: BindTarget) -> bool {
        match target {
            BindTarget::Array | BindTarget::ElementArray => true,
            BindTarget::Uniform | BindTarget::CopyRead | BindTarget::CopyWrite => self.is_es3(),
        }
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl GlesApi for SoftwareGles {
    fn version(&self) -> GlesVersion {
        self.version
    }

    fn extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }

    fn gen_buffer(&self) -> BufferName {
        let mut state = self.state.borrow_mut();
        let name = if state.out_of_names {
            BufferName::NONE
        } else {
            let name = BufferName(state.next_name);
            state.next_name += 1;
            state.buffers.insert(name, SoftBuffer::default());
            name
        };
        state.calls.push(format!("gen_buffer() -> {}", name.0));
        name
    }

    fn bind_buffer(&self, target: BindTarget, name: BufferName) {
        self.record(format!("bind_buffer({:?}, {})", target, name.0));
        let mut state = self.state.borrow_mut();
        if !self.supports_target(target) {
            state.raise(GlError::InvalidEnum);
            return;
        }
        if name.is_valid() && !state.buffers.contains_key(&name) {
            state.raise(GlError::InvalidOperation);
            return;
        }
        if name.is_valid() {
            state.bindings.insert(target, name);
        } else {
            state.bindings.remove(&target);
        }
    }

    fn delete_buffer(&self, name: BufferName) {
        self.record(format!("delete_buffer({})", name.0));
        let mut state = self.state.borrow_mut();
        // Unknown names are silently ignored, a mapped buffer is unmapped
        if state.buffers.remove(&name).is_some() {
            state.bindings.retain(|_, bound| *bound != name);
        }
    }

    fn buffer_data(&self, target: BindTarget, size: usize, data: Option<&[u8]>, usage: GlUsage) {
        self.record(format!("buffer_data({:?}, {}, {}, {:?})",
            target, size, if data.is_some() { "data" } else { "null" }, usage));
        let mut state = self.state.borrow_mut();
        let out_of_memory = state.out_of_memory;
        if data.is_some_and(|data| data.len() != size) {
            state.raise(GlError::InvalidValue);
            return;
        }
        if out_of_memory && size > 0 {
            state.raise(GlError::OutOfMemory);
            return;
        }
        let Some(buffer) = state.bound_mut(target) else { return };
        buffer.mapping = None;
        buffer.data = match data {
            Some(data) => data.to_vec(),
            None => vec![UNDEFINED_BYTE; size],
        };
        buffer.usage = Some(usage);
    }

    fn buffer_sub_data(&self, target: BindTarget, offset: usize, data: &[u8]) {
        self.record(format!("buffer_sub_data({:?}, {}, {})", target, offset, data.len()));
        let mut state = self.state.borrow_mut();
        let Some(buffer) = state.bound_mut(target) else { return };
        let error = if buffer.mapping.is_some() {
            Some(GlError::InvalidOperation)
        } else if !range_fits(offset, data.len(), buffer.data.len()) {
            Some(GlError::InvalidValue)
        } else {
            buffer.data[offset..offset + data.len()].copy_from_slice(data);
            None
        };
        if let Some(error) = error {
            state.raise(error);
        }
    }

    fn map_buffer_range(&self, target: BindTarget, offset: usize, length: usize, access: MapAccess) -> *mut u8 {
        self.record(format!("map_buffer_range({:?}, {}, {}, {})", target, offset, length, format_access(access)));
        let mut state = self.state.borrow_mut();
        if !self.supports_range_mapping() {
            state.raise(GlError::InvalidOperation);
            return std::ptr::null_mut();
        }
        let out_of_memory = state.out_of_memory;
        let Some(buffer) = state.bound_mut(target) else { return std::ptr::null_mut() };

        let readable = access.contains(MapAccess::READ);
        let writable = access.contains(MapAccess::WRITE);
        let invalidates = access.intersects(MapAccess::INVALIDATE_RANGE | MapAccess::INVALIDATE_BUFFER);
        let flush_explicit = access.contains(MapAccess::FLUSH_EXPLICIT);

        let error = if buffer.mapping.is_some() {
            Some(GlError::InvalidOperation)
        } else if length == 0 || !range_fits(offset, length, buffer.data.len()) {
            Some(GlError::InvalidValue)
        } else if !(readable || writable) || (readable && invalidates) || (flush_explicit && !writable) {
            Some(GlError::InvalidOperation)
        } else if out_of_memory {
            Some(GlError::OutOfMemory)
        } else {
            None
        };
        if let Some(error) = error {
            state.raise(error);
            return std::ptr::null_mut();
        }

        if access.contains(MapAccess::INVALIDATE_BUFFER) {
            buffer.data.fill(UNDEFINED_BYTE);
        }
        let initial = if invalidates || !readable {
            vec![UNDEFINED_BYTE; length]
        } else {
            buffer.data[offset..offset + length].to_vec()
        };
        let mapping = Mapping::new(offset, initial, writable, flush_explicit);
        let pointer = mapping.pointer();
        buffer.mapping = Some(mapping);
        pointer
    }

    fn map_buffer_oes(&self, target: BindTarget, access: LegacyMapAccess) -> *mut u8 {
        self.record(format!("map_buffer_oes({:?}, {:?})", target, access));
        let mut state = self.state.borrow_mut();
        if !self.has_extension(OES_MAPBUFFER) {
            state.raise(GlError::InvalidOperation);
            return std::ptr::null_mut();
        }
        let out_of_memory = state.out_of_memory;
        let Some(buffer) = state.bound_mut(target) else { return std::ptr::null_mut() };

        let error = if buffer.mapping.is_some() {
            Some(GlError::InvalidOperation)
        } else if out_of_memory {
            Some(GlError::OutOfMemory)
        } else {
            None
        };
        if let Some(error) = error {
            state.raise(error);
            return std::ptr::null_mut();
        }

        let mapping = Mapping::new(0, buffer.data.clone(), true, false);
        let pointer = mapping.pointer();
        buffer.mapping = Some(mapping);
        pointer
    }

    fn flush_mapped_buffer_range(&self, target: BindTarget, offset: usize, length: usize) {
        self.record(format!("flush_mapped_buffer_range({:?}, {}, {})", target, offset, length));
        let mut state = self.state.borrow_mut();
        if !self.supports_range_mapping() {
            state.raise(GlError::InvalidOperation);
            return;
        }
        let Some(SoftBuffer { data, mapping, .. }) = state.bound_mut(target) else { return };

        let error = match mapping {
            Some(mapping) if mapping.flush_explicit => {
                if range_fits(offset, length, mapping.bytes().len()) {
                    let start = mapping.offset + offset;
                    data[start..start + length].copy_from_slice(&mapping.bytes()[offset..offset + length]);
                    None
                } else {
                    Some(GlError::InvalidValue)
                }
            }
            _ => Some(GlError::InvalidOperation),
        };
        if let Some(error) = error {
            state.raise(error);
        }
    }

    fn unmap_buffer(&self, target: BindTarget) -> bool {
        self.record(format!("unmap_buffer({:?})", target));
        let mut state = self.state.borrow_mut();
        if !self.supports_unmap() {
            state.raise(GlError::InvalidOperation);
            return false;
        }
        let context_lost = state.context_lost;
        let Some(buffer) = state.bound_mut(target) else { return false };

        let Some(mapping) = buffer.mapping.take() else {
            state.raise(GlError::InvalidOperation);
            return false;
        };

        if context_lost {
            buffer.data.fill(UNDEFINED_BYTE);
            state.context_lost = false;
            return false;
        }
        if mapping.writable && !mapping.flush_explicit {
            let staged = mapping.bytes();
            buffer.data[mapping.offset..mapping.offset + staged.len()].copy_from_slice(staged);
        }
        true
    }

    fn copy_buffer_sub_data(
        &self,
        read_target: BindTarget,
        write_target: BindTarget,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    ) {
        self.record(format!("copy_buffer_sub_data({:?}, {:?}, {}, {}, {})",
            read_target, write_target, read_offset, write_offset, size));
        let mut state = self.state.borrow_mut();
        if !self.is_es3() {
            state.raise(GlError::InvalidOperation);
            return;
        }
        let (Some(read_name), Some(write_name)) = (state.bound_name(read_target), state.bound_name(write_target)) else {
            state.raise(GlError::InvalidOperation);
            return;
        };

        let source = match state.buffers.get(&read_name) {
            Some(buffer) if buffer.mapping.is_some() => Err(GlError::InvalidOperation),
            Some(buffer) if range_fits(read_offset, size, buffer.data.len()) => {
                Ok(buffer.data[read_offset..read_offset + size].to_vec())
            }
            _ => Err(GlError::InvalidValue),
        };
        let source = match source {
            Ok(source) => source,
            Err(error) => {
                state.raise(error);
                return;
            }
        };
        let overlapping = read_name == write_name
            && read_offset < write_offset + size
            && write_offset < read_offset + size;

        let error = match state.buffers.get_mut(&write_name) {
            Some(buffer) if buffer.mapping.is_some() => Some(GlError::InvalidOperation),
            Some(buffer) if !overlapping && range_fits(write_offset, size, buffer.data.len()) => {
                buffer.data[write_offset..write_offset + size].copy_from_slice(&source);
                None
            }
            _ => Some(GlError::InvalidValue),
        };
        if let Some(error) = error {
            state.raise(error);
        }
    }

    fn label_buffer(&self, name: BufferName, label: &str) {
        self.record(format!("label_buffer({}, {})", name.0, label));
        let mut state = self.state.borrow_mut();
        if !(self.has_extension(EXT_DEBUG_LABEL) || self.has_extension(KHR_DEBUG)) {
            state.raise(GlError::InvalidOperation);
            return;
        }
        match state.buffers.get_mut(&name) {
            Some(buffer) => buffer.label = Some(label.to_string()),
            None => state.raise(GlError::InvalidValue),
        }
    }

    fn get_error(&self) -> GlError {
        self.state.borrow_mut().error.take().unwrap_or(GlError::NoError)
    }
}

#[cfg(test)]
#[path = "software_driver_tests.rs"]
mod tests;
