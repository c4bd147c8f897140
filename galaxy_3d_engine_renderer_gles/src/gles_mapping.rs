/// Mapping strategy selection for buffer locks
///
/// Three mutually exclusive driver tiers exist for CPU access to a buffer.
/// The tier is resolved from the context capabilities every time a lock is
/// opened and recorded in the lock state, so unlock always closes the mapping
/// with the same tier that opened it.

use galaxy_3d_engine_core::galaxy3d::buffer::{BufferUsage, LockOptions};

use crate::gles_api::{GlUsage, LegacyMapAccess, MapAccess};
use crate::gles_capabilities::GlesCapabilities;

/// Driver path used to map a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStrategy {
    /// glMapBufferRange over exactly the locked range, explicit flush for writes
    RangeMapping,
    /// glMapBufferOES over the whole buffer
    LegacyWholeMapping,
    /// No mapping entry point available
    Unsupported,
}

impl MappingStrategy {
    /// Pick the best available tier (range mapping first), asking
    /// `has_capability` one bit at a time
    pub fn from_query(has_capability: impl Fn(GlesCapabilities) -> bool) -> Self {
        if has_capability(GlesCapabilities::MAP_BUFFER_RANGE) {
            MappingStrategy::RangeMapping
        } else if has_capability(GlesCapabilities::MAPBUFFER_OES) {
            MappingStrategy::LegacyWholeMapping
        } else {
            MappingStrategy::Unsupported
        }
    }
}

/// Access bits for a ranged lock
///
/// Write-only buffers always map write + explicit flush, and additionally
/// invalidate the range when the lock discards. Otherwise a read-only lock
/// maps read access and anything else maps read/write.
pub fn range_map_access(usage: BufferUsage, options: LockOptions) -> MapAccess {
    if usage.is_write_only() {
        let mut access = MapAccess::WRITE | MapAccess::FLUSH_EXPLICIT;
        if options.discards_contents() {
            access |= MapAccess::INVALIDATE_RANGE;
        }
        access
    } else if options == LockOptions::ReadOnly {
        MapAccess::READ
    } else {
        MapAccess::READ | MapAccess::WRITE
    }
}

/// Access argument for a whole-buffer legacy lock
pub fn legacy_map_access(usage: BufferUsage) -> LegacyMapAccess {
    if usage.is_write_only() {
        LegacyMapAccess::WriteOnly
    } else {
        LegacyMapAccess::Unspecified
    }
}

/// glBufferData hint for a usage, first match wins:
/// discardable → stream, static → static, anything else → dynamic.
pub fn allocation_hint(usage: BufferUsage) -> GlUsage {
    if usage.contains(BufferUsage::DISCARDABLE) {
        GlUsage::StreamDraw
    } else if usage.contains(BufferUsage::STATIC) {
        GlUsage::StaticDraw
    } else {
        GlUsage::DynamicDraw
    }
}

#[cfg(test)]
#[path = "gles_mapping_tests.rs"]
mod tests;
