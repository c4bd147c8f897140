/// Hardware buffer vocabulary shared by every backend
///
/// Backends translate these into their own driver enums (GL binding points,
/// GL usage hints, map access bits).

use bitflags::bitflags;

/// Binding point family of a hardware buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex data
    Vertex,
    /// Index data
    Index,
    /// Uniform/constant data
    Uniform,
}

bitflags! {
    /// Declared access pattern of a hardware buffer
    ///
    /// Frequency bits (`STATIC`, `DYNAMIC`, `DISCARDABLE`) select the driver
    /// allocation hint; `WRITE_ONLY` selects write-oriented mapping paths.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Written once, read many times
        const STATIC = 1 << 0;
        /// Rewritten regularly
        const DYNAMIC = 1 << 1;
        /// The CPU never reads back through a mapping
        const WRITE_ONLY = 1 << 2;
        /// Contents are refilled every frame; old contents may be dropped at any time
        const DISCARDABLE = 1 << 3;

        const STATIC_WRITE_ONLY = Self::STATIC.bits() | Self::WRITE_ONLY.bits();
        const DYNAMIC_WRITE_ONLY = Self::DYNAMIC.bits() | Self::WRITE_ONLY.bits();
        const DYNAMIC_WRITE_ONLY_DISCARDABLE =
            Self::DYNAMIC.bits() | Self::WRITE_ONLY.bits() | Self::DISCARDABLE.bits();
    }
}

impl BufferUsage {
    /// True when the buffer is written by the CPU and never read back
    pub fn is_write_only(&self) -> bool {
        self.contains(BufferUsage::WRITE_ONLY)
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        BufferUsage::DYNAMIC
    }
}

/// How the caller intends to use a locked range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockOptions {
    /// Read and write, previous contents preserved
    #[default]
    Normal,
    /// Previous contents of the range may be thrown away
    Discard,
    /// Read only, nothing is written back
    ReadOnly,
    /// Caller promises not to overwrite data the GPU is still using
    NoOverwrite,
}

impl LockOptions {
    /// True for the modes that allow the driver to drop previous contents
    pub fn discards_contents(&self) -> bool {
        matches!(self, LockOptions::Discard | LockOptions::NoOverwrite)
    }
}

/// Descriptor for creating a hardware buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Binding point family
    pub target: BufferTarget,
    /// Size in bytes, fixed for the buffer lifetime
    pub size: usize,
    /// Declared access pattern
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn new(target: BufferTarget, size: usize, usage: BufferUsage) -> Self {
        Self { target, size, usage }
    }

    /// True when `[offset, offset + length)` lies inside the buffer
    pub fn contains_range(&self, offset: usize, length: usize) -> bool {
        offset.checked_add(length).is_some_and(|end| end <= self.size)
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
