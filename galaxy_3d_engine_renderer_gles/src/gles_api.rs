/// GlesApi - Driver seam for the OpenGL ES buffer object entry points
///
/// The buffer resource never calls GL directly: everything goes through this
/// trait so the backend can sit on top of any loader (or the CPU-emulated
/// `SoftwareGles`). Methods follow GL semantics: data operations act on the
/// buffer currently bound to `target`, and failures set the sticky error flag
/// read by `get_error`.

use bitflags::bitflags;
use galaxy_3d_engine_core::galaxy3d::buffer::BufferTarget;

use crate::gles_capabilities::GlesVersion;

// ===== NAMES AND ENUMS =====

/// GL buffer object name (0 is "no buffer")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferName(pub u32);

impl BufferName {
    pub const NONE: BufferName = BufferName(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// GL buffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindTarget {
    /// GL_ARRAY_BUFFER
    Array,
    /// GL_ELEMENT_ARRAY_BUFFER
    ElementArray,
    /// GL_UNIFORM_BUFFER (ES 3.0)
    Uniform,
    /// GL_COPY_READ_BUFFER (ES 3.0)
    CopyRead,
    /// GL_COPY_WRITE_BUFFER (ES 3.0)
    CopyWrite,
}

impl From<BufferTarget> for BindTarget {
    fn from(target: BufferTarget) -> Self {
        match target {
            BufferTarget::Vertex => BindTarget::Array,
            BufferTarget::Index => BindTarget::ElementArray,
            BufferTarget::Uniform => BindTarget::Uniform,
        }
    }
}

/// Allocation hint passed to glBufferData
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlUsage {
    StreamDraw,
    StaticDraw,
    DynamicDraw,
}

bitflags! {
    /// Access bits of glMapBufferRange (GL_MAP_*_BIT)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapAccess: u32 {
        const READ = 0x0001;
        const WRITE = 0x0002;
        const INVALIDATE_RANGE = 0x0004;
        const INVALIDATE_BUFFER = 0x0008;
        const FLUSH_EXPLICIT = 0x0010;
        const UNSYNCHRONIZED = 0x0020;
    }
}

/// Access argument of glMapBufferOES
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyMapAccess {
    /// GL_WRITE_ONLY_OES
    WriteOnly,
    /// No access hint given
    Unspecified,
}

/// Value of glGetError
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlError {
    NoError,
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    OutOfMemory,
}

// ===== DRIVER TRAIT =====

/// OpenGL ES buffer object entry points
///
/// All calls must happen on the thread that owns the GL context; implementors
/// are not required to be `Send` or `Sync`.
pub trait GlesApi {
    /// Context version (GL_VERSION)
    fn version(&self) -> GlesVersion;

    /// Supported extension names (GL_EXTENSIONS)
    fn extensions(&self) -> Vec<String>;

    /// glGenBuffers for a single name; `BufferName::NONE` on failure
    fn gen_buffer(&self) -> BufferName;

    /// glBindBuffer; `BufferName::NONE` unbinds the target
    fn bind_buffer(&self, target: BindTarget, name: BufferName);

    /// glDeleteBuffers for a single name
    fn delete_buffer(&self, name: BufferName);

    /// glBufferData; `data`, when given, holds exactly `size` bytes
    fn buffer_data(&self, target: BindTarget, size: usize, data: Option<&[u8]>, usage: GlUsage);

    /// glBufferSubData
    fn buffer_sub_data(&self, target: BindTarget, offset: usize, data: &[u8]);

    /// glMapBufferRange(EXT); null on failure
    fn map_buffer_range(&self, target: BindTarget, offset: usize, length: usize, access: MapAccess) -> *mut u8;

    /// glMapBufferOES, maps the whole buffer; null on failure
    fn map_buffer_oes(&self, target: BindTarget, access: LegacyMapAccess) -> *mut u8;

    /// glFlushMappedBufferRange(EXT), offsets relative to the mapped range
    fn flush_mapped_buffer_range(&self, target: BindTarget, offset: usize, length: usize);

    /// glUnmapBuffer(OES); false when the contents were lost while mapped
    fn unmap_buffer(&self, target: BindTarget) -> bool;

    /// glCopyBufferSubData (ES 3.0)
    fn copy_buffer_sub_data(
        &self,
        read_target: BindTarget,
        write_target: BindTarget,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    );

    /// glLabelObjectEXT / glObjectLabel on a buffer object
    fn label_buffer(&self, name: BufferName, label: &str);

    /// glGetError (returns and clears the error flag)
    fn get_error(&self) -> GlError;
}
