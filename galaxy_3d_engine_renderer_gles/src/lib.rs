/*!
# Galaxy 3D Engine - OpenGL ES Renderer Backend

OpenGL ES 2.0 / 3.0 hardware buffers for the Galaxy 3D rendering engine.

A `GlesHardwareBuffer` owns one GL buffer object (vertex, index or uniform
data) and gives the CPU access to it through lock/unlock, direct reads and
writes, and device-side copies. Which driver path is used depends on the
capabilities detected on the context:

- ranged mapping (ES 3.0 or `GL_EXT_map_buffer_range`)
- whole-buffer mapping (`GL_OES_mapbuffer`)
- buffer-to-buffer copies (ES 3.0)

The driver itself sits behind the `GlesApi` trait. `SoftwareGles` implements
it on the CPU, so the whole backend runs without a GPU.

# Example

```no_run
use std::rc::Rc;
use galaxy_3d_engine_core::galaxy3d::buffer::{BufferDesc, BufferTarget, BufferUsage, LockOptions};
use galaxy_3d_engine_renderer_gles::galaxy3d::gles::{GlesConfig, GlesContext, GlesHardwareBuffer, SoftwareGles};

# fn main() -> galaxy_3d_engine_core::galaxy3d::Result<()> {
let ctx = GlesContext::new(Rc::new(SoftwareGles::gles3()), GlesConfig::default())?;
let desc = BufferDesc::new(BufferTarget::Vertex, 64, BufferUsage::DYNAMIC_WRITE_ONLY);
let mut buffer = GlesHardwareBuffer::create(ctx.clone(), desc)?;

buffer.lock_scoped(0, 16, LockOptions::Discard, |bytes| bytes.fill(0xFF))?;
buffer.write_data(16, &[1, 2, 3, 4], false)?;
# Ok(())
# }
```
*/

// Driver seam and capability detection
mod gles_api;
mod gles_capabilities;
mod gles_mapping;

// Backend state
mod gles_state_cache;
mod gles_context;

// GPU resources
mod gles_buffer;

// CPU driver
pub mod software_driver;

// Main galaxy3d namespace module
pub mod galaxy3d {
    pub mod gles {
        // Driver seam
        pub use crate::gles_api::{
            BindTarget, BufferName, GlError, GlUsage, GlesApi, LegacyMapAccess, MapAccess,
        };
        pub use crate::gles_capabilities::{GlesCapabilities, GlesVersion};
        pub use crate::gles_mapping::{
            allocation_hint, legacy_map_access, range_map_access, MappingStrategy,
        };

        // Backend state
        pub use crate::gles_state_cache::{BindingCache, StateCacheManager};
        pub use crate::gles_context::{CopyRespecify, GlesConfig, GlesContext, RenderBackendContext};

        // Buffers
        pub use crate::gles_buffer::{GlesHardwareBuffer, LockState};

        // CPU driver
        pub use crate::software_driver::{SoftwareGles, UNDEFINED_BYTE};

        /// Extension names recognized by capability detection
        pub mod extensions {
            pub use crate::gles_capabilities::{
                EXT_DEBUG_LABEL, EXT_MAP_BUFFER_RANGE, KHR_DEBUG, OES_MAPBUFFER,
            };
        }
    }
}
