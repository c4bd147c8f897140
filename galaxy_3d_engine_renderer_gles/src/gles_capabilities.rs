/// Capability detection for OpenGL ES contexts
///
/// Buffer code never looks at version numbers or extension strings directly;
/// it asks for one of the `GlesCapabilities` bits, resolved once per context.

use bitflags::bitflags;

pub const EXT_MAP_BUFFER_RANGE: &str = "GL_EXT_map_buffer_range";
pub const OES_MAPBUFFER: &str = "GL_OES_mapbuffer";
pub const EXT_DEBUG_LABEL: &str = "GL_EXT_debug_label";
pub const KHR_DEBUG: &str = "GL_KHR_debug";

/// OpenGL ES context version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlesVersion {
    pub major: u32,
    pub minor: u32,
}

impl GlesVersion {
    pub const ES_2_0: GlesVersion = GlesVersion { major: 2, minor: 0 };
    pub const ES_3_0: GlesVersion = GlesVersion { major: 3, minor: 0 };

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a GL_VERSION string of the form `"OpenGL ES M.N <vendor info>"`
    pub fn parse(version: &str) -> Option<Self> {
        let numbers = version.trim().strip_prefix("OpenGL ES")?.trim_start();
        // "OpenGL ES-CM 1.1" style profiles are not ES 2+ contexts
        let numbers = numbers.split_whitespace().next()?;
        let mut parts = numbers.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts
            .next()
            .map(|minor| minor.chars().take_while(|c| c.is_ascii_digit()).collect::<String>())
            .and_then(|minor| minor.parse().ok())
            .unwrap_or(0);
        Some(Self { major, minor })
    }
}

impl std::fmt::Display for GlesVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenGL ES {}.{}", self.major, self.minor)
    }
}

bitflags! {
    /// Optional driver features that gate buffer code paths
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GlesCapabilities: u32 {
        /// glMapBufferRange / glFlushMappedBufferRange (ES 3.0 or GL_EXT_map_buffer_range)
        const MAP_BUFFER_RANGE = 1 << 0;
        /// Whole-buffer glMapBufferOES (GL_OES_mapbuffer)
        const MAPBUFFER_OES = 1 << 1;
        /// glCopyBufferSubData and the copy binding points (ES 3.0)
        const COPY_BUFFER = 1 << 2;
        /// Object labels (GL_EXT_debug_label or GL_KHR_debug)
        const DEBUG_LABEL = 1 << 3;
    }
}

impl Default for GlesCapabilities {
    fn default() -> Self {
        GlesCapabilities::empty()
    }
}

impl GlesCapabilities {
    /// Resolve capabilities from the context version and its extension list
    pub fn detect<I, S>(version: GlesVersion, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut caps = GlesCapabilities::empty();
        if version >= GlesVersion::ES_3_0 {
            caps |= GlesCapabilities::MAP_BUFFER_RANGE | GlesCapabilities::COPY_BUFFER;
        }

        for extension in extensions {
            match extension.as_ref().trim() {
                EXT_MAP_BUFFER_RANGE => caps |= GlesCapabilities::MAP_BUFFER_RANGE,
                OES_MAPBUFFER => caps |= GlesCapabilities::MAPBUFFER_OES,
                EXT_DEBUG_LABEL | KHR_DEBUG => caps |= GlesCapabilities::DEBUG_LABEL,
                _ => {}
            }
        }

        caps
    }
}

#[cfg(test)]
#[path = "gles_capabilities_tests.rs"]
mod tests;
