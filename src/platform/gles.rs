//!
//! GLES-side types and the client-API half of the platform seam.
//!

use std::fmt;

use crate::debug::DebugMessageSink;

/// OpenGL ES API version as a (major, minor) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GlesVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl GlesVersion {
    /// No version negotiated yet.
    pub const NONE: Self = Self::new(0, 0);

    /// Create a version.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Check whether a real version has been recorded.
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.major != 0
    }
}

impl fmt::Display for GlesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Context versions tried in order by trial creation, newest first.
///
/// EGL has no query for the highest supported client version, so the only
/// way to find it is to attempt creation in descending order.
pub const GLES_VERSION_CANDIDATES: [GlesVersion; 3] = [
    GlesVersion::new(3, 2),
    GlesVersion::new(3, 1),
    GlesVersion::new(3, 0),
];

/// Non-zero value returned by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("GL error 0x{0:04X}")]
pub struct GlError(pub u32);

/// Client-API half of the platform. Every call applies to the context that
/// is current on the calling thread.
pub trait GlesApi {
    /// `glGetString(GL_VERSION)`.
    fn version_string(&mut self) -> Option<String>;

    /// `glGetIntegerv(GL_MAJOR_VERSION / GL_MINOR_VERSION)`.
    fn context_version(&mut self) -> GlesVersion;

    /// Resolve the extended function table through the window system.
    fn load_functions(&mut self);

    /// `glEnable(GL_FRAMEBUFFER_SRGB)` followed by `glGetError`.
    fn enable_framebuffer_srgb(&mut self) -> Result<(), GlError>;

    /// Whether `glDebugMessageCallback` resolved.
    fn supports_debug_output(&mut self) -> bool;

    /// Enable `GL_DEBUG_OUTPUT_SYNCHRONOUS` and route driver messages into
    /// `sink`. The platform keeps the sink alive for as long as the callback
    /// stays registered.
    fn enable_debug_output(&mut self, sink: Box<dyn DebugMessageSink>) -> Result<(), GlError>;
}
