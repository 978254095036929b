//!
//! Fatal context errors.
//!
//! Only conditions the host cannot recover from are reported as errors:
//! no display server, no usable pixel format, no creatable context. Surface
//! and context loss during present or resume are handled internally by the
//! context manager and show up in the log, never here.
//!

use crate::platform::{EglStatus, GlesVersion};

/// Unrecoverable failure while establishing a rendering context.
///
/// Every variant means the platform cannot provide a usable GLES context
/// and rendering must not continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("No EGL display found")]
    NoDisplay,

    #[error("Failed to initialise EGL: {0}")]
    DisplayInitFailed(EglStatus),

    #[error("Failed to choose {depth_bits}-bit depth config: {status}")]
    ChooseConfigFailed { depth_bits: u8, status: EglStatus },

    #[error("Unable to retrieve EGL config")]
    NoMatchingConfig,

    #[error("Failed to create EGLSurface: {0}")]
    SurfaceCreationFailed(EglStatus),

    #[error("Failed to create EGLContext (tried {})", format_versions(.attempted))]
    ContextCreationFailed { attempted: Vec<GlesVersion> },

    #[error("Unable to eglMakeCurrent: {0}")]
    MakeCurrentFailed(EglStatus),

    #[error("Failed to attach to EGLContext: no active context")]
    NoCurrentContext,
}

fn format_versions(versions: &[GlesVersion]) -> String {
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;
