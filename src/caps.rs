//!
//! Device capability descriptor reported to the device layer.
//!

use crate::platform::GlesVersion;

/// Rendering backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderDeviceType {
    /// Nothing reported yet.
    #[default]
    Undefined,
    /// OpenGL ES backend.
    Gles,
}

/// Capabilities derived from what context negotiation achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCaps {
    /// Backend family.
    pub dev_type: RenderDeviceType,
    /// Negotiated (or, when attached, queried) API version.
    pub version: GlesVersion,
}

impl DeviceCaps {
    /// Descriptor for a GLES device of the given version.
    #[must_use]
    pub const fn gles(version: GlesVersion) -> Self {
        Self {
            dev_type: RenderDeviceType::Gles,
            version,
        }
    }

    /// Major API version.
    #[must_use]
    pub const fn major_version(&self) -> u32 {
        self.version.major
    }

    /// Minor API version.
    #[must_use]
    pub const fn minor_version(&self) -> u32 {
        self.version.minor
    }
}
