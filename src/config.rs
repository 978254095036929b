use anyhow::{bail, Context, Result};

use crate::debug::{DebugMessageSink, LogSink};
use crate::platform::{ConfigRequest, GlesVersion, NativeWindow, GLES_VERSION_CANDIDATES};

/// Context creation preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Bits per color channel (RGBA).
    pub color_bits: u8,
    /// Preferred depth buffer bits.
    pub depth_bits: u8,
    /// Depth buffer bits for the single relaxed retry.
    pub fallback_depth_bits: u8,
    /// Context versions to try, newest first.
    versions: Vec<GlesVersion>,
    /// Enable `GL_FRAMEBUFFER_SRGB` once the context is up.
    pub srgb_framebuffer: bool,
    /// Register the driver debug-message callback when available.
    pub debug_output: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            color_bits: 8,
            depth_bits: 24,
            fallback_depth_bits: 16,
            versions: GLES_VERSION_CANDIDATES.to_vec(),
            srgb_framebuffer: true,
            debug_output: true,
        }
    }
}

impl ContextConfig {
    /// Replace the version candidates. The list must be non-empty and
    /// strictly descending.
    pub fn with_versions(mut self, versions: Vec<GlesVersion>) -> Result<Self> {
        if versions.is_empty() {
            bail!("At least one GLES version candidate is required");
        }
        if let Some(pair) = versions.windows(2).find(|pair| pair[0] <= pair[1]) {
            bail!(
                "GLES version candidates must be strictly descending ({} is followed by {})",
                pair[0],
                pair[1]
            );
        }
        self.versions = versions;
        Ok(self)
    }

    /// Set the depth buffer sizes (preferred, fallback).
    #[must_use]
    pub const fn with_depth_bits(mut self, preferred: u8, fallback: u8) -> Self {
        self.depth_bits = preferred;
        self.fallback_depth_bits = fallback;
        self
    }

    /// Enable or disable the sRGB framebuffer toggle.
    #[must_use]
    pub const fn with_srgb_framebuffer(mut self, enabled: bool) -> Self {
        self.srgb_framebuffer = enabled;
        self
    }

    /// Enable or disable driver debug output.
    #[must_use]
    pub const fn with_debug_output(mut self, enabled: bool) -> Self {
        self.debug_output = enabled;
        self
    }

    /// Version candidates, newest first.
    #[must_use]
    pub fn versions(&self) -> &[GlesVersion] {
        &self.versions
    }

    /// The preferred config request.
    #[must_use]
    pub const fn preferred_request(&self) -> ConfigRequest {
        ConfigRequest::new(self.color_bits, self.depth_bits)
    }

    /// The relaxed config request used when nothing matches the preferred one.
    #[must_use]
    pub const fn fallback_request(&self) -> ConfigRequest {
        ConfigRequest::new(self.color_bits, self.fallback_depth_bits)
    }
}

/// Swap chain description handed down by the device layer.
///
/// Only logged; surface geometry always comes from the native window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub buffer_count: u32,
    pub srgb: bool,
}

impl Default for SwapChainDesc {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            buffer_count: 2,
            srgb: true,
        }
    }
}

/// Construction parameters for a context manager.
pub struct ContextCreateInfo {
    /// Window to render into. `None` attaches to the context that is already
    /// current on this thread.
    pub window: Option<NativeWindow>,
    pub config: ContextConfig,
    pub swap_chain: Option<SwapChainDesc>,
    /// Receiver for driver debug messages.
    pub debug_sink: Box<dyn DebugMessageSink>,
}

impl ContextCreateInfo {
    /// Render into `window` with default settings.
    #[must_use]
    pub fn for_window(window: NativeWindow) -> Self {
        Self {
            window: Some(window),
            ..Self::default()
        }
    }

    /// Attach to the externally created context current on this thread.
    #[must_use]
    pub fn attach_current() -> Self {
        Self::default()
    }
}

impl Default for ContextCreateInfo {
    fn default() -> Self {
        Self {
            window: None,
            config: ContextConfig::default(),
            swap_chain: None,
            debug_sink: Box::new(LogSink),
        }
    }
}

/// Parse a version string in the format "MAJOR.MINOR"
pub fn parse_version(s: &str) -> Result<GlesVersion> {
    let (major, minor) = s
        .trim()
        .split_once('.')
        .context("GLES version must be in MAJOR.MINOR format")?;

    let major: u32 = major.parse().context("Invalid major version")?;
    let minor: u32 = minor.parse().context("Invalid minor version")?;

    if major == 0 {
        bail!("GLES major version must be positive");
    }

    Ok(GlesVersion::new(major, minor))
}

/// Parse a comma-separated candidate list such as "3.2,3.1,3.0"
pub fn parse_version_list(s: &str) -> Result<Vec<GlesVersion>> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_version(part).with_context(|| format!("Bad candidate '{}'", part.trim())))
        .collect()
}
