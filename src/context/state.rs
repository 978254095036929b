//!
//! Lifecycle state of a GL context manager.
//!
//! Each state carries exactly the native handles that exist in it, so an
//! impossible combination such as a surface without a display, or a context
//! that was never negotiated while a surface is live, cannot be expressed.
//!

use std::fmt;

use crate::platform::{
    ConfigHandle, ContextHandle, DisplayHandle, NativeWindow, SurfaceHandle,
};

/// Range of swap intervals a config supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapIntervalBounds {
    /// `EGL_MIN_SWAP_INTERVAL`.
    pub min: i32,
    /// `EGL_MAX_SWAP_INTERVAL`.
    pub max: i32,
}

impl SwapIntervalBounds {
    /// Create bounds.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Clamp a requested interval into the range. The lower bound is applied
    /// first, so a driver reporting `min > max` yields `max`, never a panic.
    #[must_use]
    pub fn clamp(self, requested: i32) -> i32 {
        requested.max(self.min).min(self.max)
    }
}

impl Default for SwapIntervalBounds {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

/// Pixel format chosen for the display, with the attributes queried once
/// at selection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSelection {
    pub config: ConfigHandle,
    pub color_bits: u8,
    pub depth_bits: u8,
    /// Native pixel format applied to window buffers.
    pub native_visual_id: i32,
    pub swap_interval: SwapIntervalBounds,
}

/// Initialized display connection together with its chosen config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EglBinding {
    pub display: DisplayHandle,
    pub selection: ConfigSelection,
}

/// Everything needed to draw: display, config, surface, context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveBinding {
    pub egl: EglBinding,
    /// Window the surface is bound to.
    pub window: NativeWindow,
    pub surface: SurfaceHandle,
    pub context: ContextHandle,
}

impl LiveBinding {
    /// Drop the surface, keeping the context.
    #[must_use]
    pub const fn without_surface(self) -> SurfacelessBinding {
        SurfacelessBinding {
            egl: self.egl,
            context: self.context,
        }
    }
}

/// A live context whose surface is gone (suspended, or lost and not yet
/// recreated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfacelessBinding {
    pub egl: EglBinding,
    pub context: ContextHandle,
}

impl SurfacelessBinding {
    /// Attach a freshly created surface.
    #[must_use]
    pub const fn with_surface(self, window: NativeWindow, surface: SurfaceHandle) -> LiveBinding {
        LiveBinding {
            egl: self.egl,
            window,
            surface,
            context: self.context,
        }
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextState {
    /// Never initialized, or invalidated. The next init or resume starts
    /// from scratch.
    #[default]
    Uninitialized,
    /// Using a context created and owned by someone else.
    Attached,
    /// Surface and context are both live; frames can be presented.
    Live(LiveBinding),
    /// Context alive, no surface.
    SurfaceLost(SurfacelessBinding),
    /// The driver reported context loss and renegotiation has not (yet)
    /// succeeded. No handles are held.
    ContextLost,
    /// Explicitly terminated. No handles are held, but the manager still
    /// counts as initialized: resume rebuilds everything.
    Terminated,
}

impl ContextState {
    /// Short name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Attached => "Attached",
            Self::Live(_) => "Live",
            Self::SurfaceLost(_) => "SurfaceLost",
            Self::ContextLost => "ContextLost",
            Self::Terminated => "Terminated",
        }
    }

    /// Whether init has completed since the last invalidate.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    /// Whether a usable context exists.
    #[must_use]
    pub const fn is_context_valid(&self) -> bool {
        matches!(self, Self::Attached | Self::Live(_) | Self::SurfaceLost(_))
    }

    /// Whether display, surface and context are all live.
    #[must_use]
    pub const fn is_drawable(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Display connection, if one is held.
    #[must_use]
    pub const fn display(&self) -> Option<DisplayHandle> {
        match self.egl() {
            Some(egl) => Some(egl.display),
            None => None,
        }
    }

    /// Display binding, if one is held.
    #[must_use]
    pub const fn egl(&self) -> Option<EglBinding> {
        match self {
            Self::Live(live) => Some(live.egl),
            Self::SurfaceLost(binding) => Some(binding.egl),
            _ => None,
        }
    }

    /// Drawing surface, if one is live.
    #[must_use]
    pub const fn surface(&self) -> Option<SurfaceHandle> {
        match self {
            Self::Live(live) => Some(live.surface),
            _ => None,
        }
    }

    /// Owned context, if one is live.
    #[must_use]
    pub const fn context(&self) -> Option<ContextHandle> {
        match self {
            Self::Live(live) => Some(live.context),
            Self::SurfaceLost(binding) => Some(binding.context),
            _ => None,
        }
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Surface dimensions in pixels, as reported by `eglQuerySurface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    /// Create a size.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> SurfacelessBinding {
        SurfacelessBinding {
            egl: EglBinding {
                display: DisplayHandle::from_raw(1).unwrap(),
                selection: ConfigSelection {
                    config: ConfigHandle::from_raw(2).unwrap(),
                    color_bits: 8,
                    depth_bits: 24,
                    native_visual_id: 1,
                    swap_interval: SwapIntervalBounds::new(0, 1),
                },
            },
            context: ContextHandle::from_raw(3).unwrap(),
        }
    }

    #[test]
    fn test_clamp_within_and_outside_bounds() {
        let bounds = SwapIntervalBounds::new(1, 4);
        assert_eq!(bounds.clamp(0), 1);
        assert_eq!(bounds.clamp(2), 2);
        assert_eq!(bounds.clamp(9), 4);
        assert_eq!(bounds.clamp(-3), 1);
    }

    #[test]
    fn test_clamp_inverted_bounds_does_not_panic() {
        assert_eq!(SwapIntervalBounds::new(3, 1).clamp(2), 1);
    }

    #[test]
    fn test_uninitialized_state() {
        let state = ContextState::default();
        assert!(!state.is_initialized());
        assert!(!state.is_context_valid());
        assert!(state.display().is_none());
        assert!(state.surface().is_none());
        assert!(state.context().is_none());
    }

    #[test]
    fn test_surface_lost_keeps_context() {
        let state = ContextState::SurfaceLost(binding());
        assert!(state.is_context_valid());
        assert!(!state.is_drawable());
        assert!(state.surface().is_none());
        assert_eq!(state.context(), ContextHandle::from_raw(3));
        assert_eq!(state.display(), DisplayHandle::from_raw(1));
    }

    #[test]
    fn test_live_round_trip_through_surfaceless() {
        let window = NativeWindow::new(0x1000 as *mut libc::c_void).unwrap();
        let surface = SurfaceHandle::from_raw(9).unwrap();
        let live = binding().with_surface(window, surface);
        let state = ContextState::Live(live);
        assert!(state.is_drawable());
        assert_eq!(state.surface(), Some(surface));
        assert_eq!(live.without_surface(), binding());
    }

    #[test]
    fn test_lost_and_terminated_hold_nothing() {
        for state in [ContextState::ContextLost, ContextState::Terminated] {
            assert!(state.is_initialized());
            assert!(!state.is_context_valid());
            assert!(state.display().is_none());
            assert!(state.context().is_none());
        }
        assert!(ContextState::Attached.is_context_valid());
        assert!(ContextState::Attached.display().is_none());
    }
}
