//!
//! EGL-side types and the window-system half of the platform seam.
//!
//! Handles are opaque non-null values. The "no display / no surface / no
//! context" sentinels of the native API are modelled as `None` wherever a
//! handle may be absent, so a present handle is always a real one.
//!

use std::fmt;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

macro_rules! egl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(NonZeroUsize);

        impl $name {
            /// Wrap a raw native handle value. Returns `None` for the null sentinel.
            #[must_use]
            pub const fn from_raw(raw: usize) -> Option<Self> {
                match NonZeroUsize::new(raw) {
                    Some(value) => Some(Self(value)),
                    None => None,
                }
            }

            /// Raw native handle value.
            #[must_use]
            pub const fn as_raw(self) -> usize {
                self.0.get()
            }
        }
    };
}

egl_handle!(
    /// Connection to the platform display server (`EGLDisplay`).
    DisplayHandle
);
egl_handle!(
    /// Chosen framebuffer configuration (`EGLConfig`).
    ConfigHandle
);
egl_handle!(
    /// On-screen drawing surface bound to a native window (`EGLSurface`).
    SurfaceHandle
);
egl_handle!(
    /// Rendering context (`EGLContext`).
    ContextHandle
);

/// Native window supplied by the host (`ANativeWindow*` on Android).
///
/// The window is owned by the windowing toolkit; this is a borrowed pointer
/// and is never dereferenced by the context manager itself. Because it wraps
/// a raw pointer the type is neither `Send` nor `Sync`, which keeps the
/// manager on the thread that owns the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeWindow(NonNull<libc::c_void>);

impl NativeWindow {
    /// Wrap a native window pointer. Returns `None` for null.
    #[must_use]
    pub fn new(ptr: *mut libc::c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// The raw window pointer.
    #[must_use]
    pub fn as_ptr(self) -> *mut libc::c_void {
        self.0.as_ptr()
    }
}

/// EGL error code as returned by `eglGetError`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EglStatus(pub i32);

impl EglStatus {
    pub const SUCCESS: Self = Self(0x3000);
    pub const NOT_INITIALIZED: Self = Self(0x3001);
    pub const BAD_ACCESS: Self = Self(0x3002);
    pub const BAD_ALLOC: Self = Self(0x3003);
    pub const BAD_ATTRIBUTE: Self = Self(0x3004);
    pub const BAD_CONFIG: Self = Self(0x3005);
    pub const BAD_CONTEXT: Self = Self(0x3006);
    pub const BAD_CURRENT_SURFACE: Self = Self(0x3007);
    pub const BAD_DISPLAY: Self = Self(0x3008);
    pub const BAD_MATCH: Self = Self(0x3009);
    pub const BAD_NATIVE_PIXMAP: Self = Self(0x300A);
    pub const BAD_NATIVE_WINDOW: Self = Self(0x300B);
    pub const BAD_PARAMETER: Self = Self(0x300C);
    pub const BAD_SURFACE: Self = Self(0x300D);
    pub const CONTEXT_LOST: Self = Self(0x300E);

    /// Symbolic EGL name of the code, if it is a known one.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0x3000 => "EGL_SUCCESS",
            0x3001 => "EGL_NOT_INITIALIZED",
            0x3002 => "EGL_BAD_ACCESS",
            0x3003 => "EGL_BAD_ALLOC",
            0x3004 => "EGL_BAD_ATTRIBUTE",
            0x3005 => "EGL_BAD_CONFIG",
            0x3006 => "EGL_BAD_CONTEXT",
            0x3007 => "EGL_BAD_CURRENT_SURFACE",
            0x3008 => "EGL_BAD_DISPLAY",
            0x3009 => "EGL_BAD_MATCH",
            0x300A => "EGL_BAD_NATIVE_PIXMAP",
            0x300B => "EGL_BAD_NATIVE_WINDOW",
            0x300C => "EGL_BAD_PARAMETER",
            0x300D => "EGL_BAD_SURFACE",
            0x300E => "EGL_CONTEXT_LOST",
            _ => return None,
        })
    }

    /// Check whether this is `EGL_SUCCESS`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// Classify a failed buffer swap.
    #[must_use]
    pub const fn swap_failure(self) -> SwapFailure {
        match self.0 {
            0x300D => SwapFailure::SurfaceLost,
            0x300E | 0x3006 => SwapFailure::ContextLost,
            _ => SwapFailure::Other,
        }
    }
}

impl fmt::Debug for EglStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for EglStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:04X})", name, self.0),
            None => write!(f, "unknown EGL error (0x{:04X})", self.0),
        }
    }
}

/// How a failed `eglSwapBuffers` affects the context manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapFailure {
    /// Only the surface became invalid; the context and GPU state survive.
    SurfaceLost,
    /// The context is gone together with every GPU-side resource.
    ContextLost,
    /// Anything else. Not treated as authoritative.
    Other,
}

/// Attribute list for `eglChooseConfig`.
///
/// The surface type is always window-drawable and the renderable type is the
/// ES2 bit (which ES3 contexts are also created from).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRequest {
    /// Bits for each of red, green, blue and alpha.
    pub color_bits: u8,
    /// Depth buffer bits.
    pub depth_bits: u8,
}

impl ConfigRequest {
    /// Create a request for the given channel and depth sizes.
    #[must_use]
    pub const fn new(color_bits: u8, depth_bits: u8) -> Self {
        Self {
            color_bits,
            depth_bits,
        }
    }
}

/// Configuration attributes queried with `eglGetConfigAttrib`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAttrib {
    /// `EGL_NATIVE_VISUAL_ID`, the pixel format accepted by the native window.
    NativeVisualId,
    /// `EGL_MIN_SWAP_INTERVAL`.
    MinSwapInterval,
    /// `EGL_MAX_SWAP_INTERVAL`.
    MaxSwapInterval,
}

/// Surface attributes queried with `eglQuerySurface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAttrib {
    /// `EGL_WIDTH`.
    Width,
    /// `EGL_HEIGHT`.
    Height,
}

/// Window-system half of the platform: display, configs, surfaces and
/// contexts.
///
/// Calls that can fail report the EGL error code that `eglGetError` returned
/// right after the failing call.
pub trait EglApi {
    /// `eglGetDisplay(EGL_DEFAULT_DISPLAY)`.
    fn get_display(&mut self) -> Option<DisplayHandle>;

    /// `eglInitialize`.
    fn initialize(&mut self, display: DisplayHandle) -> Result<(), EglStatus>;

    /// `eglChooseConfig` asking for a single config. `Ok(None)` means the call
    /// succeeded but nothing matched.
    fn choose_config(
        &mut self,
        display: DisplayHandle,
        request: &ConfigRequest,
    ) -> Result<Option<ConfigHandle>, EglStatus>;

    /// `eglGetConfigAttrib`.
    fn config_attrib(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        attrib: ConfigAttrib,
    ) -> Result<i32, EglStatus>;

    /// `ANativeWindow_setBuffersGeometry(window, 0, 0, format)`.
    fn set_buffers_geometry(&mut self, window: NativeWindow, format: i32);

    /// `eglCreateWindowSurface`.
    fn create_window_surface(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        window: NativeWindow,
    ) -> Result<SurfaceHandle, EglStatus>;

    /// `eglQuerySurface`.
    fn query_surface(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
        attrib: SurfaceAttrib,
    ) -> Result<i32, EglStatus>;

    /// `eglCreateContext` requesting the given ES version.
    fn create_context(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        version: super::GlesVersion,
    ) -> Result<ContextHandle, EglStatus>;

    /// `eglMakeCurrent` with the same surface for draw and read.
    fn make_current(
        &mut self,
        display: DisplayHandle,
        surface: Option<SurfaceHandle>,
        context: Option<ContextHandle>,
    ) -> Result<(), EglStatus>;

    /// `eglGetCurrentContext`.
    fn current_context(&mut self) -> Option<ContextHandle>;

    /// `eglSwapInterval`.
    fn swap_interval(&mut self, display: DisplayHandle, interval: i32) -> Result<(), EglStatus>;

    /// `eglSwapBuffers`.
    fn swap_buffers(&mut self, display: DisplayHandle, surface: SurfaceHandle)
        -> Result<(), EglStatus>;

    /// `eglDestroySurface`.
    fn destroy_surface(&mut self, display: DisplayHandle, surface: SurfaceHandle);

    /// `eglDestroyContext`.
    fn destroy_context(&mut self, display: DisplayHandle, context: ContextHandle);

    /// `eglTerminate`.
    fn terminate(&mut self, display: DisplayHandle);
}
