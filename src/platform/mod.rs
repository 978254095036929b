//!
//! Platform seam between the context manager and the native driver.
//!
//! The context manager never talks to EGL or GL directly. Everything goes
//! through [`Platform`], which is the union of the window-system calls
//! ([`EglApi`]) and the few client-API calls needed for one-time setup
//! ([`GlesApi`]).
//!
//! # Backends
//!
//! - `android`: EGL + `ANativeWindow` + GL, built only for Android targets
//! - `simulated`: scriptable in-memory driver for tests and headless hosts

#[cfg(target_os = "android")]
pub mod android;
pub mod egl;
pub mod gles;
pub mod simulated;

pub use egl::{
    ConfigAttrib, ConfigHandle, ConfigRequest, ContextHandle, DisplayHandle, EglApi, EglStatus,
    NativeWindow, SurfaceAttrib, SurfaceHandle, SwapFailure,
};
pub use gles::{GlError, GlesApi, GlesVersion, GLES_VERSION_CANDIDATES};
pub use simulated::{SimCall, SimulatedPlatform};

#[cfg(target_os = "android")]
pub use android::AndroidPlatform;

/// A complete driver: window system plus client API.
pub trait Platform: EglApi + GlesApi {}

impl<T: EglApi + GlesApi> Platform for T {}
