//! OpenGL ES context lifecycle management over EGL.
//!
//! The host owns the native window and calls into [`ContextManager`] at
//! lifecycle edges (create, suspend, resume, destroy) and once per frame to
//! present. Surface loss and context loss are recovered internally; only
//! conditions where no GLES context can exist at all surface as
//! [`ContextError`].
//!
//! Drivers plug in through [`platform::Platform`]. `SimulatedPlatform` is
//! always available; `AndroidPlatform` is built for Android targets.

pub mod caps;
pub mod config;
pub mod context;
pub mod debug;
pub mod error;
pub mod platform;

pub use caps::{DeviceCaps, RenderDeviceType};
pub use config::{ContextConfig, ContextCreateInfo, SwapChainDesc};
pub use context::{ContextManager, ContextState, ScreenSize, SwapIntervalBounds};
pub use debug::{DebugMessageSink, LogSink};
pub use error::{ContextError, Result};
pub use platform::{EglStatus, GlesVersion, NativeWindow, Platform};
