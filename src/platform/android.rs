//!
//! Android backend: EGL through `khronos-egl`, window buffers through
//! `ndk-sys`, GL entry points through `gl`.
//!

use std::ffi::{c_void, CStr};
use std::ptr;

use khronos_egl as egl;

use super::egl::{
    ConfigAttrib, ConfigHandle, ConfigRequest, ContextHandle, DisplayHandle, EglApi, EglStatus,
    NativeWindow, SurfaceAttrib, SurfaceHandle,
};
use super::gles::{GlError, GlesApi, GlesVersion};
use crate::debug::{dispatch_raw, DebugMessageSink};

/// `EGL_CONTEXT_MAJOR_VERSION` (EGL 1.5 / `EGL_KHR_create_context`).
const CONTEXT_MAJOR_VERSION: egl::Int = 0x3098;
/// `EGL_CONTEXT_MINOR_VERSION` (EGL 1.5 / `EGL_KHR_create_context`).
const CONTEXT_MINOR_VERSION: egl::Int = 0x30FB;

/// EGL + GLES driver on an Android device.
pub struct AndroidPlatform {
    egl: egl::Instance<egl::Static>,
    /// Double boxed so the callback user pointer is thin. Kept for as long
    /// as the callback may fire.
    debug_sink: Option<Box<Box<dyn DebugMessageSink>>>,
}

impl Default for AndroidPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AndroidPlatform {
    /// Use the system `libEGL`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            egl: egl::Instance::new(egl::Static),
            debug_sink: None,
        }
    }
}

fn status(err: egl::Error) -> EglStatus {
    EglStatus(err.native())
}

fn display_of(handle: DisplayHandle) -> egl::Display {
    // SAFETY: handles only ever come from `get_display` below.
    unsafe { egl::Display::from_ptr(handle.as_raw() as egl::EGLDisplay) }
}

fn config_of(handle: ConfigHandle) -> egl::Config {
    // SAFETY: handles only ever come from `choose_config` below.
    unsafe { egl::Config::from_ptr(handle.as_raw() as egl::EGLConfig) }
}

fn surface_of(handle: SurfaceHandle) -> egl::Surface {
    // SAFETY: handles only ever come from `create_window_surface` below.
    unsafe { egl::Surface::from_ptr(handle.as_raw() as egl::EGLSurface) }
}

fn context_of(handle: ContextHandle) -> egl::Context {
    // SAFETY: handles come from `create_context` or `current_context`.
    unsafe { egl::Context::from_ptr(handle.as_raw() as egl::EGLContext) }
}

impl EglApi for AndroidPlatform {
    fn get_display(&mut self) -> Option<DisplayHandle> {
        // SAFETY: EGL_DEFAULT_DISPLAY is always a valid native display id.
        let display = unsafe { self.egl.get_display(egl::DEFAULT_DISPLAY) }?;
        DisplayHandle::from_raw(display.as_ptr() as usize)
    }

    fn initialize(&mut self, display: DisplayHandle) -> Result<(), EglStatus> {
        let (major, minor) = self.egl.initialize(display_of(display)).map_err(status)?;
        log::debug!("EGL {}.{} initialized", major, minor);
        Ok(())
    }

    fn choose_config(
        &mut self,
        display: DisplayHandle,
        request: &ConfigRequest,
    ) -> Result<Option<ConfigHandle>, EglStatus> {
        let color = egl::Int::from(request.color_bits);
        let attribs = [
            egl::SURFACE_TYPE,
            egl::WINDOW_BIT,
            egl::RENDERABLE_TYPE,
            egl::OPENGL_ES2_BIT,
            egl::RED_SIZE,
            color,
            egl::GREEN_SIZE,
            color,
            egl::BLUE_SIZE,
            color,
            egl::ALPHA_SIZE,
            color,
            egl::DEPTH_SIZE,
            egl::Int::from(request.depth_bits),
            egl::NONE,
        ];

        let config = self
            .egl
            .choose_first_config(display_of(display), &attribs)
            .map_err(status)?;
        Ok(config.and_then(|config| ConfigHandle::from_raw(config.as_ptr() as usize)))
    }

    fn config_attrib(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        attrib: ConfigAttrib,
    ) -> Result<i32, EglStatus> {
        let attrib = match attrib {
            ConfigAttrib::NativeVisualId => egl::NATIVE_VISUAL_ID,
            ConfigAttrib::MinSwapInterval => egl::MIN_SWAP_INTERVAL,
            ConfigAttrib::MaxSwapInterval => egl::MAX_SWAP_INTERVAL,
        };
        self.egl
            .get_config_attrib(display_of(display), config_of(config), attrib)
            .map_err(status)
    }

    fn set_buffers_geometry(&mut self, window: NativeWindow, format: i32) {
        // SAFETY: the host guarantees the window outlives every surface
        // created on it.
        let result = unsafe {
            ndk_sys::ANativeWindow_setBuffersGeometry(
                window.as_ptr().cast::<ndk_sys::ANativeWindow>(),
                0,
                0,
                format,
            )
        };
        if result != 0 {
            log::warn!("ANativeWindow_setBuffersGeometry failed: {}", result);
        }
    }

    fn create_window_surface(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        window: NativeWindow,
    ) -> Result<SurfaceHandle, EglStatus> {
        // SAFETY: see `set_buffers_geometry`.
        let surface = unsafe {
            self.egl.create_window_surface(
                display_of(display),
                config_of(config),
                window.as_ptr() as egl::NativeWindowType,
                None,
            )
        }
        .map_err(status)?;
        SurfaceHandle::from_raw(surface.as_ptr() as usize).ok_or(EglStatus::BAD_SURFACE)
    }

    fn query_surface(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
        attrib: SurfaceAttrib,
    ) -> Result<i32, EglStatus> {
        let attrib = match attrib {
            SurfaceAttrib::Width => egl::WIDTH,
            SurfaceAttrib::Height => egl::HEIGHT,
        };
        self.egl
            .query_surface(display_of(display), surface_of(surface), attrib)
            .map_err(status)
    }

    fn create_context(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        version: GlesVersion,
    ) -> Result<ContextHandle, EglStatus> {
        let (Ok(major), Ok(minor)) = (
            egl::Int::try_from(version.major),
            egl::Int::try_from(version.minor),
        ) else {
            return Err(EglStatus::BAD_ATTRIBUTE);
        };
        let attribs = [
            CONTEXT_MAJOR_VERSION,
            major,
            CONTEXT_MINOR_VERSION,
            minor,
            egl::NONE,
        ];
        let context = self
            .egl
            .create_context(display_of(display), config_of(config), None, &attribs)
            .map_err(status)?;
        ContextHandle::from_raw(context.as_ptr() as usize).ok_or(EglStatus::BAD_CONTEXT)
    }

    fn make_current(
        &mut self,
        display: DisplayHandle,
        surface: Option<SurfaceHandle>,
        context: Option<ContextHandle>,
    ) -> Result<(), EglStatus> {
        let surface = surface.map(surface_of);
        self.egl
            .make_current(display_of(display), surface, surface, context.map(context_of))
            .map_err(status)
    }

    fn current_context(&mut self) -> Option<ContextHandle> {
        let context = self.egl.get_current_context()?;
        ContextHandle::from_raw(context.as_ptr() as usize)
    }

    fn swap_interval(&mut self, display: DisplayHandle, interval: i32) -> Result<(), EglStatus> {
        self.egl
            .swap_interval(display_of(display), interval)
            .map_err(status)
    }

    fn swap_buffers(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
    ) -> Result<(), EglStatus> {
        self.egl
            .swap_buffers(display_of(display), surface_of(surface))
            .map_err(status)
    }

    fn destroy_surface(&mut self, display: DisplayHandle, surface: SurfaceHandle) {
        if let Err(err) = self
            .egl
            .destroy_surface(display_of(display), surface_of(surface))
        {
            log::debug!("eglDestroySurface failed: {}", status(err));
        }
    }

    fn destroy_context(&mut self, display: DisplayHandle, context: ContextHandle) {
        if let Err(err) = self
            .egl
            .destroy_context(display_of(display), context_of(context))
        {
            log::debug!("eglDestroyContext failed: {}", status(err));
        }
    }

    fn terminate(&mut self, display: DisplayHandle) {
        if let Err(err) = self.egl.terminate(display_of(display)) {
            log::debug!("eglTerminate failed: {}", status(err));
        }
    }
}

fn gl_error() -> Result<(), GlError> {
    // SAFETY: only called with a current context.
    match unsafe { gl::GetError() } {
        gl::NO_ERROR => Ok(()),
        code => Err(GlError(code)),
    }
}

extern "system" fn debug_callback(
    source: gl::types::GLenum,
    ty: gl::types::GLenum,
    id: gl::types::GLuint,
    severity: gl::types::GLenum,
    length: gl::types::GLsizei,
    message: *const gl::types::GLchar,
    user_param: *mut c_void,
) {
    if user_param.is_null() || message.is_null() {
        return;
    }

    // SAFETY: the driver hands back the pointer registered in
    // `enable_debug_output`, which stays boxed in the platform while the
    // context lives. `message` holds `length` bytes, or is NUL terminated
    // when `length` is negative.
    let (sink, text) = unsafe {
        let sink = &*(user_param as *const Box<dyn DebugMessageSink>);
        let text = match usize::try_from(length) {
            Ok(len) => String::from_utf8_lossy(std::slice::from_raw_parts(message.cast::<u8>(), len)),
            Err(_) => CStr::from_ptr(message).to_string_lossy(),
        };
        (sink, text)
    };

    dispatch_raw(sink.as_ref(), source, ty, id, severity, &text);
}

impl GlesApi for AndroidPlatform {
    fn version_string(&mut self) -> Option<String> {
        // SAFETY: GetString returns a static NUL-terminated string or null.
        unsafe {
            let version = gl::GetString(gl::VERSION);
            if version.is_null() {
                return None;
            }
            Some(
                CStr::from_ptr(version.cast())
                    .to_string_lossy()
                    .into_owned(),
            )
        }
    }

    fn context_version(&mut self) -> GlesVersion {
        let mut major: gl::types::GLint = 0;
        let mut minor: gl::types::GLint = 0;
        // SAFETY: plain integer queries on the current context.
        unsafe {
            gl::GetIntegerv(gl::MAJOR_VERSION, &mut major);
            gl::GetIntegerv(gl::MINOR_VERSION, &mut minor);
        }
        GlesVersion::new(
            u32::try_from(major).unwrap_or(0),
            u32::try_from(minor).unwrap_or(0),
        )
    }

    fn load_functions(&mut self) {
        let egl = &self.egl;
        gl::load_with(|name| {
            egl.get_proc_address(name)
                .map_or(ptr::null(), |f| f as *const c_void)
        });
    }

    fn enable_framebuffer_srgb(&mut self) -> Result<(), GlError> {
        // SAFETY: functions are loaded and a context is current.
        unsafe { gl::Enable(gl::FRAMEBUFFER_SRGB) };
        gl_error()
    }

    fn supports_debug_output(&mut self) -> bool {
        gl::DebugMessageCallback::is_loaded()
    }

    fn enable_debug_output(&mut self, sink: Box<dyn DebugMessageSink>) -> Result<(), GlError> {
        let sink = Box::new(sink);
        let user_param = ptr::addr_of!(*sink).cast::<c_void>();

        // SAFETY: `user_param` points into the box stored below, which is
        // never moved or dropped while the platform is alive.
        unsafe {
            gl::Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS);
            gl::DebugMessageCallback(Some(debug_callback), user_param);
        }
        self.debug_sink = Some(sink);
        gl_error()
    }
}
