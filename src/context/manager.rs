//!
//! GL context manager.
//!
//! Owns the display connection, chosen config, window surface and rendering
//! context, and keeps them usable while the OS revokes the window surface
//! (backgrounding, rotation) or the driver loses the context outright.
//!
//! All calls must come from the thread that owns the native window. Nothing
//! here blocks or spawns; every operation completes before returning.
//!

use crate::caps::DeviceCaps;
use crate::config::{ContextConfig, ContextCreateInfo, SwapChainDesc};
use crate::debug::{DebugMessageSink, LogSink};
use crate::error::{ContextError, Result};
use crate::platform::{
    ConfigAttrib, ConfigHandle, ConfigRequest, ContextHandle, DisplayHandle, EglStatus,
    GlesVersion, NativeWindow, Platform, SurfaceAttrib, SurfaceHandle, SwapFailure,
};

use super::state::{
    ConfigSelection, ContextState, EglBinding, LiveBinding, ScreenSize, SurfacelessBinding,
    SwapIntervalBounds,
};

/// Lifecycle manager for one GLES context.
pub struct ContextManager<P: Platform> {
    platform: P,
    config: ContextConfig,
    state: ContextState,
    version: GlesVersion,
    screen_size: ScreenSize,
    /// GL entry points resolved. Every GL call requires this.
    functions_loaded: bool,
    /// One-time GPU-side setup (sRGB, debug output) done.
    gles_ready: bool,
    /// Handed to the platform on first GPU-side setup.
    debug_sink: Option<Box<dyn DebugMessageSink>>,
}

impl<P: Platform> ContextManager<P> {
    /// Create a manager and initialize it for `info.window`, writing the
    /// negotiated capabilities into `caps`.
    pub fn new(platform: P, info: ContextCreateInfo, caps: &mut DeviceCaps) -> Result<Self> {
        let ContextCreateInfo {
            window,
            config,
            swap_chain,
            debug_sink,
        } = info;

        if let Some(desc) = swap_chain {
            log_swap_chain(&desc);
        }

        let mut manager = Self::from_config(platform, config).with_debug_sink(debug_sink);
        manager.init(window)?;
        manager.fill_device_caps(caps);
        Ok(manager)
    }

    /// Create a manager without initializing it. The first `init` or
    /// `resume` brings it up.
    #[must_use]
    pub fn from_config(platform: P, config: ContextConfig) -> Self {
        Self {
            platform,
            config,
            state: ContextState::Uninitialized,
            version: GlesVersion::NONE,
            screen_size: ScreenSize::default(),
            functions_loaded: false,
            gles_ready: false,
            debug_sink: Some(Box::new(LogSink)),
        }
    }

    /// Route driver debug messages into `sink` instead of the log.
    ///
    /// The sink is registered during the one-time GPU setup of the first
    /// successful init. A sink supplied after that is dropped unregistered.
    #[must_use]
    pub fn with_debug_sink(mut self, sink: Box<dyn DebugMessageSink>) -> Self {
        if self.gles_ready {
            log::debug!("Debug output is already configured; the new sink is not registered");
            return self;
        }
        self.debug_sink = Some(sink);
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContextState {
        self.state
    }

    /// Whether init has run since construction or the last invalidate.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    /// Whether a usable context exists (it may still lack a surface).
    #[must_use]
    pub const fn is_context_valid(&self) -> bool {
        self.state.is_context_valid()
    }

    /// Negotiated API version, or `0.0` before the first negotiation.
    #[must_use]
    pub const fn version(&self) -> GlesVersion {
        self.version
    }

    /// Capability descriptor for the device layer.
    #[must_use]
    pub const fn device_caps(&self) -> DeviceCaps {
        DeviceCaps::gles(self.version)
    }

    /// Write the capability descriptor into `caps`.
    pub fn fill_device_caps(&self, caps: &mut DeviceCaps) {
        *caps = self.device_caps();
    }

    /// Cached surface size.
    #[must_use]
    pub const fn screen_size(&self) -> ScreenSize {
        self.screen_size
    }

    /// The config chosen for the current display, if one is held.
    #[must_use]
    pub fn config_selection(&self) -> Option<ConfigSelection> {
        self.state.egl().map(|egl| egl.selection)
    }

    /// Creation preferences.
    #[must_use]
    pub const fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The context current on this thread (`eglGetCurrentContext`), which
    /// is the owned one while drawable, or the external one when attached.
    pub fn current_native_context(&mut self) -> Option<ContextHandle> {
        self.platform.current_context()
    }

    /// The underlying platform.
    #[must_use]
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// The underlying platform, mutably.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Bring the context up.
    ///
    /// With a window, a display connection, config, surface and context are
    /// created and made current. Without one, the context already current on
    /// this thread is adopted. Calling `init` on an initialized manager is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Any [`ContextError`] means the platform cannot provide a GLES context.
    /// The manager is left uninitialized with nothing held.
    pub fn init(&mut self, window: Option<NativeWindow>) -> Result<()> {
        if self.state.is_initialized() {
            return Ok(());
        }

        let next = match window {
            Some(window) => self.init_owned(window).map(ContextState::Live),
            None => self.attach_current().map(|()| ContextState::Attached),
        }
        .map_err(log_fatal)?;

        self.transition(next);
        self.init_gles();
        Ok(())
    }

    /// Present the back buffer with the requested swap interval, clamped to
    /// what the config supports.
    ///
    /// Without a surface (after [`suspend`](Self::suspend), for example) this
    /// logs a warning and does nothing. Surface loss and context loss are
    /// recovered here; no error ever leaves this function.
    pub fn present(&mut self, swap_interval: i32) {
        let ContextState::Live(live) = self.state else {
            log::warn!(
                "No EGL surface when swapping buffers. This happens when present() is called \
                 after suspend(). The operation will be ignored."
            );
            return;
        };

        let display = live.egl.display;
        let interval = live.egl.selection.swap_interval.clamp(swap_interval);
        if let Err(status) = self.platform.swap_interval(display, interval) {
            log::debug!("eglSwapInterval({}) failed: {}", interval, status);
        }

        let Err(status) = self.platform.swap_buffers(display, live.surface) else {
            return;
        };

        match status.swap_failure() {
            SwapFailure::SurfaceLost => self.recover_surface(live),
            SwapFailure::ContextLost => self.recover_context(live, status),
            SwapFailure::Other => log::warn!("eglSwapBuffers failed: {}", status),
        }
    }

    /// Release the window surface, keeping the context and display.
    pub fn suspend(&mut self) {
        log::info!("Suspending gl context");
        match self.state {
            ContextState::Live(live) => {
                log::info!("Destroying egl surface");
                self.platform.destroy_surface(live.egl.display, live.surface);
                self.transition(ContextState::SurfaceLost(live.without_surface()));
            }
            state => log::debug!("No surface to release in state {}", state),
        }
    }

    /// Rebind to `window` after a suspend, or initialize if that never
    /// happened.
    ///
    /// Returns `EGL_SUCCESS` when the existing context could be reused, or the
    /// error code that forced a recovery (which has then already been
    /// performed). `EGL_BAD_NATIVE_WINDOW` is returned, and nothing changes,
    /// when an owned context has no surface and no window is supplied.
    ///
    /// # Errors
    ///
    /// A [`ContextError`] when a full rebuild was needed and failed. The
    /// manager then holds nothing.
    pub fn resume(&mut self, window: Option<NativeWindow>) -> Result<EglStatus> {
        log::info!("Resuming gl context");

        match self.state {
            ContextState::Uninitialized => self.init(window).map(|()| EglStatus::SUCCESS),
            ContextState::Attached => {
                if window.is_some() {
                    log::warn!("Ignoring window on resume: the context is owned externally");
                }
                if self.platform.current_context().is_none() {
                    return Err(log_fatal(ContextError::NoCurrentContext));
                }
                Ok(EglStatus::SUCCESS)
            }
            ContextState::Live(live) => match window {
                Some(window) if window != live.window => {
                    self.platform.destroy_surface(live.egl.display, live.surface);
                    self.resume_surface(live.without_surface(), window)
                }
                _ => {
                    self.update_screen_size();
                    self.resume_make_current(live)
                }
            },
            ContextState::SurfaceLost(binding) => match window {
                Some(window) => self.resume_surface(binding, window),
                None => {
                    log::warn!("Cannot recreate the EGL surface without a native window");
                    Ok(EglStatus::BAD_NATIVE_WINDOW)
                }
            },
            ContextState::ContextLost => self.rebuild(window, EglStatus::CONTEXT_LOST),
            ContextState::Terminated => self.rebuild(window, EglStatus::NOT_INITIALIZED),
        }
    }

    /// Release everything and forget that init ever ran. Always succeeds.
    pub fn invalidate(&mut self) -> bool {
        log::info!("Invalidating gl context");
        self.terminate();
        self.transition(ContextState::Uninitialized);
        true
    }

    /// Release context, surface and display connection, in that order.
    /// Calling it again is harmless.
    pub fn terminate(&mut self) {
        match self.state {
            ContextState::Uninitialized | ContextState::Terminated => {}
            ContextState::Attached | ContextState::ContextLost => {
                self.transition(ContextState::Terminated);
            }
            ContextState::Live(live) => {
                self.release(live.egl.display, Some(live.surface), Some(live.context));
                self.transition(ContextState::Terminated);
            }
            ContextState::SurfaceLost(binding) => {
                self.release(binding.egl.display, None, Some(binding.context));
                self.transition(ContextState::Terminated);
            }
        }
    }

    /// Re-query the surface size. Returns `true`, after updating the cache
    /// and logging, when it differs from the cached one.
    pub fn update_screen_size(&mut self) -> bool {
        match self.state {
            ContextState::Live(live) => self.refresh_screen_size(live.egl.display, live.surface),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Initialization steps
    // ------------------------------------------------------------------

    fn init_owned(&mut self, window: NativeWindow) -> Result<LiveBinding> {
        let egl = self.acquire_display()?;
        let display = egl.display;

        let surface = match self.create_surface(&egl, window) {
            Ok(surface) => surface,
            Err(err) => {
                self.release(display, None, None);
                return Err(err);
            }
        };
        if let Some(size) = self.query_screen_size(display, surface) {
            self.screen_size = size;
        }

        let context = match self.negotiate_context(&egl) {
            Ok(context) => context,
            Err(err) => {
                self.release(display, Some(surface), None);
                return Err(err);
            }
        };

        if let Err(status) = self
            .platform
            .make_current(display, Some(surface), Some(context))
        {
            self.release(display, Some(surface), Some(context));
            return Err(ContextError::MakeCurrentFailed(status));
        }
        self.load_functions();

        Ok(LiveBinding {
            egl,
            window,
            surface,
            context,
        })
    }

    fn acquire_display(&mut self) -> Result<EglBinding> {
        let display = self.platform.get_display().ok_or(ContextError::NoDisplay)?;
        self.platform
            .initialize(display)
            .map_err(ContextError::DisplayInitFailed)?;

        match self.choose_config(display) {
            Ok(selection) => Ok(EglBinding { display, selection }),
            Err(err) => {
                self.platform.terminate(display);
                Err(err)
            }
        }
    }

    fn choose_config(&mut self, display: DisplayHandle) -> Result<ConfigSelection> {
        let preferred = self.config.preferred_request();
        let (config, request) = match self.try_config(display, &preferred)? {
            Some(config) => (config, preferred),
            None => {
                let fallback = self.config.fallback_request();
                log::info!(
                    "No EGL config with {}-bit depth, falling back to {}-bit depth",
                    preferred.depth_bits,
                    fallback.depth_bits
                );
                let config = self
                    .try_config(display, &fallback)?
                    .ok_or(ContextError::NoMatchingConfig)?;
                (config, fallback)
            }
        };

        log::info!(
            "Chosen EGL config: {} bit color, {} bit depth",
            request.color_bits,
            request.depth_bits
        );

        let native_visual_id = self.config_attrib(display, config, ConfigAttrib::NativeVisualId, 0);
        let swap_interval = SwapIntervalBounds::new(
            self.config_attrib(display, config, ConfigAttrib::MinSwapInterval, 1),
            self.config_attrib(display, config, ConfigAttrib::MaxSwapInterval, 1),
        );

        Ok(ConfigSelection {
            config,
            color_bits: request.color_bits,
            depth_bits: request.depth_bits,
            native_visual_id,
            swap_interval,
        })
    }

    fn try_config(
        &mut self,
        display: DisplayHandle,
        request: &ConfigRequest,
    ) -> Result<Option<ConfigHandle>> {
        self.platform
            .choose_config(display, request)
            .map_err(|status| ContextError::ChooseConfigFailed {
                depth_bits: request.depth_bits,
                status,
            })
    }

    fn config_attrib(
        &mut self,
        display: DisplayHandle,
        config: ConfigHandle,
        attrib: ConfigAttrib,
        default: i32,
    ) -> i32 {
        self.platform
            .config_attrib(display, config, attrib)
            .unwrap_or_else(|status| {
                log::warn!("Failed to query {:?} ({}), using {}", attrib, status, default);
                default
            })
    }

    fn create_surface(&mut self, egl: &EglBinding, window: NativeWindow) -> Result<SurfaceHandle> {
        // The visual id is guaranteed to be accepted by the window, so its
        // buffers can be reconfigured to match before the surface exists.
        self.platform
            .set_buffers_geometry(window, egl.selection.native_visual_id);
        self.platform
            .create_window_surface(egl.display, egl.selection.config, window)
            .map_err(ContextError::SurfaceCreationFailed)
    }

    fn negotiate_context(&mut self, egl: &EglBinding) -> Result<ContextHandle> {
        let mut attempted = Vec::with_capacity(self.config.versions().len());

        for &version in self.config.versions() {
            attempted.push(version);
            match self
                .platform
                .create_context(egl.display, egl.selection.config, version)
            {
                Ok(context) => {
                    self.version = version;
                    log::info!("Created OpenGLES Context {}", version);
                    return Ok(context);
                }
                Err(status) => log::debug!("GLES {} context not available: {}", version, status),
            }
        }

        Err(ContextError::ContextCreationFailed { attempted })
    }

    fn attach_current(&mut self) -> Result<()> {
        if self.platform.current_context().is_none() {
            return Err(ContextError::NoCurrentContext);
        }
        self.load_functions();
        self.version = self.platform.context_version();
        log::info!("Attached to current OpenGLES Context {}", self.version);
        Ok(())
    }

    /// Resolve GL entry points. Runs once a context is current and before
    /// any GL query; the table stays valid for later contexts on this thread.
    fn load_functions(&mut self) {
        if self.functions_loaded {
            return;
        }
        self.platform.load_functions();
        self.functions_loaded = true;
    }

    fn init_gles(&mut self) {
        if self.gles_ready {
            return;
        }

        match self.platform.version_string() {
            Some(version) => log::info!("GL Version: {}", version),
            None => log::warn!("GL version string is not available"),
        }

        // Only writes to sRGB-format images are converted, so this stays on
        // for the lifetime of the context.
        if self.config.srgb_framebuffer {
            if let Err(err) = self.platform.enable_framebuffer_srgb() {
                log::error!("Failed to enable SRGB framebuffers: {}", err);
            }
        }

        if self.config.debug_output && self.platform.supports_debug_output() {
            if let Some(sink) = self.debug_sink.take() {
                if let Err(err) = self.platform.enable_debug_output(sink) {
                    log::error!("Failed to enable debug messages: {}", err);
                }
            }
        }

        self.gles_ready = true;
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    fn recover_surface(&mut self, live: LiveBinding) {
        log::info!("EGL surface has been lost. Attempting to recreate");
        let display = live.egl.display;
        self.platform.destroy_surface(display, live.surface);

        match self.create_surface(&live.egl, live.window) {
            Ok(surface) => {
                if let Err(status) = self
                    .platform
                    .make_current(display, Some(surface), Some(live.context))
                {
                    log::warn!("Unable to eglMakeCurrent on the recreated surface: {}", status);
                }
                self.transition(ContextState::Live(LiveBinding { surface, ..live }));
                self.refresh_screen_size(display, surface);
            }
            Err(err) => {
                log::error!("Failed to recreate EGL surface: {}", err);
                self.transition(ContextState::SurfaceLost(live.without_surface()));
            }
        }
    }

    fn recover_context(&mut self, live: LiveBinding, status: EglStatus) {
        log::warn!("EGL context has been lost ({}). Re-creating context", status);
        self.transition(ContextState::ContextLost);
        self.release(live.egl.display, Some(live.surface), Some(live.context));

        match self.renegotiate() {
            Ok(binding) => self.transition(ContextState::SurfaceLost(binding)),
            Err(err) => log::warn!("Failed to recover the lost EGL context: {}", err),
        }
    }

    /// Fresh display, config and context with no surface. The host's next
    /// resume supplies the window the surface is built on.
    fn renegotiate(&mut self) -> Result<SurfacelessBinding> {
        let egl = self.acquire_display()?;
        let context = match self.negotiate_context(&egl) {
            Ok(context) => context,
            Err(err) => {
                self.release(egl.display, None, None);
                return Err(err);
            }
        };

        if let Err(status) = self.platform.make_current(egl.display, None, Some(context)) {
            log::debug!("Context will be made current once a surface exists: {}", status);
        }

        Ok(SurfacelessBinding { egl, context })
    }

    fn resume_surface(&mut self, binding: SurfacelessBinding, window: NativeWindow) -> Result<EglStatus> {
        match self.create_surface(&binding.egl, window) {
            Ok(surface) => {
                let live = binding.with_surface(window, surface);
                self.transition(ContextState::Live(live));
                self.update_screen_size();
                self.resume_make_current(live)
            }
            Err(err) => {
                log::warn!("{}", err);
                let status = match err {
                    ContextError::SurfaceCreationFailed(status) => status,
                    _ => EglStatus::BAD_SURFACE,
                };
                self.transition(ContextState::SurfaceLost(binding));
                self.rebuild(Some(window), status)
            }
        }
    }

    fn resume_make_current(&mut self, live: LiveBinding) -> Result<EglStatus> {
        let display = live.egl.display;
        let status = match self
            .platform
            .make_current(display, Some(live.surface), Some(live.context))
        {
            Ok(()) => {
                self.transition(ContextState::Live(live));
                return Ok(EglStatus::SUCCESS);
            }
            Err(status) => status,
        };

        log::warn!("Unable to eglMakeCurrent {}", status);

        if status != EglStatus::CONTEXT_LOST {
            return self.rebuild(Some(live.window), status);
        }

        log::info!("Re-creating egl context");
        self.platform.destroy_context(display, live.context);

        let context = match self.negotiate_context(&live.egl) {
            Ok(context) => context,
            Err(err) => {
                self.release(display, Some(live.surface), None);
                self.transition(ContextState::Terminated);
                return Err(log_fatal(err));
            }
        };

        if let Err(status) = self
            .platform
            .make_current(display, Some(live.surface), Some(context))
        {
            self.release(display, Some(live.surface), Some(context));
            self.transition(ContextState::Terminated);
            return Err(log_fatal(ContextError::MakeCurrentFailed(status)));
        }

        self.transition(ContextState::Live(LiveBinding { context, ..live }));
        Ok(EglStatus::CONTEXT_LOST)
    }

    /// Full terminate, then display, config, surface and context from
    /// scratch for `window`. Returns `status` on success.
    fn rebuild(&mut self, window: Option<NativeWindow>, status: EglStatus) -> Result<EglStatus> {
        let Some(window) = window else {
            log::warn!("Cannot rebuild the EGL context without a native window");
            return Ok(EglStatus::BAD_NATIVE_WINDOW);
        };

        log::info!("Re-creating egl context and surface");
        self.terminate();

        let live = self.init_owned(window).map_err(log_fatal)?;
        self.transition(ContextState::Live(live));
        self.init_gles();
        Ok(status)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// The only place `state` changes.
    fn transition(&mut self, next: ContextState) {
        if self.state.name() != next.name() {
            log::debug!("GL context state {} -> {}", self.state, next);
        }
        self.state = next;
    }

    /// Unbind, then destroy context, surface and display connection.
    fn release(
        &mut self,
        display: DisplayHandle,
        surface: Option<SurfaceHandle>,
        context: Option<ContextHandle>,
    ) {
        if let Err(status) = self.platform.make_current(display, None, None) {
            log::debug!("Unbinding context before release failed: {}", status);
        }
        if let Some(context) = context {
            self.platform.destroy_context(display, context);
        }
        if let Some(surface) = surface {
            self.platform.destroy_surface(display, surface);
        }
        self.platform.terminate(display);
    }

    fn query_screen_size(&mut self, display: DisplayHandle, surface: SurfaceHandle) -> Option<ScreenSize> {
        let width = self.platform.query_surface(display, surface, SurfaceAttrib::Width);
        let height = self.platform.query_surface(display, surface, SurfaceAttrib::Height);
        match (width, height) {
            (Ok(width), Ok(height)) => Some(ScreenSize::new(width, height)),
            (Err(status), _) | (_, Err(status)) => {
                log::warn!("Failed to query EGL surface size: {}", status);
                None
            }
        }
    }

    fn refresh_screen_size(&mut self, display: DisplayHandle, surface: SurfaceHandle) -> bool {
        let Some(size) = self.query_screen_size(display, surface) else {
            return false;
        };
        if size == self.screen_size {
            return false;
        }
        self.screen_size = size;
        log::info!("Window size changed to {}x{}", size.width, size.height);
        true
    }
}

impl<P: Platform> Drop for ContextManager<P> {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn log_fatal(err: ContextError) -> ContextError {
    log::error!("{}", err);
    err
}

fn log_swap_chain(desc: &SwapChainDesc) {
    log::debug!(
        "Swap chain: {}x{}, {} buffers, sRGB {}",
        desc.width,
        desc.height,
        desc.buffer_count,
        desc.srgb
    );
}
