//!
//! Scriptable in-memory platform.
//!
//! `SimulatedPlatform` behaves like a well-mannered EGL driver with a single
//! default display. Tests and headless hosts script its capabilities
//! (accepted depth sizes, creatable context versions, swap-interval range)
//! and inject failures (lost surfaces, lost contexts, failing make-current)
//! to drive the context manager through its recovery paths. Every native
//! call is recorded in a journal so call order can be asserted.
//!

use std::collections::{HashMap, VecDeque};

use super::egl::{
    ConfigAttrib, ConfigHandle, ConfigRequest, ContextHandle, DisplayHandle, EglApi, EglStatus,
    NativeWindow, SurfaceAttrib, SurfaceHandle,
};
use super::gles::{GlError, GlesApi, GlesVersion, GLES_VERSION_CANDIDATES};
use crate::debug::{dispatch_raw, DebugMessageSink};

const DEFAULT_DISPLAY: usize = 0x1;
const EXTERNAL_CONTEXT: usize = 0xE0;
const FIRST_HANDLE: usize = 0x100;
/// Journal entries kept by default.
const DEFAULT_JOURNAL_LIMIT: usize = 4096;

/// `AHARDWAREBUFFER_FORMAT_R8G8B8A8_UNORM` / `WINDOW_FORMAT_RGBA_8888`.
const RGBA_8888: i32 = 1;

/// One recorded native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCall {
    GetDisplay,
    Initialize(DisplayHandle),
    ChooseConfig(ConfigRequest),
    SetBuffersGeometry(NativeWindow, i32),
    CreateSurface(NativeWindow),
    CreateContext(GlesVersion),
    MakeCurrent(Option<SurfaceHandle>, Option<ContextHandle>),
    SwapInterval(i32),
    SwapBuffers(SurfaceHandle),
    DestroySurface(SurfaceHandle),
    DestroyContext(ContextHandle),
    Terminate(DisplayHandle),
}

/// Scriptable EGL/GLES driver.
pub struct SimulatedPlatform {
    display_available: bool,
    initialize_error: Option<EglStatus>,
    choose_config_error: Option<EglStatus>,
    supported_depths: Vec<u8>,
    supported_versions: Vec<GlesVersion>,
    native_visual_id: i32,
    swap_interval_bounds: (i32, i32),
    surface_size: (i32, i32),
    surface_creation_error: Option<EglStatus>,
    swap_failures: VecDeque<EglStatus>,
    make_current_failures: VecDeque<EglStatus>,
    external_context: Option<GlesVersion>,
    srgb_error: Option<GlError>,
    debug_output_available: bool,

    next_handle: usize,
    display_initialized: bool,
    surfaces: HashMap<SurfaceHandle, NativeWindow>,
    contexts: HashMap<ContextHandle, GlesVersion>,
    current: Option<(Option<SurfaceHandle>, ContextHandle)>,
    calls: Vec<SimCall>,
    journal_limit: usize,
    functions_loaded: usize,
    unloaded_gl_calls: Vec<&'static str>,
    srgb_enables: usize,
    debug_sink: Option<Box<dyn DebugMessageSink>>,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPlatform {
    /// A driver that accepts 24 and 16 bit depth, every default version
    /// candidate, swap intervals 0..=1 and reports a 1080x1920 window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            display_available: true,
            initialize_error: None,
            choose_config_error: None,
            supported_depths: vec![24, 16],
            supported_versions: GLES_VERSION_CANDIDATES.to_vec(),
            native_visual_id: RGBA_8888,
            swap_interval_bounds: (0, 1),
            surface_size: (1080, 1920),
            surface_creation_error: None,
            swap_failures: VecDeque::new(),
            make_current_failures: VecDeque::new(),
            external_context: None,
            srgb_error: None,
            debug_output_available: true,
            next_handle: FIRST_HANDLE,
            display_initialized: false,
            surfaces: HashMap::new(),
            contexts: HashMap::new(),
            current: None,
            calls: Vec::new(),
            journal_limit: DEFAULT_JOURNAL_LIMIT,
            functions_loaded: 0,
            unloaded_gl_calls: Vec::new(),
            srgb_enables: 0,
            debug_sink: None,
        }
    }

    /// A fake native window pointer, distinct per `id`.
    #[must_use]
    pub fn fake_window(id: usize) -> NativeWindow {
        match NativeWindow::new(((id + 1) * 0x1000) as *mut libc::c_void) {
            Some(window) => window,
            None => unreachable!("non-zero address"),
        }
    }

    // ------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------

    /// No display server.
    #[must_use]
    pub fn without_display(mut self) -> Self {
        self.display_available = false;
        self
    }

    /// Make `eglInitialize` fail.
    #[must_use]
    pub fn with_initialize_error(mut self, status: EglStatus) -> Self {
        self.initialize_error = Some(status);
        self
    }

    /// Make `eglChooseConfig` itself fail.
    #[must_use]
    pub fn with_choose_config_error(mut self, status: EglStatus) -> Self {
        self.choose_config_error = Some(status);
        self
    }

    /// Depth sizes for which a matching config exists.
    #[must_use]
    pub fn with_depths(mut self, depths: &[u8]) -> Self {
        self.supported_depths = depths.to_vec();
        self
    }

    /// Context versions that can be created.
    #[must_use]
    pub fn with_versions(mut self, versions: &[GlesVersion]) -> Self {
        self.supported_versions = versions.to_vec();
        self
    }

    /// Swap interval range reported by every config.
    #[must_use]
    pub const fn with_swap_interval_bounds(mut self, min: i32, max: i32) -> Self {
        self.swap_interval_bounds = (min, max);
        self
    }

    /// Size reported by every surface.
    #[must_use]
    pub const fn with_surface_size(mut self, width: i32, height: i32) -> Self {
        self.surface_size = (width, height);
        self
    }

    /// A context of `version` created by someone else is current.
    #[must_use]
    pub fn with_external_context(mut self, version: GlesVersion) -> Self {
        self.external_context = Some(version);
        self
    }

    /// Make `glEnable(GL_FRAMEBUFFER_SRGB)` raise an error.
    #[must_use]
    pub const fn with_srgb_error(mut self, error: GlError) -> Self {
        self.srgb_error = Some(error);
        self
    }

    /// Whether `glDebugMessageCallback` is available.
    #[must_use]
    pub const fn with_debug_output(mut self, available: bool) -> Self {
        self.debug_output_available = available;
        self
    }

    /// Keep at most `limit` journal entries. Older entries are discarded in
    /// bulk once the limit is reached; `0` disables journaling.
    #[must_use]
    pub const fn with_journal_limit(mut self, limit: usize) -> Self {
        self.journal_limit = limit;
        self
    }

    /// Change the set of creatable context versions.
    pub fn set_versions(&mut self, versions: &[GlesVersion]) {
        self.supported_versions = versions.to_vec();
    }

    /// Change the size reported by surfaces (the window was resized).
    pub fn set_surface_size(&mut self, width: i32, height: i32) {
        self.surface_size = (width, height);
    }

    /// Make every following surface creation fail with `status`, or succeed
    /// again with `None`.
    pub fn set_surface_creation_error(&mut self, status: Option<EglStatus>) {
        self.surface_creation_error = status;
    }

    /// Remove the display server (affects the next `get_display`).
    pub fn set_display_available(&mut self, available: bool) {
        self.display_available = available;
    }

    /// Fail the next buffer swap with `status`.
    pub fn fail_next_swap(&mut self, status: EglStatus) {
        self.swap_failures.push_back(status);
    }

    /// Fail the next make-current that binds a context with `status`.
    pub fn fail_next_make_current(&mut self, status: EglStatus) {
        self.make_current_failures.push_back(status);
    }

    /// Deliver a raw driver debug message to the registered sink, as the GL
    /// callback would.
    pub fn emit_debug_message(&self, source: u32, ty: u32, id: u32, severity: u32, text: &str) {
        if let Some(sink) = &self.debug_sink {
            dispatch_raw(sink.as_ref(), source, ty, id, severity, text);
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// The most recent native calls, in order.
    #[must_use]
    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }

    /// Versions passed to context creation, in order.
    #[must_use]
    pub fn context_attempts(&self) -> Vec<GlesVersion> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SimCall::CreateContext(version) => Some(*version),
                _ => None,
            })
            .collect()
    }

    /// Intervals passed to `eglSwapInterval`, in order.
    #[must_use]
    pub fn applied_swap_intervals(&self) -> Vec<i32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SimCall::SwapInterval(interval) => Some(*interval),
                _ => None,
            })
            .collect()
    }

    /// Forget the journal.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Whether the display is initialized.
    #[must_use]
    pub const fn is_display_initialized(&self) -> bool {
        self.display_initialized
    }

    /// Number of surfaces not yet destroyed.
    #[must_use]
    pub fn live_surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Number of contexts not yet destroyed.
    #[must_use]
    pub fn live_context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Whether `surface` exists.
    #[must_use]
    pub fn is_surface_live(&self, surface: SurfaceHandle) -> bool {
        self.surfaces.contains_key(&surface)
    }

    /// Whether `context` exists.
    #[must_use]
    pub fn is_context_live(&self, context: ContextHandle) -> bool {
        self.contexts.contains_key(&context)
    }

    /// The (surface, context) pair currently bound.
    #[must_use]
    pub const fn current(&self) -> Option<(Option<SurfaceHandle>, ContextHandle)> {
        self.current
    }

    /// How many times the function table was loaded.
    #[must_use]
    pub const fn functions_loaded(&self) -> usize {
        self.functions_loaded
    }

    /// How many times the sRGB toggle was applied.
    #[must_use]
    pub const fn srgb_enables(&self) -> usize {
        self.srgb_enables
    }

    /// GL calls issued before the function table was loaded. A real driver
    /// faults on each of these.
    #[must_use]
    pub fn unloaded_gl_calls(&self) -> &[&'static str] {
        &self.unloaded_gl_calls
    }

    /// Whether a debug sink is registered.
    #[must_use]
    pub const fn has_debug_sink(&self) -> bool {
        self.debug_sink.is_some()
    }

    fn record(&mut self, call: SimCall) {
        if self.journal_limit == 0 {
            return;
        }
        if self.calls.len() >= self.journal_limit {
            let excess = self.calls.len() + 1 - self.journal_limit;
            let drop = excess.max(self.journal_limit / 2);
            self.calls.drain(..drop.min(self.calls.len()));
        }
        self.calls.push(call);
    }

    /// Reject a GL call made before `load_functions`.
    fn require_functions(&mut self, name: &'static str) -> bool {
        if self.functions_loaded == 0 {
            self.unloaded_gl_calls.push(name);
            return false;
        }
        true
    }

    fn allocate(&mut self) -> usize {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn require_display(&self, display: DisplayHandle) -> Result<(), EglStatus> {
        if display.as_raw() != DEFAULT_DISPLAY {
            return Err(EglStatus::BAD_DISPLAY);
        }
        if !self.display_initialized {
            return Err(EglStatus::NOT_INITIALIZED);
        }
        Ok(())
    }

    fn current_version(&self) -> Option<GlesVersion> {
        match self.current {
            Some((_, context)) => self.contexts.get(&context).copied(),
            None => self.external_context,
        }
    }
}

impl EglApi for SimulatedPlatform {
    fn get_display(&mut self) -> Option<DisplayHandle> {
        self.record(SimCall::GetDisplay);
        if self.display_available {
            DisplayHandle::from_raw(DEFAULT_DISPLAY)
        } else {
            None
        }
    }

    fn initialize(&mut self, display: DisplayHandle) -> Result<(), EglStatus> {
        self.record(SimCall::Initialize(display));
        if let Some(status) = self.initialize_error {
            return Err(status);
        }
        self.display_initialized = true;
        Ok(())
    }

    fn choose_config(
        &mut self,
        display: DisplayHandle,
        request: &ConfigRequest,
    ) -> Result<Option<ConfigHandle>, EglStatus> {
        self.record(SimCall::ChooseConfig(*request));
        self.require_display(display)?;
        if let Some(status) = self.choose_config_error {
            return Err(status);
        }
        if request.color_bits <= 8 && self.supported_depths.contains(&request.depth_bits) {
            Ok(ConfigHandle::from_raw(0x10 + usize::from(request.depth_bits)))
        } else {
            Ok(None)
        }
    }

    fn config_attrib(
        &mut self,
        display: DisplayHandle,
        _config: ConfigHandle,
        attrib: ConfigAttrib,
    ) -> Result<i32, EglStatus> {
        self.require_display(display)?;
        Ok(match attrib {
            ConfigAttrib::NativeVisualId => self.native_visual_id,
            ConfigAttrib::MinSwapInterval => self.swap_interval_bounds.0,
            ConfigAttrib::MaxSwapInterval => self.swap_interval_bounds.1,
        })
    }

    fn set_buffers_geometry(&mut self, window: NativeWindow, format: i32) {
        self.record(SimCall::SetBuffersGeometry(window, format));
    }

    fn create_window_surface(
        &mut self,
        display: DisplayHandle,
        _config: ConfigHandle,
        window: NativeWindow,
    ) -> Result<SurfaceHandle, EglStatus> {
        self.record(SimCall::CreateSurface(window));
        self.require_display(display)?;
        if let Some(status) = self.surface_creation_error {
            return Err(status);
        }
        let surface = SurfaceHandle::from_raw(self.allocate()).ok_or(EglStatus::BAD_ALLOC)?;
        self.surfaces.insert(surface, window);
        Ok(surface)
    }

    fn query_surface(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
        attrib: SurfaceAttrib,
    ) -> Result<i32, EglStatus> {
        self.require_display(display)?;
        if !self.surfaces.contains_key(&surface) {
            return Err(EglStatus::BAD_SURFACE);
        }
        Ok(match attrib {
            SurfaceAttrib::Width => self.surface_size.0,
            SurfaceAttrib::Height => self.surface_size.1,
        })
    }

    fn create_context(
        &mut self,
        display: DisplayHandle,
        _config: ConfigHandle,
        version: GlesVersion,
    ) -> Result<ContextHandle, EglStatus> {
        self.record(SimCall::CreateContext(version));
        self.require_display(display)?;
        if !self.supported_versions.contains(&version) {
            return Err(EglStatus::BAD_MATCH);
        }
        let context = ContextHandle::from_raw(self.allocate()).ok_or(EglStatus::BAD_ALLOC)?;
        self.contexts.insert(context, version);
        Ok(context)
    }

    fn make_current(
        &mut self,
        display: DisplayHandle,
        surface: Option<SurfaceHandle>,
        context: Option<ContextHandle>,
    ) -> Result<(), EglStatus> {
        self.record(SimCall::MakeCurrent(surface, context));
        self.require_display(display)?;

        let Some(context) = context else {
            self.current = None;
            return Ok(());
        };
        if let Some(status) = self.make_current_failures.pop_front() {
            return Err(status);
        }
        if !self.contexts.contains_key(&context) {
            return Err(EglStatus::BAD_CONTEXT);
        }
        if let Some(surface) = surface {
            if !self.surfaces.contains_key(&surface) {
                return Err(EglStatus::BAD_SURFACE);
            }
        }
        self.current = Some((surface, context));
        Ok(())
    }

    fn current_context(&mut self) -> Option<ContextHandle> {
        match self.current {
            Some((_, context)) => Some(context),
            None => self
                .external_context
                .and_then(|_| ContextHandle::from_raw(EXTERNAL_CONTEXT)),
        }
    }

    fn swap_interval(&mut self, display: DisplayHandle, interval: i32) -> Result<(), EglStatus> {
        self.record(SimCall::SwapInterval(interval));
        self.require_display(display)
    }

    fn swap_buffers(
        &mut self,
        display: DisplayHandle,
        surface: SurfaceHandle,
    ) -> Result<(), EglStatus> {
        self.record(SimCall::SwapBuffers(surface));
        self.require_display(display)?;
        if let Some(status) = self.swap_failures.pop_front() {
            if status == EglStatus::CONTEXT_LOST {
                self.current = None;
            }
            return Err(status);
        }
        if !self.surfaces.contains_key(&surface) {
            return Err(EglStatus::BAD_SURFACE);
        }
        Ok(())
    }

    fn destroy_surface(&mut self, _display: DisplayHandle, surface: SurfaceHandle) {
        self.record(SimCall::DestroySurface(surface));
        self.surfaces.remove(&surface);
    }

    fn destroy_context(&mut self, _display: DisplayHandle, context: ContextHandle) {
        self.record(SimCall::DestroyContext(context));
        self.contexts.remove(&context);
        if matches!(self.current, Some((_, bound)) if bound == context) {
            self.current = None;
        }
    }

    fn terminate(&mut self, display: DisplayHandle) {
        self.record(SimCall::Terminate(display));
        self.display_initialized = false;
        self.surfaces.clear();
        self.contexts.clear();
        self.current = None;
    }
}

impl GlesApi for SimulatedPlatform {
    fn version_string(&mut self) -> Option<String> {
        if !self.require_functions("glGetString") {
            return None;
        }
        self.current_version()
            .map(|version| format!("OpenGL ES {} (simulated)", version))
    }

    fn context_version(&mut self) -> GlesVersion {
        if !self.require_functions("glGetIntegerv") {
            return GlesVersion::NONE;
        }
        self.current_version().unwrap_or(GlesVersion::NONE)
    }

    fn load_functions(&mut self) {
        self.functions_loaded += 1;
    }

    fn enable_framebuffer_srgb(&mut self) -> Result<(), GlError> {
        if !self.require_functions("glEnable") {
            return Err(GlError(0x0502));
        }
        self.srgb_enables += 1;
        match self.srgb_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn supports_debug_output(&mut self) -> bool {
        self.functions_loaded > 0 && self.debug_output_available
    }

    fn enable_debug_output(&mut self, sink: Box<dyn DebugMessageSink>) -> Result<(), GlError> {
        if !self.require_functions("glDebugMessageCallback") || !self.debug_output_available {
            return Err(GlError(0x0500));
        }
        self.debug_sink = Some(sink);
        Ok(())
    }
}
