//! Integration tests for context bring-up, suspend/resume and teardown.
//!
//! Everything runs against `SimulatedPlatform`, which journals each native
//! call so ordering and release can be checked without a GPU.

#[cfg(test)]
mod lifecycle_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gles_context::config::parse_version_list;
    use gles_context::debug::{
        format_debug_message, DebugMessageSink, DebugSeverity, DebugSource, DebugType,
    };
    use gles_context::platform::{SimCall, SimulatedPlatform};
    use gles_context::{
        ContextConfig, ContextCreateInfo, ContextError, ContextManager, ContextState, DeviceCaps,
        EglStatus, GlesVersion, RenderDeviceType, ScreenSize, SwapChainDesc,
    };
    use rstest::rstest;

    fn window(id: usize) -> gles_context::NativeWindow {
        SimulatedPlatform::fake_window(id)
    }

    fn manager_on(platform: SimulatedPlatform) -> ContextManager<SimulatedPlatform> {
        ContextManager::from_config(platform, ContextConfig::default())
    }

    fn live_manager() -> ContextManager<SimulatedPlatform> {
        let mut manager = manager_on(SimulatedPlatform::new());
        manager.init(Some(window(0))).unwrap();
        manager
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Rc<RefCell<Vec<String>>>);

    impl DebugMessageSink for RecordingSink {
        fn emit(
            &self,
            source: DebugSource,
            ty: DebugType,
            severity: DebugSeverity,
            id: u32,
            text: &str,
        ) {
            self.0
                .borrow_mut()
                .push(format_debug_message(id, source, ty, severity, text));
        }
    }

    // ------------------------------------------------------------------
    // Init
    // ------------------------------------------------------------------

    #[test]
    fn test_init_with_window_is_drawable() {
        let manager = live_manager();

        assert!(manager.is_initialized());
        assert!(manager.is_context_valid());
        assert!(manager.state().is_drawable());
        assert_eq!(manager.version(), GlesVersion::new(3, 2));
        assert_eq!(manager.screen_size(), ScreenSize::new(1080, 1920));

        let selection = manager.config_selection().unwrap();
        assert_eq!((selection.color_bits, selection.depth_bits), (8, 24));
        assert_eq!(selection.swap_interval.min, 0);
        assert_eq!(selection.swap_interval.max, 1);
    }

    #[test]
    fn test_init_call_order() {
        let manager = live_manager();
        let calls = manager.platform().calls();
        let position = |pred: &dyn Fn(&SimCall) -> bool| calls.iter().position(|c| pred(c)).unwrap();

        let geometry = position(&|c| matches!(c, SimCall::SetBuffersGeometry(..)));
        let surface = position(&|c| matches!(c, SimCall::CreateSurface(_)));
        let context = position(&|c| matches!(c, SimCall::CreateContext(_)));
        let current = position(&|c| matches!(c, SimCall::MakeCurrent(Some(_), Some(_))));

        assert_eq!(calls[0], SimCall::GetDisplay);
        assert!(geometry < surface);
        assert!(surface < context);
        assert!(context < current);
    }

    #[test]
    fn test_new_reports_caps_and_uses_sink() {
        let sink = RecordingSink::default();
        let info = ContextCreateInfo {
            swap_chain: Some(SwapChainDesc::default()),
            debug_sink: Box::new(sink.clone()),
            ..ContextCreateInfo::for_window(window(0))
        };
        let mut caps = DeviceCaps::default();
        let manager = ContextManager::new(SimulatedPlatform::new(), info, &mut caps).unwrap();

        assert_eq!(caps.dev_type, RenderDeviceType::Gles);
        assert_eq!((caps.major_version(), caps.minor_version()), (3, 2));

        manager
            .platform()
            .emit_debug_message(0x8246, 0x824C, 7, 0x9146, "invalid enum");
        assert_eq!(
            *sink.0.borrow(),
            vec![
                "OpenGL debug message 7 (Source: API. Type: ERROR. Severity: HIGH): invalid enum"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_attach_to_external_context() {
        let mut caps = DeviceCaps::default();
        let mut manager = ContextManager::new(
            SimulatedPlatform::new().with_external_context(GlesVersion::new(3, 1)),
            ContextCreateInfo::attach_current(),
            &mut caps,
        )
        .unwrap();

        assert_eq!(manager.state(), ContextState::Attached);
        assert!(manager.is_context_valid());
        assert_eq!(caps.version, GlesVersion::new(3, 1));
        assert!(manager.config_selection().is_none());
        assert!(manager.platform().context_attempts().is_empty());
        assert_eq!(manager.platform().functions_loaded(), 1);

        assert_eq!(manager.resume(None), Ok(EglStatus::SUCCESS));
        assert_eq!(manager.state(), ContextState::Attached);
    }

    #[rstest]
    #[case::owned(SimulatedPlatform::new(), Some(0))]
    #[case::attached(SimulatedPlatform::new().with_external_context(GlesVersion::new(3, 1)), None)]
    fn test_gl_functions_load_before_queries(
        #[case] platform: SimulatedPlatform,
        #[case] window_id: Option<usize>,
    ) {
        let mut manager = manager_on(platform);
        manager.init(window_id.map(window)).unwrap();

        assert!(manager.platform().unloaded_gl_calls().is_empty());
        assert_eq!(manager.platform().functions_loaded(), 1);
        assert!(manager.version().is_known());
        assert_eq!(manager.platform().srgb_enables(), 1);
        assert!(manager.platform().has_debug_sink());
    }

    #[test]
    fn test_current_native_context() {
        let mut manager = live_manager();
        let owned = manager.state().context();
        assert!(owned.is_some());
        assert_eq!(manager.current_native_context(), owned);

        manager.terminate();
        assert_eq!(manager.current_native_context(), None);

        let mut attached = manager_on(
            SimulatedPlatform::new().with_external_context(GlesVersion::new(3, 0)),
        );
        attached.init(None).unwrap();
        assert!(attached.current_native_context().is_some());
    }

    #[test]
    fn test_attach_without_current_context_fails() {
        let mut manager = manager_on(SimulatedPlatform::new());
        let err = manager.init(None).unwrap_err();

        assert_eq!(err, ContextError::NoCurrentContext);
        assert!(!manager.is_initialized());
    }

    #[rstest]
    #[case::no_display(SimulatedPlatform::new().without_display(), ContextError::NoDisplay)]
    #[case::init_rejected(
        SimulatedPlatform::new().with_initialize_error(EglStatus::BAD_ACCESS),
        ContextError::DisplayInitFailed(EglStatus::BAD_ACCESS)
    )]
    #[case::choose_config_rejected(
        SimulatedPlatform::new().with_choose_config_error(EglStatus::BAD_ATTRIBUTE),
        ContextError::ChooseConfigFailed { depth_bits: 24, status: EglStatus::BAD_ATTRIBUTE }
    )]
    #[case::no_config(SimulatedPlatform::new().with_depths(&[]), ContextError::NoMatchingConfig)]
    #[case::no_version(
        SimulatedPlatform::new().with_versions(&[]),
        ContextError::ContextCreationFailed {
            attempted: vec![GlesVersion::new(3, 2), GlesVersion::new(3, 1), GlesVersion::new(3, 0)],
        }
    )]
    fn test_init_failures_release_everything(
        #[case] platform: SimulatedPlatform,
        #[case] expected: ContextError,
    ) {
        let mut manager = manager_on(platform);

        assert_eq!(manager.init(Some(window(0))), Err(expected));
        assert_eq!(manager.state(), ContextState::Uninitialized);
        assert!(!manager.platform().is_display_initialized());
        assert_eq!(manager.platform().live_surface_count(), 0);
        assert_eq!(manager.platform().live_context_count(), 0);
        assert_eq!(manager.platform().functions_loaded(), 0);
    }

    #[test]
    fn test_failed_init_can_be_retried() {
        let mut manager = manager_on(SimulatedPlatform::new().with_versions(&[]));
        assert!(manager.init(Some(window(0))).is_err());

        manager.platform_mut().set_versions(&[GlesVersion::new(3, 0)]);
        manager.init(Some(window(0))).unwrap();
        assert_eq!(manager.version(), GlesVersion::new(3, 0));
    }

    // ------------------------------------------------------------------
    // Negotiation
    // ------------------------------------------------------------------

    #[rstest]
    #[case::all(&[(3, 2), (3, 1), (3, 0)], (3, 2), 1)]
    #[case::no_32(&[(3, 1), (3, 0)], (3, 1), 2)]
    #[case::lowest_only(&[(3, 0)], (3, 0), 3)]
    fn test_negotiation_stops_at_first_success(
        #[case] supported: &[(u32, u32)],
        #[case] expected: (u32, u32),
        #[case] attempts: usize,
    ) {
        let supported: Vec<_> = supported
            .iter()
            .map(|&(major, minor)| GlesVersion::new(major, minor))
            .collect();
        let mut manager = manager_on(SimulatedPlatform::new().with_versions(&supported));
        manager.init(Some(window(0))).unwrap();

        let tried = manager.platform().context_attempts();
        assert_eq!(tried.len(), attempts);
        assert!(tried.windows(2).all(|pair| pair[0] > pair[1]));
        assert_eq!(manager.version(), GlesVersion::new(expected.0, expected.1));
        assert_eq!(manager.device_caps().version, manager.version());
    }

    #[test]
    fn test_configured_candidates_are_used() {
        let config = ContextConfig::default()
            .with_versions(parse_version_list("3.1,2.0").unwrap())
            .unwrap();
        let platform = SimulatedPlatform::new().with_versions(&[GlesVersion::new(2, 0)]);
        let mut manager = ContextManager::from_config(platform, config);
        manager.init(Some(window(0))).unwrap();

        assert_eq!(
            manager.platform().context_attempts(),
            vec![GlesVersion::new(3, 1), GlesVersion::new(2, 0)]
        );
        assert_eq!(manager.version(), GlesVersion::new(2, 0));
    }

    #[test]
    fn test_depth_falls_back_once() {
        let mut manager = manager_on(SimulatedPlatform::new().with_depths(&[16]));
        manager.init(Some(window(0))).unwrap();

        let requests: Vec<_> = manager
            .platform()
            .calls()
            .iter()
            .filter_map(|call| match call {
                SimCall::ChooseConfig(request) => Some(request.depth_bits),
                _ => None,
            })
            .collect();
        assert_eq!(requests, vec![24, 16]);
        assert_eq!(manager.config_selection().unwrap().depth_bits, 16);
    }

    // ------------------------------------------------------------------
    // Suspend / resume
    // ------------------------------------------------------------------

    #[test]
    fn test_resume_uninitialized_equals_init() {
        let mut manager = manager_on(SimulatedPlatform::new());

        assert_eq!(manager.resume(Some(window(0))), Ok(EglStatus::SUCCESS));
        assert!(manager.state().is_drawable());
        assert!(manager.version().is_known());
    }

    #[test]
    fn test_resume_uninitialized_propagates_fatal_error() {
        let mut manager = manager_on(SimulatedPlatform::new().without_display());
        assert_eq!(manager.resume(Some(window(0))), Err(ContextError::NoDisplay));
    }

    #[test]
    fn test_suspend_then_present_changes_nothing() {
        let mut manager = live_manager();
        manager.suspend();
        let state = manager.state();
        let size = manager.screen_size();
        manager.platform_mut().clear_calls();

        manager.present(1);

        assert_eq!(manager.state(), state);
        assert_eq!(manager.screen_size(), size);
        assert!(manager.platform().calls().is_empty());
    }

    #[test]
    fn test_suspend_resume_keeps_context() {
        let mut manager = live_manager();
        let context = manager.state().context();

        manager.suspend();
        assert!(manager.is_context_valid());
        assert!(!manager.state().is_drawable());

        assert_eq!(manager.resume(Some(window(0))), Ok(EglStatus::SUCCESS));
        assert!(manager.state().is_drawable());
        assert_eq!(manager.state().context(), context);
        assert_eq!(manager.platform().context_attempts().len(), 1);
        assert_eq!(manager.platform().live_surface_count(), 1);
    }

    #[test]
    fn test_resume_picks_up_new_size() {
        let mut manager = live_manager();
        manager.suspend();
        manager.platform_mut().set_surface_size(1920, 1080);

        manager.resume(Some(window(1))).unwrap();
        assert_eq!(manager.screen_size(), ScreenSize::new(1920, 1080));
    }

    #[test]
    fn test_resume_live_same_window_makes_current_only() {
        let mut manager = live_manager();
        let surface = manager.state().surface();
        manager.platform_mut().clear_calls();

        assert_eq!(manager.resume(Some(window(0))), Ok(EglStatus::SUCCESS));
        assert_eq!(manager.state().surface(), surface);
        assert!(!manager
            .platform()
            .calls()
            .iter()
            .any(|call| matches!(call, SimCall::CreateSurface(_))));
    }

    #[test]
    fn test_suspend_twice_is_harmless() {
        let mut manager = live_manager();
        manager.suspend();
        manager.platform_mut().clear_calls();
        manager.suspend();
        assert!(manager.platform().calls().is_empty());
        assert!(matches!(manager.state(), ContextState::SurfaceLost(_)));
    }

    // ------------------------------------------------------------------
    // Terminate / invalidate
    // ------------------------------------------------------------------

    #[test]
    fn test_terminate_twice_releases_once() {
        let mut manager = live_manager();

        manager.terminate();
        assert_eq!(manager.state(), ContextState::Terminated);
        assert!(manager.state().display().is_none());
        assert!(manager.state().surface().is_none());
        assert!(manager.state().context().is_none());
        let calls = manager.platform().calls().len();

        manager.terminate();
        assert_eq!(manager.state(), ContextState::Terminated);
        assert!(manager.state().display().is_none());
        assert_eq!(manager.platform().calls().len(), calls);
    }

    #[test]
    fn test_terminate_release_order() {
        let mut manager = live_manager();
        let surface = manager.state().surface().unwrap();
        let context = manager.state().context().unwrap();
        manager.platform_mut().clear_calls();

        manager.terminate();
        let calls = manager.platform().calls();
        assert_eq!(calls[0], SimCall::MakeCurrent(None, None));
        assert_eq!(calls[1], SimCall::DestroyContext(context));
        assert_eq!(calls[2], SimCall::DestroySurface(surface));
        assert!(matches!(calls[3], SimCall::Terminate(_)));
    }

    #[test]
    fn test_terminate_uninitialized_is_noop() {
        let mut manager = manager_on(SimulatedPlatform::new());
        manager.terminate();
        assert_eq!(manager.state(), ContextState::Uninitialized);
        assert!(manager.platform().calls().is_empty());
    }

    #[test]
    fn test_resume_after_terminate_rebuilds() {
        let mut manager = live_manager();
        manager.terminate();

        assert_eq!(manager.resume(Some(window(0))), Ok(EglStatus::NOT_INITIALIZED));
        assert!(manager.state().is_drawable());
        assert_eq!(manager.platform().live_context_count(), 1);
    }

    #[test]
    fn test_invalidate_resets_to_uninitialized() {
        let mut manager = live_manager();

        assert!(manager.invalidate());
        assert!(!manager.is_initialized());
        assert!(!manager.platform().is_display_initialized());

        assert_eq!(manager.resume(Some(window(0))), Ok(EglStatus::SUCCESS));
        assert!(manager.state().is_drawable());
        assert_eq!(manager.platform().functions_loaded(), 1);
    }

    #[test]
    fn test_update_screen_size_reports_changes_only() {
        let mut manager = live_manager();
        assert!(!manager.update_screen_size());

        manager.platform_mut().set_surface_size(720, 1280);
        assert!(manager.update_screen_size());
        assert_eq!(manager.screen_size(), ScreenSize::new(720, 1280));
        assert!(!manager.update_screen_size());
    }

    #[test]
    fn test_update_screen_size_without_surface() {
        let mut manager = live_manager();
        manager.suspend();
        manager.platform_mut().set_surface_size(1, 1);
        assert!(!manager.update_screen_size());
        assert_eq!(manager.screen_size(), ScreenSize::new(1080, 1920));
    }
}
