//! Integration tests for the diagnostics the context manager logs.
//!
//! A process-wide capturing logger is installed once; tests that read it
//! are serialized.

#[cfg(test)]
mod diagnostics_tests {
    use gles_context::platform::SimulatedPlatform;
    use gles_context::{ContextConfig, ContextManager, EglStatus, LogSink};
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use parking_lot::Mutex;
    use serial_test::serial;

    struct CaptureLogger {
        records: Mutex<Vec<(Level, String)>>,
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            self.records
                .lock()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger {
        records: parking_lot::const_mutex(Vec::new()),
    };

    fn capture() {
        // Another test may already have installed it.
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
        LOGGER.records.lock().clear();
    }

    fn records_at(level: Level) -> Vec<String> {
        LOGGER
            .records
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn count_containing(level: Level, needle: &str) -> usize {
        records_at(level)
            .iter()
            .filter(|message| message.contains(needle))
            .count()
    }

    fn live_manager() -> ContextManager<SimulatedPlatform> {
        let mut manager = ContextManager::from_config(SimulatedPlatform::new(), ContextConfig::default());
        manager.init(Some(SimulatedPlatform::fake_window(0))).unwrap();
        manager
    }

    #[test]
    #[serial]
    fn test_init_logs_choices() {
        capture();
        let _manager = live_manager();

        assert_eq!(count_containing(Level::Info, "Chosen EGL config: 8 bit color, 24 bit depth"), 1);
        assert_eq!(count_containing(Level::Info, "Created OpenGLES Context 3.2"), 1);
        assert_eq!(count_containing(Level::Info, "GL Version: OpenGL ES 3.2"), 1);
    }

    #[test]
    #[serial]
    fn test_present_after_suspend_warns() {
        let mut manager = live_manager();
        manager.suspend();
        capture();

        manager.present(1);

        let warnings = records_at(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("No EGL surface when swapping buffers"));
    }

    #[test]
    #[serial]
    fn test_resize_logged_only_on_change() {
        let mut manager = live_manager();
        capture();

        manager.update_screen_size();
        assert_eq!(count_containing(Level::Info, "Window size changed"), 0);

        manager.platform_mut().set_surface_size(640, 480);
        manager.update_screen_size();
        manager.update_screen_size();
        assert_eq!(count_containing(Level::Info, "Window size changed to 640x480"), 1);
    }

    #[test]
    #[serial]
    fn test_context_loss_logged() {
        let mut manager = live_manager();
        capture();

        manager.platform_mut().fail_next_swap(EglStatus::CONTEXT_LOST);
        manager.present(1);

        assert_eq!(count_containing(Level::Warn, "EGL context has been lost"), 1);
        assert_eq!(count_containing(Level::Debug, "Live -> ContextLost"), 1);
        assert_eq!(count_containing(Level::Debug, "ContextLost -> SurfaceLost"), 1);
    }

    #[test]
    #[serial]
    fn test_failed_surface_recovery_logged_as_error() {
        let mut manager = live_manager();
        capture();

        manager
            .platform_mut()
            .set_surface_creation_error(Some(EglStatus::BAD_ALLOC));
        manager.platform_mut().fail_next_swap(EglStatus::BAD_SURFACE);
        manager.present(1);

        assert_eq!(count_containing(Level::Info, "EGL surface has been lost"), 1);
        assert_eq!(count_containing(Level::Error, "Failed to recreate EGL surface"), 1);
    }

    #[test]
    #[serial]
    fn test_late_debug_sink_is_reported() {
        let manager = live_manager();
        capture();

        let _manager = manager.with_debug_sink(Box::new(LogSink));
        assert_eq!(count_containing(Level::Debug, "new sink is not registered"), 1);
    }

    #[test]
    #[serial]
    fn test_early_debug_sink_is_silent() {
        capture();
        let _manager = ContextManager::from_config(SimulatedPlatform::new(), ContextConfig::default())
            .with_debug_sink(Box::new(LogSink));
        assert_eq!(count_containing(Level::Debug, "new sink is not registered"), 0);
    }

    #[test]
    #[serial]
    fn test_debug_messages_reach_log_sink() {
        let manager = live_manager();
        capture();

        manager
            .platform()
            .emit_debug_message(0x824A, 0x8250, 3, 0x826B, "slow path");

        assert_eq!(
            records_at(Level::Info),
            vec![
                "OpenGL debug message 3 (Source: Application. Type: PERFORMANCE. Severity: Notification): slow path"
                    .to_string()
            ]
        );
    }
}
