//!
//! Driver debug-message classification.
//!
//! The GL debug callback hands over raw enum values. They are mapped here
//! into typed source / type / severity values and formatted into a single
//! diagnostic line. The mapping is pure so it can be tested without a driver.
//!

use std::fmt;

/// Origin of a debug message (`GL_DEBUG_SOURCE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugSource {
    Api,
    WindowSystem,
    ShaderCompiler,
    ThirdParty,
    Application,
    Other,
    /// Value outside the GL enum range.
    Unknown(u32),
}

impl DebugSource {
    /// Map a `GL_DEBUG_SOURCE_*` value.
    #[must_use]
    pub const fn from_gl(value: u32) -> Self {
        match value {
            0x8246 => Self::Api,
            0x8247 => Self::WindowSystem,
            0x8248 => Self::ShaderCompiler,
            0x8249 => Self::ThirdParty,
            0x824A => Self::Application,
            0x824B => Self::Other,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for DebugSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => f.write_str("Source: API."),
            Self::WindowSystem => f.write_str("Source: Window System."),
            Self::ShaderCompiler => f.write_str("Source: Shader Compiler."),
            Self::ThirdParty => f.write_str("Source: Third Party."),
            Self::Application => f.write_str("Source: Application."),
            Self::Other => f.write_str("Source: Other."),
            Self::Unknown(value) => write!(f, "Source: Unknown ({}).", value),
        }
    }
}

/// Kind of a debug message (`GL_DEBUG_TYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugType {
    Error,
    DeprecatedBehavior,
    UndefinedBehavior,
    Portability,
    Performance,
    Marker,
    PushGroup,
    PopGroup,
    Other,
    /// Value outside the GL enum range.
    Unknown(u32),
}

impl DebugType {
    /// Map a `GL_DEBUG_TYPE_*` value.
    #[must_use]
    pub const fn from_gl(value: u32) -> Self {
        match value {
            0x824C => Self::Error,
            0x824D => Self::DeprecatedBehavior,
            0x824E => Self::UndefinedBehavior,
            0x824F => Self::Portability,
            0x8250 => Self::Performance,
            0x8251 => Self::Other,
            0x8268 => Self::Marker,
            0x8269 => Self::PushGroup,
            0x826A => Self::PopGroup,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for DebugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("Type: ERROR."),
            Self::DeprecatedBehavior => f.write_str("Type: Deprecated Behaviour."),
            Self::UndefinedBehavior => f.write_str("Type: UNDEFINED BEHAVIOUR."),
            Self::Portability => f.write_str("Type: Portability."),
            Self::Performance => f.write_str("Type: PERFORMANCE."),
            Self::Marker => f.write_str("Type: Marker."),
            Self::PushGroup => f.write_str("Type: Push Group."),
            Self::PopGroup => f.write_str("Type: Pop Group."),
            Self::Other => f.write_str("Type: Other."),
            Self::Unknown(value) => write!(f, "Type: Unknown ({}).", value),
        }
    }
}

/// Importance of a debug message (`GL_DEBUG_SEVERITY_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugSeverity {
    High,
    Medium,
    Low,
    Notification,
    /// Value outside the GL enum range.
    Unknown(u32),
}

impl DebugSeverity {
    /// Map a `GL_DEBUG_SEVERITY_*` value.
    #[must_use]
    pub const fn from_gl(value: u32) -> Self {
        match value {
            0x9146 => Self::High,
            0x9147 => Self::Medium,
            0x9148 => Self::Low,
            0x826B => Self::Notification,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for DebugSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("Severity: HIGH"),
            Self::Medium => f.write_str("Severity: Medium"),
            Self::Low => f.write_str("Severity: Low"),
            Self::Notification => f.write_str("Severity: Notification"),
            Self::Unknown(value) => write!(f, "Severity: Unknown ({})", value),
        }
    }
}

/// Format one driver message into a single diagnostic line.
#[must_use]
pub fn format_debug_message(
    id: u32,
    source: DebugSource,
    ty: DebugType,
    severity: DebugSeverity,
    text: &str,
) -> String {
    format!(
        "OpenGL debug message {} ({} {} {}): {}",
        id, source, ty, severity, text
    )
}

/// Receiver for driver debug messages.
///
/// The driver invokes the sink synchronously on the thread that issued the
/// GL call, never concurrently.
pub trait DebugMessageSink {
    /// Deliver one classified message.
    fn emit(
        &self,
        source: DebugSource,
        ty: DebugType,
        severity: DebugSeverity,
        id: u32,
        text: &str,
    );
}

/// Default sink: formats each message and logs it at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DebugMessageSink for LogSink {
    fn emit(
        &self,
        source: DebugSource,
        ty: DebugType,
        severity: DebugSeverity,
        id: u32,
        text: &str,
    ) {
        log::info!("{}", format_debug_message(id, source, ty, severity, text));
    }
}

/// Classify raw callback arguments and hand them to `sink`.
pub fn dispatch_raw(
    sink: &dyn DebugMessageSink,
    source: u32,
    ty: u32,
    id: u32,
    severity: u32,
    text: &str,
) {
    sink.emit(
        DebugSource::from_gl(source),
        DebugType::from_gl(ty),
        DebugSeverity::from_gl(severity),
        id,
        text,
    );
}
