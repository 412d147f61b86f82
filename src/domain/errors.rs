/// Flat error set for the chart engine.
///
/// Nothing in the frame path returns these to the caller; they surface at
/// configuration time, at adapter boundaries and in snapshot export, where
/// they are logged and swallowed.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    ValidationError(String),
    ConfigError(String),
    RenderingError(String),
    CapabilityMissing(&'static str),
    ExportError(String),
    BridgeError(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config Error: {}", msg),
            AppError::RenderingError(msg) => write!(f, "Rendering Error: {}", msg),
            AppError::CapabilityMissing(name) => write!(f, "Capability Missing: {}", name),
            AppError::ExportError(msg) => write!(f, "Export Error: {}", msg),
            AppError::BridgeError(msg) => write!(f, "JS Bridge Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
pub type RenderingResult<T> = Result<T, AppError>;
