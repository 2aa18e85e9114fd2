//! Error handling for svcctl.
use thiserror::Error;

use crate::native::NativeError;

/// Errors raised synchronously by the library.
///
/// Native, timeout and cancellation failures of the control operations are
/// never raised; they are folded into an [`crate::result::OpResult`].
#[derive(Debug, Error)]
pub enum ServiceManagerError {
    /// A required identifier was empty or whitespace only.
    #[error("Value cannot be null/empty: '{field}'")]
    InvalidArgument {
        /// Name of the offending field.
        field: String,
    },

    /// The host has no Service Control Manager.
    #[error("Service control is only supported on Windows")]
    PlatformUnsupported,

    /// A single "change config" request was rejected by the native surface.
    #[error("Failed to apply {operation}: {source}")]
    Configuration {
        /// The configuration step that failed.
        operation: &'static str,
        /// The native failure, including its OS error code.
        #[source]
        source: NativeError,
    },

    /// Error reading or accessing a manifest file.
    #[error("Failed to read config file: {0}")]
    ConfigReadError(#[from] std::io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    /// The manifest parsed but holds an unusable value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceManagerError {
    /// Native error code carried by a [`ServiceManagerError::Configuration`] failure.
    pub fn native_code(&self) -> Option<u32> {
        match self {
            Self::Configuration { source, .. } => source.code(),
            _ => None,
        }
    }
}
