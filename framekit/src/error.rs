//! Error types for Framekit
//!
//! This module defines the error types used throughout the crate,
//! including configuration faults raised before any context call,
//! backend failures and resource lookups.

use std::fmt;
use crate::graphics_context::{FramebufferId, SurfaceKey};

/// Result type for Framekit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Framekit errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (software, OpenGL, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unknown surface, destroyed framebuffer, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, context registration)
    InitializationFailed(String),

    /// Local configuration fault, detected before any context call
    Configuration {
        /// Render target the fault was raised on
        target: FramebufferId,
        /// What was wrong with the request
        message: String,
    },

    /// Operation is not supported by this kind of render target
    NotSupported(String),

    /// Reallocation requested beyond the level count of immutable storage
    FixedStorage {
        /// Surface whose storage is immutable
        surface: SurfaceKey,
        /// Requested mip level
        level: u32,
        /// Level count fixed at allocation
        level_count: u32,
    },
}

impl Error {
    /// Build a configuration fault for `target`
    pub fn configuration(target: FramebufferId, message: impl Into<String>) -> Self {
        Error::Configuration {
            target,
            message: message.into(),
        }
    }

    /// True for faults detected locally, before the context was called
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::NotSupported(_) | Error::FixedStorage { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Configuration { target, message } => {
                write!(f, "Configuration fault on render target {}: {}", target, message)
            }
            Error::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            Error::FixedStorage { surface, level, level_count } => write!(
                f,
                "Immutable storage of surface {:?} has {} level(s), level {} cannot be reallocated",
                surface, level_count, level
            ),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR and build an `Error::BackendError` from the message
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("framekit::soft", "Surface {:?} not found", key);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::framekit::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log an ERROR and return a configuration fault carrying the offending target
///
/// # Example
///
/// ```ignore
/// config_bail!("framekit::RenderTarget", self.id, "Width must be positive");
/// ```
#[macro_export]
macro_rules! config_bail {
    ($source:expr, $target:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "[{}] {}", $target, message);
        return Err($crate::framekit::Error::configuration($target, message));
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
