//! Custom error types for the light session.
//!
//! This module defines the primary error type, `LightError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! everything that can go wrong between the host call and the device handle.
//!
//! ## Error Hierarchy
//!
//! `LightError` groups into four broad kinds (see [`ErrorKind`]):
//!
//! 1. **Validation** - `InvalidLightSelection`, `InvalidArgument`, `InvalidEnumValue`
//!    - Raised synchronously before any device I/O
//!    - Recovery: fix the request and call again
//!
//! 2. **Unsupported** - `UnsupportedOperation`
//!    - The device never supports the operation (interactive health check, direct I/O)
//!
//! 3. **Device** - `DeviceNotFound`, `DeviceUnavailable`, `DeviceCommandFailure`
//!    - Discovery, open or command failures against the hardware
//!    - Recovery: check cabling, re-claim
//!
//! 4. **Environment** - `Config`, `Io`
//!    - Configuration loading and platform I/O problems
//!
//! Internal health-check failures are deliberately *not* represented here; they are
//! reported as status text by [`crate::health`].

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type LightResult<T> = std::result::Result<T, LightError>;

/// Coarse classification of a [`LightError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before touching the device.
    Validation,
    /// The operation is never supported by this device.
    Unsupported,
    /// Discovery, open or command failure against the device.
    Device,
    /// Configuration or platform I/O failure.
    Environment,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Device => "device",
            ErrorKind::Environment => "environment",
        };
        write!(f, "{}", label)
    }
}

/// Primary error type for the light session.
#[derive(Error, Debug)]
pub enum LightError {
    #[error("Invalid light selected ({0}), only light 1 is supported")]
    InvalidLightSelection(i32),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid {kind} value: {value}")]
    InvalidEnumValue { kind: &'static str, value: u32 },

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    #[error("No device found matching {0}")]
    DeviceNotFound(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Device command failed: {0}")]
    DeviceCommandFailure(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LightError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LightError::InvalidLightSelection(_)
            | LightError::InvalidArgument(_)
            | LightError::InvalidEnumValue { .. } => ErrorKind::Validation,
            LightError::UnsupportedOperation(_) => ErrorKind::Unsupported,
            LightError::DeviceNotFound(_)
            | LightError::DeviceUnavailable(_)
            | LightError::DeviceCommandFailure(_) => ErrorKind::Device,
            LightError::Config(_) | LightError::Configuration(_) | LightError::Io(_) => {
                ErrorKind::Environment
            }
        }
    }
}

impl From<figment::Error> for LightError {
    fn from(value: figment::Error) -> Self {
        LightError::Config(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            LightError::InvalidLightSelection(2).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LightError::InvalidEnumValue {
                kind: "color",
                value: 3
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LightError::UnsupportedOperation("direct_io".into()).kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            LightError::DeviceNotFound("VID_03EB".into()).kind(),
            ErrorKind::Device
        );
        assert_eq!(
            LightError::Configuration("bad".into()).kind(),
            ErrorKind::Environment
        );
    }

    #[test]
    fn test_display_messages() {
        let err = LightError::InvalidLightSelection(2);
        assert_eq!(
            err.to_string(),
            "Invalid light selected (2), only light 1 is supported"
        );

        let err = LightError::InvalidEnumValue {
            kind: "alarm",
            value: 7,
        };
        assert_eq!(err.to_string(), "Invalid alarm value: 7");
        assert_eq!(ErrorKind::Device.to_string(), "device");
    }
}
