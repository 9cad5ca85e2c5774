//! Device self-tests.
//!
//! Three levels are defined by the host API:
//!
//! - `Interactive` - not supported by this device
//! - `Internal` - identity query; a failed query is reported, not raised
//! - `External` - visual self-test cycling through every device color
//!
//! The result is a free-text status the session records and exposes.

use crate::capabilities::DeviceColor;
use crate::error::{LightError, LightResult};
use crate::transport::{SharedDevice, READ_ID_FAILED};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status text of a successful internal check.
pub const INTERNAL_SUCCESSFUL: &str = "Internal HCheck: Successful";
/// Status text of a failed internal check.
pub const INTERNAL_FAILED: &str = "Internal HCheck: Failed";
/// Status text of a finished external check.
pub const EXTERNAL_COMPLETE: &str = "External HCheck: Complete";

/// Health check level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    /// Operator-assisted check
    Interactive,
    /// Non-visual check against the device
    Internal,
    /// Visual self-test
    External,
}

impl std::str::FromStr for HealthLevel {
    type Err = LightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interactive" => Ok(HealthLevel::Interactive),
            "internal" => Ok(HealthLevel::Internal),
            "external" => Ok(HealthLevel::External),
            _ => Err(LightError::InvalidArgument(format!(
                "unknown health level '{}'",
                s
            ))),
        }
    }
}

/// Runs health checks against an open device.
pub struct HealthChecker<'a> {
    device: &'a SharedDevice,
    hold: Duration,
}

impl<'a> HealthChecker<'a> {
    /// Checker holding each color for `hold` during the external test.
    pub fn new(device: &'a SharedDevice, hold: Duration) -> Self {
        Self { device, hold }
    }

    /// Run the check for `level` and return its status text.
    pub async fn check(&self, level: HealthLevel) -> LightResult<String> {
        match level {
            HealthLevel::Interactive => Err(LightError::UnsupportedOperation(
                "interactive health check".to_string(),
            )),
            HealthLevel::Internal => Ok(self.internal().await.to_string()),
            HealthLevel::External => {
                self.external().await?;
                Ok(EXTERNAL_COMPLETE.to_string())
            }
        }
    }

    async fn internal(&self) -> &'static str {
        let id = self.device.lock().await.read_id().await;
        match id {
            Ok(READ_ID_FAILED) => {
                tracing::warn!("Identity query returned failure sentinel");
                INTERNAL_FAILED
            }
            Ok(id) => {
                tracing::debug!(id, "Identity query succeeded");
                INTERNAL_SUCCESSFUL
            }
            Err(e) => {
                tracing::warn!(error = %e, "Identity query failed");
                INTERNAL_FAILED
            }
        }
    }

    /// Cycle through every color. Holds the device lock for the whole run so a
    /// blink loop pauses instead of interleaving its writes.
    async fn external(&self) -> LightResult<()> {
        let mut device = self.device.lock().await;
        device.save_color().await?;
        for color in DeviceColor::ALL {
            device.set_color(color).await?;
            tokio::time::sleep(self.hold).await;
        }
        device.resume_color().await?;
        Ok(())
    }
}
