//! Configuration loading using Figment.
//!
//! Configuration is loaded from:
//! 1. a TOML file (default `config/rgb_light.toml`, optional)
//! 2. environment variables prefixed with `RGB_LIGHT_`, nested keys separated
//!    by a double underscore (e.g. `RGB_LIGHT_DEVICE__PORT=/dev/ttyACM0`)
//!
//! Every field has a default, so an empty configuration describes the stock
//! light on an auto-discovered port.
//!
//! # Example
//! ```no_run
//! use rgb_light::config::LightConfig;
//!
//! let config = LightConfig::load()?;
//! config.validate()?;
//! println!("Looking for {}", config.hardware_id()?);
//! # Ok::<(), rgb_light::error::LightError>(())
//! ```

use crate::capabilities::HardwareIdentifier;
use crate::error::{LightError, LightResult};
use crate::session::{BlinkMode, SessionConfig};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/rgb_light.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Device discovery and claiming
    pub device: DeviceConfig,
    /// Blinking behavior
    pub blink: BlinkConfig,
    /// Health check behavior
    pub health: HealthConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Device discovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// USB vendor id, hex
    pub vendor_id: String,
    /// USB product id, hex
    pub product_id: String,
    /// Device revision, hex
    pub revision: String,
    /// Fixed port name; skips discovery when set
    pub port: Option<String>,
    /// Claim timeout in milliseconds
    pub claim_timeout_ms: u64,
}

/// Blink configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Software loop or hardware flashing register
    pub mode: BlinkMode,
}

/// Health check configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Hold time per color during the external check, in milliseconds
    pub external_hold_ms: u64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "rgb_light".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let id = HardwareIdentifier::RGB_LIGHT;
        Self {
            vendor_id: format!("{:04X}", id.vendor_id),
            product_id: format!("{:04X}", id.product_id),
            revision: format!("{:04X}", id.revision),
            port: None,
            claim_timeout_ms: 1000,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            external_hold_ms: 1000,
        }
    }
}

impl LightConfig {
    /// Load configuration from the default file and environment variables.
    pub fn load() -> LightResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> LightResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RGB_LIGHT_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> LightResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(LightError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        self.hardware_id()?;

        if self.device.claim_timeout_ms == 0 {
            return Err(LightError::Configuration(
                "claim_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.health.external_hold_ms == 0 {
            return Err(LightError::Configuration(
                "external_hold_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(port) = &self.device.port {
            if port.trim().is_empty() {
                return Err(LightError::Configuration(
                    "port must not be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Hardware identifier described by the `[device]` section.
    pub fn hardware_id(&self) -> LightResult<HardwareIdentifier> {
        HardwareIdentifier::from_hex(
            &self.device.vendor_id,
            &self.device.product_id,
            &self.device.revision,
        )
    }

    /// Claim timeout.
    pub fn claim_timeout(&self) -> Duration {
        Duration::from_millis(self.device.claim_timeout_ms)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> LightResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LightError::Configuration(format!("Failed to render config: {}", e)))
    }

    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> LightResult<SessionConfig> {
        Ok(SessionConfig {
            hardware_id: self.hardware_id()?,
            blink_mode: self.blink.mode,
            external_hold: Duration::from_millis(self.health.external_hold_ms),
        })
    }
}
