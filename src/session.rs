//! Light session controller.
//!
//! `LightSession` is what a point-of-sale host drives. It owns the device
//! handle between `claim` and `release`, validates every request before any
//! device I/O, and keeps at most one blink task alive.
//!
//! # Lifecycle
//!
//! ```text
//!            claim (locate port, open handle)
//! Unclaimed ─────────────────────────────────▶ Claimed
//!     ▲                                           │
//!     └──────────── release (cancel blink, close) ┘
//! ```
//!
//! Foreground operations take `&mut self`, so a session cannot run two of
//! them at once. The only concurrent writer is the session's own blink task,
//! which is serialized against the foreground through the device lock and
//! the blink generation (see [`crate::blink`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use rgb_light::capabilities::LightColor;
//! use rgb_light::mock::{MockConnector, MockLight};
//! use rgb_light::port_locator::FixedPort;
//! use rgb_light::session::{LightRequest, LightSession, SessionConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> rgb_light::error::LightResult<()> {
//! let mut session = LightSession::new(
//!     SessionConfig::default(),
//!     Arc::new(FixedPort("/dev/ttyACM0".into())),
//!     Arc::new(MockConnector::new(MockLight::new())),
//! );
//! session.claim(Duration::from_secs(1)).await?;
//! session.switch_on(LightRequest::new(1, LightColor::Custom1).blink(500, 500)).await?;
//! session.release().await;
//! # Ok(())
//! # }
//! ```

use crate::blink::BlinkScheduler;
use crate::capabilities::{
    DeviceColor, HardwareIdentifier, LightAlarm, LightCapabilities, LightColor,
    RGB_LIGHT_CAPABILITIES,
};
use crate::error::{LightError, LightResult};
use crate::health::{HealthChecker, HealthLevel};
use crate::mapper;
use crate::port_locator::PortLocator;
use crate::transport::{wrap_shared, BlinkCycle, Connector, SharedDevice};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Claim state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device handle; every command fails
    Unclaimed,
    /// Device handle open
    Claimed,
}

/// How blinking is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlinkMode {
    /// Background task toggling the light
    #[default]
    Software,
    /// The device's own flashing period register
    Hardware,
}

/// Session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Identifier used to locate the device port
    pub hardware_id: HardwareIdentifier,
    /// Blink implementation
    pub blink_mode: BlinkMode,
    /// Hold per color during the external health check
    pub external_hold: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hardware_id: HardwareIdentifier::RGB_LIGHT,
            blink_mode: BlinkMode::Software,
            external_hold: Duration::from_millis(1000),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A `switch_on` request in the host's raw terms.
///
/// Durations are signed and color/alarm are raw codes so that every host
/// input can be represented and rejected by [`LightRequest::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightRequest {
    /// Light index (only 1 exists)
    pub light_number: i32,
    /// Blink on-time in milliseconds
    pub blink_on_ms: i32,
    /// Blink off-time in milliseconds
    pub blink_off_ms: i32,
    /// Raw color code
    pub color: u32,
    /// Raw alarm code
    pub alarm: u32,
}

/// A request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Requested color
    pub color: LightColor,
    /// Requested alarm
    pub alarm: LightAlarm,
    /// Blink cycle, when both durations are non-zero
    pub blink: Option<BlinkCycle>,
}

impl LightRequest {
    /// Steady `color` on `light_number`.
    pub fn new(light_number: i32, color: LightColor) -> Self {
        Self {
            light_number,
            blink_on_ms: 0,
            blink_off_ms: 0,
            color: color.code(),
            alarm: LightAlarm::None.code(),
        }
    }

    /// Request built from raw host values.
    pub fn raw(
        light_number: i32,
        blink_on_ms: i32,
        blink_off_ms: i32,
        color: u32,
        alarm: u32,
    ) -> Self {
        Self {
            light_number,
            blink_on_ms,
            blink_off_ms,
            color,
            alarm,
        }
    }

    /// Blink with the given on/off durations.
    pub fn blink(mut self, on_ms: i32, off_ms: i32) -> Self {
        self.blink_on_ms = on_ms;
        self.blink_off_ms = off_ms;
        self
    }

    /// Attach an alarm.
    pub fn alarm(mut self, alarm: LightAlarm) -> Self {
        self.alarm = alarm.code();
        self
    }

    /// Validate against the light's capabilities. The first failing check wins:
    /// light number, durations, alarm, color.
    pub fn validate(&self, caps: &LightCapabilities) -> LightResult<ValidatedRequest> {
        check_light_number(self.light_number, caps)?;

        if self.blink_on_ms < 0 || self.blink_off_ms < 0 {
            return Err(LightError::InvalidArgument(format!(
                "blink durations must not be negative (on {} ms, off {} ms)",
                self.blink_on_ms, self.blink_off_ms
            )));
        }

        let alarm = LightAlarm::try_from(self.alarm)?;
        if !caps.supports_alarm(alarm) {
            return Err(LightError::InvalidEnumValue {
                kind: "alarm",
                value: self.alarm,
            });
        }

        let color = LightColor::try_from(self.color)?;
        if !caps.supports_color(color) {
            return Err(LightError::InvalidEnumValue {
                kind: "color",
                value: self.color,
            });
        }

        let blink = (self.blink_on_ms != 0 && self.blink_off_ms != 0).then(|| {
            BlinkCycle::from_millis(self.blink_on_ms as u64, self.blink_off_ms as u64)
        });

        Ok(ValidatedRequest {
            color,
            alarm,
            blink,
        })
    }
}

fn check_light_number(light_number: i32, caps: &LightCapabilities) -> LightResult<()> {
    if light_number < 1 || light_number > caps.max_lights {
        return Err(LightError::InvalidLightSelection(light_number));
    }
    Ok(())
}

/// Data returned by a direct I/O call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectIoData {
    /// Returned data word
    pub data: i32,
    /// Returned payload
    pub payload: Vec<u8>,
}

// =============================================================================
// LightSession
// =============================================================================

/// Session controller for one RGB light.
pub struct LightSession {
    config: SessionConfig,
    locator: Arc<dyn PortLocator>,
    connector: Arc<dyn Connector>,
    state: SessionState,
    device: Option<SharedDevice>,
    port_name: Option<String>,
    blink: BlinkScheduler,
    health_text: String,
}

impl LightSession {
    /// Create an unclaimed session.
    pub fn new(
        config: SessionConfig,
        locator: Arc<dyn PortLocator>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            locator,
            connector,
            state: SessionState::Unclaimed,
            device: None,
            port_name: None,
            blink: BlinkScheduler::new(),
            health_text: String::new(),
        }
    }

    /// Current claim state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Capability set declared to the host.
    pub fn capabilities(&self) -> &'static LightCapabilities {
        &RGB_LIGHT_CAPABILITIES
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Status text of the last health check; empty until one ran.
    pub fn health_text(&self) -> &str {
        &self.health_text
    }

    /// Port the device was opened on, while claimed.
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Whether a software blink task is active and still running.
    pub fn is_blinking(&self) -> bool {
        self.blink.active().is_some_and(|task| !task.is_finished())
    }

    /// Blink loops still running, including superseded ones that have not
    /// observed cancellation yet.
    pub fn live_blink_tasks(&self) -> usize {
        self.blink.live_tasks()
    }

    /// Locate the device and open a handle on it.
    ///
    /// Claiming an already claimed session is a no-op.
    #[instrument(skip(self), fields(hardware_id = %self.config.hardware_id), err)]
    pub async fn claim(&mut self, timeout: Duration) -> LightResult<()> {
        if self.state == SessionState::Claimed {
            tracing::debug!("Session already claimed");
            return Ok(());
        }

        let id = self.config.hardware_id;
        let port_name = self.locator.locate(&id).map_err(|e| match e {
            LightError::DeviceNotFound(_) => e,
            other => LightError::DeviceNotFound(format!("{}: {}", id, other)),
        })?;

        let transport = tokio::time::timeout(timeout, self.connector.connect(&port_name))
            .await
            .map_err(|_| {
                LightError::DeviceUnavailable(format!(
                    "timed out after {} ms opening {}",
                    timeout.as_millis(),
                    port_name
                ))
            })?
            .map_err(|e| match e {
                LightError::DeviceUnavailable(_) => e,
                other => LightError::DeviceUnavailable(format!(
                    "failed to open {}: {}",
                    port_name, other
                )),
            })?;

        tracing::info!(port = %port_name, "Claimed RGB light");
        self.device = Some(wrap_shared(transport));
        self.port_name = Some(port_name);
        self.state = SessionState::Claimed;
        Ok(())
    }

    /// Stop blinking, close the handle and return to `Unclaimed`.
    ///
    /// Does not wait for a blink task to exit. Idempotent.
    #[instrument(skip(self))]
    pub async fn release(&mut self) {
        let Some(device) = self.device.take() else {
            tracing::debug!("Session not claimed, nothing to release");
            return;
        };

        {
            let mut guard = device.lock().await;
            self.blink.cancel();
            if self.config.blink_mode == BlinkMode::Hardware {
                if let Err(e) = guard.set_flashing_period(None).await {
                    tracing::warn!(error = %e, "Failed to clear flashing period on release");
                }
            }
            if let Err(e) = guard.close().await {
                tracing::warn!(error = %e, "Failed to close device handle");
            }
        }

        tracing::info!(port = ?self.port_name, "Released RGB light");
        self.port_name = None;
        self.state = SessionState::Unclaimed;
    }

    /// Turn the light off. Always stops blinking.
    #[instrument(skip(self), err)]
    pub async fn switch_off(&mut self, light_number: i32) -> LightResult<()> {
        check_light_number(light_number, self.capabilities())?;
        let device = self.claimed_device()?;

        let mut guard = device.lock().await;
        self.blink.cancel();
        guard.set_color(DeviceColor::Off).await?;
        if self.config.blink_mode == BlinkMode::Hardware {
            // The light is already off; a stale register only matters to the next switch_on
            if let Err(e) = guard.set_flashing_period(None).await {
                tracing::warn!(error = %e, "Failed to clear flashing period on switch off");
            }
        }
        tracing::debug!("Light switched off");
        Ok(())
    }

    /// Turn the light on, optionally blinking.
    ///
    /// Validation runs completely before any device I/O. A running blink is
    /// superseded under the device lock together with the new color command,
    /// so the old task cannot overwrite it.
    ///
    /// In hardware blink mode the flashing register is programmed before the
    /// color, so a device without one rejects a blink request with nothing
    /// changed. Steady colors tolerate a missing register.
    #[instrument(skip(self), fields(color = request.color, on_ms = request.blink_on_ms, off_ms = request.blink_off_ms), err)]
    pub async fn switch_on(&mut self, request: LightRequest) -> LightResult<()> {
        let validated = request.validate(self.capabilities())?;
        let device = self.claimed_device()?;
        let color = mapper::device_color(validated.color);

        {
            let mut guard = device.lock().await;
            self.blink.cancel();
            if self.config.blink_mode == BlinkMode::Hardware {
                match guard.set_flashing_period(validated.blink).await {
                    Ok(()) => {}
                    Err(LightError::UnsupportedOperation(reason)) if validated.blink.is_none() => {
                        tracing::debug!(%reason, "No flashing register to clear");
                    }
                    Err(e) => return Err(e),
                }
            }
            guard.set_color(color).await?;
        }

        if let (BlinkMode::Software, Some(cycle)) = (self.config.blink_mode, validated.blink) {
            self.blink.start(device, color, cycle);
        }

        tracing::debug!(%color, blink = validated.blink.is_some(), "Light switched on");
        Ok(())
    }

    /// Run a health check and record its status text.
    ///
    /// A software blink is stopped for the external check with its color lit,
    /// so the check saves and restores that color, and is restarted afterwards.
    #[instrument(skip(self), err)]
    pub async fn check_health(&mut self, level: HealthLevel) -> LightResult<String> {
        if level == HealthLevel::Interactive {
            return Err(LightError::UnsupportedOperation(
                "interactive health check".to_string(),
            ));
        }
        let device = self.claimed_device()?;

        let blinking = self
            .blink
            .active()
            .filter(|task| !task.is_finished())
            .map(|task| (task.color(), task.cycle()));
        let paused = match (level, blinking) {
            (HealthLevel::External, Some((color, cycle))) => {
                let mut guard = device.lock().await;
                self.blink.cancel();
                guard.set_color(color).await?;
                Some((color, cycle))
            }
            _ => None,
        };

        let text = HealthChecker::new(&device, self.config.external_hold)
            .check(level)
            .await?;

        if let Some((color, cycle)) = paused {
            tracing::debug!(%color, "Resuming blink after external check");
            self.blink.start(device, color, cycle);
        }
        tracing::info!(?level, status = %text, "Health check finished");
        self.health_text = text.clone();
        Ok(text)
    }

    /// Vendor-specific pass-through. Not supported by this device.
    pub fn direct_io(&self, command: i32, data: i32, payload: &[u8]) -> LightResult<DirectIoData> {
        tracing::debug!(command, data, len = payload.len(), "Rejected direct I/O");
        Err(LightError::UnsupportedOperation("direct I/O".to_string()))
    }

    fn claimed_device(&self) -> LightResult<SharedDevice> {
        match (&self.state, &self.device) {
            (SessionState::Claimed, Some(device)) => Ok(device.clone()),
            _ => Err(LightError::DeviceUnavailable(
                "session is not claimed".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for LightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightSession")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("port_name", &self.port_name)
            .field("blink", &self.blink)
            .field("health_text", &self.health_text)
            .finish()
    }
}
