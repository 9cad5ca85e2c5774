//! Device command transport abstractions.
//!
//! The transport turns semantic requests (set a color, save/restore it, read
//! the device id) into whatever the device speaks on its serial link. The
//! session never sees bytes; it only talks to a [`LightTransport`].
//!
//! # Types
//!
//! - [`LightTransport`]: command capability of an open device
//! - [`Connector`]: opens a transport for a resolved port name
//! - [`SharedDevice`]: the handle shared between the session and its blink task

use crate::capabilities::DeviceColor;
use crate::error::{LightError, LightResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Identity value a device reports when the id query fails.
pub const READ_ID_FAILED: i32 = -1;

/// On/off durations of one blink cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkCycle {
    /// Time the light stays lit
    pub on: Duration,
    /// Time the light stays dark
    pub off: Duration,
}

impl BlinkCycle {
    /// Create a cycle from millisecond durations.
    pub fn from_millis(on_ms: u64, off_ms: u64) -> Self {
        Self {
            on: Duration::from_millis(on_ms),
            off: Duration::from_millis(off_ms),
        }
    }

    /// Length of one full cycle.
    pub fn period(&self) -> Duration {
        self.on + self.off
    }
}

/// Command capability of an open light.
#[async_trait]
pub trait LightTransport: Send {
    /// Set the light to a color.
    async fn set_color(&mut self, color: DeviceColor) -> LightResult<()>;

    /// Remember the currently displayed color.
    async fn save_color(&mut self) -> LightResult<()>;

    /// Show the color remembered by [`LightTransport::save_color`].
    async fn resume_color(&mut self) -> LightResult<()>;

    /// Query the device identity. [`READ_ID_FAILED`] signals a failed query.
    async fn read_id(&mut self) -> LightResult<i32>;

    /// Program the device's own flashing period, or clear it with `None`.
    ///
    /// Only some firmware revisions have a flashing register.
    async fn set_flashing_period(&mut self, cycle: Option<BlinkCycle>) -> LightResult<()> {
        let _ = cycle;
        Err(LightError::UnsupportedOperation(
            "hardware flashing period".to_string(),
        ))
    }

    /// Close the link. The transport is dropped afterwards.
    async fn close(&mut self) -> LightResult<()> {
        Ok(())
    }
}

/// Opens a transport on a resolved port.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open the device on `port_name`.
    async fn connect(&self, port_name: &str) -> LightResult<Box<dyn LightTransport>>;
}

/// Device handle shared between the session and its blink task.
pub type SharedDevice = Arc<Mutex<Box<dyn LightTransport>>>;

/// Wrap an open transport into a [`SharedDevice`].
pub fn wrap_shared(transport: Box<dyn LightTransport>) -> SharedDevice {
    Arc::new(Mutex::new(transport))
}
