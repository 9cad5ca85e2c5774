//! # RGB Light Session Library
//!
//! Controller for a single USB RGB indicator light used as the status lamp
//! of a point-of-sale station. The host sees an abstract light: it claims the
//! device, switches it on in one of six abstract colors (optionally
//! blinking), switches it off, runs health checks and releases it again.
//!
//! ## Crate Structure
//!
//! - **`capabilities`**: Hardware identifier, abstract and physical color sets,
//!   and the capability set declared to the host.
//! - **`mapper`**: Fixed mapping from abstract colors to device colors.
//! - **`transport`**: `LightTransport` and `Connector` traits the session drives.
//!   The serial protocol itself lives behind these traits.
//! - **`port_locator`**: Finds the serial port of the light from its USB
//!   vendor/product identifier.
//! - **`session`**: `LightSession`, the claim/switch/release state machine.
//! - **`blink`**: Background blink loop with generation-based superseding.
//! - **`health`**: Internal and external self-tests.
//! - **`mock`**: In-memory light recording every command, used by tests and
//!   the `demo` command.
//! - **`config`**: Figment-based configuration (TOML file plus `RGB_LIGHT_*`
//!   environment overrides).
//! - **`logging`**: `tracing-subscriber` setup for binaries.
//! - **`error`**: The `LightError` enum shared by every module.

pub mod blink;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod mapper;
pub mod mock;
pub mod port_locator;
pub mod session;
pub mod transport;

pub use capabilities::{DeviceColor, HardwareIdentifier, LightAlarm, LightColor};
pub use error::{LightError, LightResult};
pub use health::HealthLevel;
pub use session::{BlinkMode, LightRequest, LightSession, SessionConfig, SessionState};
