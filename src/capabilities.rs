//! Declarative capability surface of the light.
//!
//! Everything in here is fixed for the lifetime of the process: the hardware
//! identifier the host matches against, the abstract colors and alarms a host
//! may request, and the concrete colors the device itself understands.

use crate::error::{LightError, LightResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Hardware identifier
// =============================================================================

/// USB hardware identifier used to find the light on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareIdentifier {
    /// USB vendor id
    pub vendor_id: u16,
    /// USB product id
    pub product_id: u16,
    /// Device revision (bcdDevice)
    pub revision: u16,
}

impl HardwareIdentifier {
    /// Identifier of the RGB light controller.
    pub const RGB_LIGHT: HardwareIdentifier = HardwareIdentifier::new(0x03EB, 0x2404, 0x0100);

    /// Create an identifier from its numeric parts.
    pub const fn new(vendor_id: u16, product_id: u16, revision: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            revision,
        }
    }

    /// Parse an identifier from hex strings such as `"03EB"`.
    pub fn from_hex(vendor: &str, product: &str, revision: &str) -> LightResult<Self> {
        Ok(Self::new(
            parse_hex_field("vendor_id", vendor)?,
            parse_hex_field("product_id", product)?,
            parse_hex_field("revision", revision)?,
        ))
    }

    /// The `VID_xxxx&PID_xxxx` form used by device-enumeration indices.
    pub fn vid_pid(&self) -> String {
        format_vid_pid(self.vendor_id, self.product_id)
    }

    /// Regex source matching enumeration keys for this vendor/product pair.
    ///
    /// The separator between the vendor and product parts is left open since
    /// platforms disagree on it (`&`, `+`, `_`).
    pub fn pattern(&self) -> String {
        format!(
            "(?i)^VID_{:04X}.PID_{:04X}",
            self.vendor_id, self.product_id
        )
    }
}

impl Default for HardwareIdentifier {
    fn default() -> Self {
        Self::RGB_LIGHT
    }
}

impl fmt::Display for HardwareIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USB\\VID_{:04X}&PID_{:04X}&REV_{:04X}",
            self.vendor_id, self.product_id, self.revision
        )
    }
}

/// Format a vendor/product pair the way enumeration indices key it.
pub fn format_vid_pid(vendor_id: u16, product_id: u16) -> String {
    format!("VID_{:04X}&PID_{:04X}", vendor_id, product_id)
}

fn parse_hex_field(field: &str, value: &str) -> LightResult<u16> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16).map_err(|_| {
        LightError::Configuration(format!("{} '{}' is not a 16-bit hex value", field, value))
    })
}

// =============================================================================
// Abstract colors and alarms
// =============================================================================

/// Abstract light color a host can request.
///
/// Raw codes are the flag values POS hosts pass across their API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    /// The primary color
    Primary,
    /// First custom slot
    Custom1,
    /// Second custom slot
    Custom2,
    /// Third custom slot
    Custom3,
    /// Fourth custom slot
    Custom4,
    /// Fifth custom slot
    Custom5,
}

impl LightColor {
    /// All colors, in declaration order.
    pub const ALL: [LightColor; 6] = [
        LightColor::Primary,
        LightColor::Custom1,
        LightColor::Custom2,
        LightColor::Custom3,
        LightColor::Custom4,
        LightColor::Custom5,
    ];

    /// Host flag value for this color.
    pub const fn code(self) -> u32 {
        match self {
            LightColor::Primary => 1,
            LightColor::Custom1 => 2,
            LightColor::Custom2 => 4,
            LightColor::Custom3 => 8,
            LightColor::Custom4 => 16,
            LightColor::Custom5 => 32,
        }
    }

    /// Look up a color by its host flag value.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl TryFrom<u32> for LightColor {
    type Error = LightError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(LightError::InvalidEnumValue {
            kind: "color",
            value: code,
        })
    }
}

impl std::str::FromStr for LightColor {
    type Err = LightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(LightColor::Primary),
            "custom1" => Ok(LightColor::Custom1),
            "custom2" => Ok(LightColor::Custom2),
            "custom3" => Ok(LightColor::Custom3),
            "custom4" => Ok(LightColor::Custom4),
            "custom5" => Ok(LightColor::Custom5),
            _ => Err(LightError::InvalidArgument(format!(
                "unknown color '{}' (expected primary or custom1..custom5)",
                s
            ))),
        }
    }
}

/// Abstract alarm a host can request alongside a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightAlarm {
    /// No alarm
    #[default]
    None,
}

impl LightAlarm {
    /// Host flag value for this alarm.
    pub const fn code(self) -> u32 {
        match self {
            LightAlarm::None => 0,
        }
    }
}

impl TryFrom<u32> for LightAlarm {
    type Error = LightError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(LightAlarm::None),
            _ => Err(LightError::InvalidEnumValue {
                kind: "alarm",
                value: code,
            }),
        }
    }
}

// =============================================================================
// Device colors
// =============================================================================

/// Concrete color the device's command set understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceColor {
    /// All channels off
    Off,
    /// Red
    Red,
    /// Green
    Green,
    /// Blue
    Blue,
    /// Yellow
    Yellow,
    /// Orange
    Orange,
    /// Magenta
    Magenta,
}

impl DeviceColor {
    /// Every device color in canonical enumeration order.
    pub const ALL: [DeviceColor; 7] = [
        DeviceColor::Off,
        DeviceColor::Red,
        DeviceColor::Green,
        DeviceColor::Blue,
        DeviceColor::Yellow,
        DeviceColor::Orange,
        DeviceColor::Magenta,
    ];
}

impl fmt::Display for DeviceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceColor::Off => "off",
            DeviceColor::Red => "red",
            DeviceColor::Green => "green",
            DeviceColor::Blue => "blue",
            DeviceColor::Yellow => "yellow",
            DeviceColor::Orange => "orange",
            DeviceColor::Magenta => "magenta",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Capability set
// =============================================================================

/// Capability set the light declares to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCapabilities {
    /// Number of individually addressable lights
    pub max_lights: i32,
    /// Supported abstract colors
    pub colors: &'static [LightColor],
    /// Supported alarms
    pub alarms: &'static [LightAlarm],
    /// Whether blinking is supported
    pub blink: bool,
}

/// Static capabilities of the RGB light.
pub const RGB_LIGHT_CAPABILITIES: LightCapabilities = LightCapabilities {
    max_lights: 1,
    colors: &LightColor::ALL,
    alarms: &[LightAlarm::None],
    blink: true,
};

impl LightCapabilities {
    /// Combined host flag value of all supported colors.
    pub fn color_mask(&self) -> u32 {
        self.colors.iter().fold(0, |mask, c| mask | c.code())
    }

    /// Check whether a color is supported.
    pub fn supports_color(&self, color: LightColor) -> bool {
        self.colors.contains(&color)
    }

    /// Check whether an alarm is supported.
    pub fn supports_alarm(&self, alarm: LightAlarm) -> bool {
        self.alarms.contains(&alarm)
    }
}
