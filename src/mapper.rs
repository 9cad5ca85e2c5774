//! Mapping from abstract host colors to device color commands.

use crate::capabilities::{DeviceColor, LightColor};

/// Device color for an abstract host color.
pub const fn device_color(color: LightColor) -> DeviceColor {
    match color {
        LightColor::Primary => DeviceColor::Green,
        LightColor::Custom1 => DeviceColor::Red,
        LightColor::Custom2 => DeviceColor::Yellow,
        LightColor::Custom3 => DeviceColor::Orange,
        LightColor::Custom4 => DeviceColor::Blue,
        LightColor::Custom5 => DeviceColor::Magenta,
    }
}

/// Device color for a raw host color code. Unknown codes map to `Off`.
pub fn device_color_for_code(code: u32) -> DeviceColor {
    LightColor::from_code(code).map_or(DeviceColor::Off, device_color)
}
