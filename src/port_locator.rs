//! Serial port resolution based on hardware identifiers.
//!
//! The light enumerates as a USB CDC device whose port name (`COM7`,
//! `/dev/ttyACM0`, ...) is assigned by the platform and can change between
//! reboots. This module finds the port from the stable vendor/product pair
//! instead.
//!
//! # Device index
//!
//! Platforms keep an enumeration tree of the form
//!
//! ```text
//! VID_03EB&PID_2404            <- identifier entry, matched by pattern
//! ├── 6&2c5b3f1&0&1            <- child key (one per instance)
//! │   └── PortName = COM7
//! └── 7&11a0e3c&0&2
//!     └── PortName = COM9
//! ```
//!
//! [`DeviceIndex`] abstracts that tree so the matching rules stay the same on
//! every platform. [`SerialportIndex`] builds it from the platform serial-port
//! enumeration; [`MemoryIndex`] holds an explicit tree.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rgb_light::capabilities::HardwareIdentifier;
//! use rgb_light::port_locator::{IndexPortLocator, PortLocator, SerialportIndex};
//!
//! let locator = IndexPortLocator::new(SerialportIndex);
//! let port = locator.locate(&HardwareIdentifier::RGB_LIGHT)?;
//! ```
//!
//! When several instances are attached, the first port encountered while
//! walking the index wins. Walk order is backend-defined and not guaranteed
//! stable.

use crate::capabilities::HardwareIdentifier;
use crate::error::{LightError, LightResult};
use regex::Regex;

/// One identifier entry of a device index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Identifier string, e.g. `VID_03EB&PID_2404`
    pub id: String,
    /// Instance keys below the identifier
    pub children: Vec<IndexChild>,
}

/// One instance key below an identifier entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexChild {
    /// Instance key (serial number or platform instance path)
    pub key: String,
    /// Port name attribute, if the instance has one
    pub port_name: Option<String>,
}

impl IndexEntry {
    /// Create an entry with no children.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
        }
    }

    /// Add an instance with a port name.
    pub fn with_port(mut self, key: impl Into<String>, port_name: impl Into<String>) -> Self {
        self.children.push(IndexChild {
            key: key.into(),
            port_name: Some(port_name.into()),
        });
        self
    }

    /// Add an instance without a port name attribute.
    pub fn with_portless(mut self, key: impl Into<String>) -> Self {
        self.children.push(IndexChild {
            key: key.into(),
            port_name: None,
        });
        self
    }
}

/// Queryable device-enumeration index.
pub trait DeviceIndex: Send + Sync {
    /// Snapshot of all identifier entries in traversal order.
    fn entries(&self) -> LightResult<Vec<IndexEntry>>;
}

/// Resolves a hardware identifier to a port name.
pub trait PortLocator: Send + Sync {
    /// Find the port for `id`.
    fn locate(&self, id: &HardwareIdentifier) -> LightResult<String>;
}

// =============================================================================
// Locators
// =============================================================================

/// Locator walking a [`DeviceIndex`].
#[derive(Debug, Clone, Default)]
pub struct IndexPortLocator<I> {
    index: I,
}

impl<I: DeviceIndex> IndexPortLocator<I> {
    /// Create a locator over `index`.
    pub fn new(index: I) -> Self {
        Self { index }
    }

    /// All port names matching `id`, in traversal order.
    pub fn candidates(&self, id: &HardwareIdentifier) -> LightResult<Vec<String>> {
        let pattern = Regex::new(&id.pattern()).map_err(|e| {
            LightError::Configuration(format!("invalid hardware-id pattern: {}", e))
        })?;

        let ports = self
            .index
            .entries()?
            .into_iter()
            .filter(|entry| pattern.is_match(&entry.id))
            .flat_map(|entry| entry.children)
            .filter_map(|child| child.port_name)
            .collect();
        Ok(ports)
    }
}

impl<I: DeviceIndex> PortLocator for IndexPortLocator<I> {
    fn locate(&self, id: &HardwareIdentifier) -> LightResult<String> {
        let mut ports = self.candidates(id)?.into_iter();
        let first = ports
            .next()
            .ok_or_else(|| LightError::DeviceNotFound(id.to_string()))?;

        let others: Vec<String> = ports.collect();
        if !others.is_empty() {
            tracing::warn!(
                hardware_id = %id,
                port = %first,
                ignored = ?others,
                "Multiple devices match hardware id, using the first one"
            );
        }

        tracing::debug!(hardware_id = %id, port = %first, "Located device port");
        Ok(first)
    }
}

/// Locator returning a configured port name, bypassing discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPort(pub String);

impl PortLocator for FixedPort {
    fn locate(&self, _id: &HardwareIdentifier) -> LightResult<String> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Index backends
// =============================================================================

/// Index held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryIndex {
    entries: Vec<IndexEntry>,
}

impl MemoryIndex {
    /// Create an index from explicit entries.
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry.
    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }
}

impl DeviceIndex for MemoryIndex {
    fn entries(&self) -> LightResult<Vec<IndexEntry>> {
        Ok(self.entries.clone())
    }
}

/// Index built from the platform serial-port enumeration.
///
/// USB ports are grouped under their `VID_xxxx&PID_xxxx` identifier in the
/// order the platform reports them; the USB serial number (or the port name
/// when there is none) becomes the instance key. Non-USB ports are skipped.
#[cfg(feature = "instrument_serial")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialportIndex;

#[cfg(feature = "instrument_serial")]
impl DeviceIndex for SerialportIndex {
    fn entries(&self) -> LightResult<Vec<IndexEntry>> {
        use crate::capabilities::format_vid_pid;
        use serialport::SerialPortType;

        let ports = serialport::available_ports().map_err(|e| {
            LightError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Could not enumerate serial ports: {}", e),
            ))
        })?;

        let mut entries: Vec<IndexEntry> = Vec::new();
        for port in ports {
            let SerialPortType::UsbPort(info) = port.port_type else {
                continue;
            };
            let id = format_vid_pid(info.vid, info.pid);
            let key = info
                .serial_number
                .clone()
                .unwrap_or_else(|| port.port_name.clone());

            match entries.iter_mut().find(|e| e.id == id) {
                Some(entry) => entry.children.push(IndexChild {
                    key,
                    port_name: Some(port.port_name),
                }),
                None => entries.push(IndexEntry::new(id).with_port(key, port.port_name)),
            }
        }

        tracing::debug!(entries = entries.len(), "Enumerated USB serial ports");
        Ok(entries)
    }
}
