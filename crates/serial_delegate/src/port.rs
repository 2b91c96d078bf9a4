//! Serial port descriptors, filters, and the port manager seam
//!
//! A [`SerialPortInfo`] describes one device as reported by the host's
//! device service. Requesting pages narrow the chooser with
//! [`SerialPortFilter`]s; the delegate never inspects them, it only hands
//! them to the chooser session.
//!
//! # Example
//!
//! ```
//! use serial_delegate::port::{SerialPortFilter, SerialPortInfo};
//!
//! let port = SerialPortInfo::new("/dev/ttyUSB0").with_usb_ids(0x2341, 0x0043);
//!
//! // Arduino boards only
//! let filters = vec![SerialPortFilter::vendor(0x2341)];
//! assert!(SerialPortFilter::matches_any(&filters, &port));
//!
//! // No filters means "show everything"
//! assert!(SerialPortFilter::matches_any(&[], &port));
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::SerialError;

/// Ephemeral identifier for a port, valid while the device stays connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortToken(Uuid);

impl PortToken {
    /// Allocate a fresh token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Description of a serial port as seen by the device service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPortInfo {
    /// Ephemeral identity, regenerated when the device reconnects
    pub token: PortToken,
    /// OS path of the port (e.g. `/dev/ttyUSB0`, `COM3`)
    pub path: PathBuf,
    /// USB vendor id, if the port is USB-backed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb_vendor_id: Option<u16>,
    /// USB product id, if the port is USB-backed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb_product_id: Option<u16>,
    /// Human-readable name for the chooser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Device serial number; when present grants survive reconnects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

impl SerialPortInfo {
    /// Describe a port at `path` with a fresh token and no USB metadata
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            token: PortToken::new(),
            path: path.into(),
            usb_vendor_id: None,
            usb_product_id: None,
            display_name: None,
            serial_number: None,
        }
    }

    /// Attach USB vendor and product ids
    pub fn with_usb_ids(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.usb_vendor_id = Some(vendor_id);
        self.usb_product_id = Some(product_id);
        self
    }

    /// Attach a display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Attach a serial number
    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    /// Identity that outlives the ephemeral token, if the device has one
    pub fn persistent_id(&self) -> Option<PersistentPortId> {
        let serial_number = self.serial_number.clone()?;
        Some(PersistentPortId {
            usb_vendor_id: self.usb_vendor_id?,
            usb_product_id: self.usb_product_id?,
            serial_number,
        })
    }
}

/// Stable identity of a USB serial device across reconnects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersistentPortId {
    /// USB vendor id
    pub usb_vendor_id: u16,
    /// USB product id
    pub usb_product_id: u16,
    /// Device serial number
    pub serial_number: String,
}

/// Inclusion predicate supplied by the requesting page
///
/// A product id only narrows the match when a vendor id is also set,
/// mirroring how pages express filters (`{usbVendorId, usbProductId}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialPortFilter {
    /// Required USB vendor id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb_vendor_id: Option<u16>,
    /// Required USB product id (ignored without a vendor id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb_product_id: Option<u16>,
}

impl SerialPortFilter {
    /// Match any device from `vendor_id`
    pub fn vendor(vendor_id: u16) -> Self {
        Self {
            usb_vendor_id: Some(vendor_id),
            usb_product_id: None,
        }
    }

    /// Match one specific vendor/product combination
    pub fn product(vendor_id: u16, product_id: u16) -> Self {
        Self {
            usb_vendor_id: Some(vendor_id),
            usb_product_id: Some(product_id),
        }
    }

    /// Check whether `port` satisfies this filter
    pub fn matches(&self, port: &SerialPortInfo) -> bool {
        let Some(vendor_id) = self.usb_vendor_id else {
            return true;
        };
        if port.usb_vendor_id != Some(vendor_id) {
            return false;
        }
        match self.usb_product_id {
            Some(product_id) => port.usb_product_id == Some(product_id),
            None => true,
        }
    }

    /// True if `filters` is empty or any filter matches `port`
    pub fn matches_any(filters: &[SerialPortFilter], port: &SerialPortInfo) -> bool {
        filters.is_empty() || filters.iter().any(|filter| filter.matches(port))
    }
}

/// Handle to the host's serial device service
///
/// The permission store owns one of these per browsing context; the chooser
/// session uses it to enumerate ports before asking the user.
#[async_trait]
pub trait PortManager: Send + Sync {
    /// List the ports currently attached
    ///
    /// # Returns
    ///
    /// * `Ok(ports)` - Current devices, possibly empty
    /// * `Err(...)` - The device service is unavailable
    async fn get_devices(&self) -> Result<Vec<SerialPortInfo>, SerialError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arduino() -> SerialPortInfo {
        SerialPortInfo::new("/dev/ttyACM0").with_usb_ids(0x2341, 0x0043)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = SerialPortFilter::default();
        assert!(filter.matches(&arduino()));
        assert!(filter.matches(&SerialPortInfo::new("/dev/ttyS0")));
    }

    #[test]
    fn test_vendor_filter() {
        let filter = SerialPortFilter::vendor(0x2341);
        assert!(filter.matches(&arduino()));
        assert!(!filter.matches(&SerialPortInfo::new("/dev/ttyS0")));
        assert!(!filter.matches(&SerialPortInfo::new("/dev/ttyUSB1").with_usb_ids(0x0403, 0x6001)));
    }

    #[test]
    fn test_product_filter() {
        assert!(SerialPortFilter::product(0x2341, 0x0043).matches(&arduino()));
        assert!(!SerialPortFilter::product(0x2341, 0x0001).matches(&arduino()));
    }

    #[test]
    fn test_product_without_vendor_is_ignored() {
        let filter = SerialPortFilter {
            usb_vendor_id: None,
            usb_product_id: Some(0x9999),
        };
        assert!(filter.matches(&arduino()));
    }

    #[test]
    fn test_matches_any() {
        let filters = vec![
            SerialPortFilter::vendor(0x0403),
            SerialPortFilter::product(0x2341, 0x0043),
        ];
        assert!(SerialPortFilter::matches_any(&filters, &arduino()));
        assert!(!SerialPortFilter::matches_any(
            &filters,
            &SerialPortInfo::new("/dev/ttyS0")
        ));
        assert!(SerialPortFilter::matches_any(&[], &SerialPortInfo::new("/dev/ttyS0")));
    }

    #[test]
    fn test_persistent_id_requires_usb_and_serial() {
        assert!(arduino().persistent_id().is_none());
        assert!(
            SerialPortInfo::new("/dev/ttyS0")
                .with_serial_number("ABC")
                .persistent_id()
                .is_none()
        );

        let port = arduino().with_serial_number("85736323838351F0A1A1");
        let id = port.persistent_id().unwrap();
        assert_eq!(id.usb_vendor_id, 0x2341);
        assert_eq!(id.serial_number, "85736323838351F0A1A1");
    }

    #[test]
    fn test_filter_deserializes_page_shape() {
        let filter: SerialPortFilter =
            serde_json::from_str(r#"{"usbVendorId": 9025, "usbProductId": 67}"#).unwrap();
        assert_eq!(filter, SerialPortFilter::product(0x2341, 0x0043));

        let filter: SerialPortFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, SerialPortFilter::default());
    }
}
