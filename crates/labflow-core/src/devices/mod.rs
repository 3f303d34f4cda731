//! Instruments known to a session.
//!
//! Real drivers (laser controllers, cryostats, scopes) live behind the
//! [`Instrument`] trait. The registry is built from the `[[equipment]]`
//! table in the config and is consulted by action handlers for writes and by
//! the `status`/`inspect` commands for read-only snapshots.

mod simulated;

pub use simulated::SimulatedInstrument;

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::ParamValue;

/// Errors raised by instruments and the device registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Device '{0}' not found")]
    NotFound(String),

    #[error("Device '{0}' is already configured")]
    Duplicate(String),

    #[error("Unknown driver '{driver}' for device '{id}'")]
    UnknownDriver { id: String, driver: String },

    #[error("Device '{id}' rejected '{setting}': {reason}")]
    Rejected {
        id: String,
        setting: String,
        reason: String,
    },

    #[error("Device '{id}' is not responding: {reason}")]
    Unavailable { id: String, reason: String },
}

/// Coarse health of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    Active,
    Idle,
    Error,
    Unknown,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceState::Active => "Active",
            DeviceState::Idle => "Idle",
            DeviceState::Error => "Error",
            DeviceState::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Read-only snapshot of one instrument.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub id: String,
    pub kind: String,
    pub state: DeviceState,
    /// Numeric readings (temperature, field, power...), in insertion order.
    pub readings: IndexMap<String, f64>,
    /// Free-form details such as the network address.
    pub details: IndexMap<String, String>,
    pub last_check: DateTime<Utc>,
}

impl DeviceStatus {
    /// `key=value` list of readings, or `-` when there are none.
    pub fn readings_summary(&self) -> String {
        if self.readings.is_empty() {
            return "-".to_string();
        }
        self.readings
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Driver boundary for a single instrument.
pub trait Instrument: Send {
    fn id(&self) -> &str;

    fn kind(&self) -> &str;

    /// Current snapshot; must not change instrument state.
    fn status(&self) -> DeviceStatus;

    /// Apply a setting such as `power_mw` or `field_t`.
    fn write(&mut self, setting: &str, value: ParamValue) -> Result<(), DeviceError>;

    /// Read a single numeric channel.
    fn read(&self, channel: &str) -> Result<f64, DeviceError>;
}

/// One `[[equipment]]` entry in the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentConfig {
    pub id: String,
    pub kind: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub address: Option<String>,
}

fn default_driver() -> String {
    "simulated".to_string()
}

/// Instruments keyed by id, in configuration order.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: IndexMap<String, Box<dyn Instrument>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from equipment entries.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate id or a driver this build does not provide.
    pub fn from_config(entries: &[EquipmentConfig]) -> Result<Self, DeviceError> {
        let mut registry = Self::new();
        for entry in entries {
            let device: Box<dyn Instrument> = match entry.driver.as_str() {
                "simulated" | "mock" => Box::new(SimulatedInstrument::from_config(entry)),
                other => {
                    return Err(DeviceError::UnknownDriver {
                        id: entry.id.clone(),
                        driver: other.to_string(),
                    })
                }
            };
            registry.add(device)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, device: Box<dyn Instrument>) -> Result<(), DeviceError> {
        let id = device.id().to_string();
        if self.devices.contains_key(&id) {
            return Err(DeviceError::Duplicate(id));
        }
        self.devices.insert(id, device);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&dyn Instrument, DeviceError> {
        self.devices
            .get(id)
            .map(|d| d.as_ref())
            .ok_or_else(|| DeviceError::NotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut (dyn Instrument + 'static), DeviceError> {
        self.devices
            .get_mut(id)
            .map(|d| d.as_mut())
            .ok_or_else(|| DeviceError::NotFound(id.to_string()))
    }

    /// Snapshot of every device, in configuration order.
    pub fn status_all(&self) -> Vec<DeviceStatus> {
        self.devices.values().map(|d| d.status()).collect()
    }

    pub fn inspect(&self, id: &str) -> Option<DeviceStatus> {
        self.devices.get(id).map(|d| d.status())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.devices.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, driver: &str) -> EquipmentConfig {
        EquipmentConfig {
            id: id.to_string(),
            kind: "Test Device".to_string(),
            driver: driver.to_string(),
            address: None,
        }
    }

    #[test]
    fn test_from_config_builds_in_order() {
        let registry =
            DeviceRegistry::from_config(&[entry("b", "simulated"), entry("a", "mock")]).unwrap();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(registry.status_all().len(), 2);
    }

    #[test]
    fn test_unknown_driver_rejected() {
        let err = DeviceRegistry::from_config(&[entry("laser-01", "toptica_dlc")]).unwrap_err();
        assert!(matches!(err, DeviceError::UnknownDriver { .. }));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = DeviceRegistry::from_config(&[entry("x", "simulated"), entry("x", "simulated")])
            .unwrap_err();
        assert_eq!(err, DeviceError::Duplicate("x".to_string()));
    }

    #[test]
    fn test_inspect_unknown_is_none() {
        let registry = DeviceRegistry::new();
        assert!(registry.inspect("ghost").is_none());
        assert!(matches!(registry.get("ghost"), Err(DeviceError::NotFound(_))));
    }

    #[test]
    fn test_readings_summary() {
        let mut device = SimulatedInstrument::new("cryo-01", "Cryostat");
        assert_eq!(device.status().readings_summary(), "-");
        device.write("field_t", ParamValue::Float(0.5)).unwrap();
        assert_eq!(device.status().readings_summary(), "field_t=0.5");
    }
}
