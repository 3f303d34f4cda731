//! In-memory instrument used when no hardware driver is configured.

use chrono::Utc;
use indexmap::IndexMap;

use super::{DeviceError, DeviceState, DeviceStatus, EquipmentConfig, Instrument};
use crate::actions::ParamValue;

/// Stores every numeric setting it is given and reports it back as a
/// reading. Non-numeric settings are kept as details.
#[derive(Debug, Clone)]
pub struct SimulatedInstrument {
    id: String,
    kind: String,
    readings: IndexMap<String, f64>,
    details: IndexMap<String, String>,
}

impl SimulatedInstrument {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            readings: IndexMap::new(),
            details: IndexMap::new(),
        }
    }

    pub fn from_config(entry: &EquipmentConfig) -> Self {
        let mut device = Self::new(&entry.id, &entry.kind);
        device
            .details
            .insert("driver".to_string(), entry.driver.clone());
        if let Some(address) = &entry.address {
            device.details.insert("address".to_string(), address.clone());
        }
        device
    }

    /// Seed a reading, e.g. a starting temperature.
    pub fn with_reading(mut self, channel: impl Into<String>, value: f64) -> Self {
        self.readings.insert(channel.into(), value);
        self
    }
}

impl Instrument for SimulatedInstrument {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn status(&self) -> DeviceStatus {
        let state = if self.readings.is_empty() {
            DeviceState::Idle
        } else {
            DeviceState::Active
        };
        DeviceStatus {
            id: self.id.clone(),
            kind: self.kind.clone(),
            state,
            readings: self.readings.clone(),
            details: self.details.clone(),
            last_check: Utc::now(),
        }
    }

    fn write(&mut self, setting: &str, value: ParamValue) -> Result<(), DeviceError> {
        if setting.is_empty() {
            return Err(DeviceError::Rejected {
                id: self.id.clone(),
                setting: setting.to_string(),
                reason: "empty setting name".to_string(),
            });
        }
        match value.as_f64() {
            Some(v) => {
                self.readings.insert(setting.to_string(), v);
            }
            None => {
                self.details.insert(setting.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn read(&self, channel: &str) -> Result<f64, DeviceError> {
        self.readings
            .get(channel)
            .copied()
            .ok_or_else(|| DeviceError::Unavailable {
                id: self.id.clone(),
                reason: format!("no reading for channel '{channel}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut device = SimulatedInstrument::new("laser-01", "Laser");
        device.write("power_mw", ParamValue::Float(70.0)).unwrap();
        assert_eq!(device.read("power_mw").unwrap(), 70.0);
        assert_eq!(device.status().state, DeviceState::Active);
    }

    #[test]
    fn test_string_settings_become_details() {
        let mut device = SimulatedInstrument::new("laser-01", "Laser");
        device
            .write("mode", ParamValue::String("scan".into()))
            .unwrap();
        assert_eq!(device.status().details.get("mode").map(String::as_str), Some("scan"));
        assert!(device.read("mode").is_err());
    }

    #[test]
    fn test_from_config_records_address() {
        let device = SimulatedInstrument::from_config(&EquipmentConfig {
            id: "cryo-01".into(),
            kind: "Cryostat".into(),
            driver: "simulated".into(),
            address: Some("192.168.0.178".into()),
        });
        let status = device.status();
        assert_eq!(status.state, DeviceState::Idle);
        assert_eq!(status.details.get("address").map(String::as_str), Some("192.168.0.178"));
    }
}
