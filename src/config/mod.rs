// src/config/mod.rs
//! Acquisition configuration

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::acquisition::ChannelSelection;
use crate::daq::MalformedPolicy;
use crate::error::{DaqError, DaqResult};
use crate::hal::simulator::SimulatorConfig;
use crate::hal::DeviceClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of one acquisition stream
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DaqConfig {
    /// Device class to acquire from
    #[serde(default = "defaults::device")]
    pub device: DeviceClass,

    /// Selected channels; all channels of the class when absent
    #[serde(default)]
    pub channels: Option<Vec<usize>>,

    /// Samples per channel in every batch
    #[serde(default = "defaults::samples_per_read")]
    pub samples_per_read: usize,

    /// Handling of samples with the wrong channel count
    #[serde(default)]
    pub malformed_policy: MalformedPolicy,

    /// Bound applied to every read; reads block indefinitely when absent
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,

    /// Simulated hub settings; derived from `device` when absent
    #[serde(default)]
    pub simulator: Option<SimulatorConfig>,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use crate::hal::DeviceClass;

    pub fn device() -> DeviceClass { DeviceClass::Emg }
    pub fn samples_per_read() -> usize { reader::DEFAULT_SAMPLES_PER_READ }
}

impl Default for DaqConfig {
    fn default() -> Self {
        Self {
            device: defaults::device(),
            channels: None,
            samples_per_read: defaults::samples_per_read(),
            malformed_policy: MalformedPolicy::default(),
            read_timeout_ms: None,
            simulator: None,
        }
    }
}

impl DaqConfig {
    /// Check the configuration against its device class
    pub fn validate(&self) -> DaqResult<()> {
        if self.samples_per_read == 0 {
            return Err(DaqError::InvalidConfig("samples_per_read must be positive".to_string()));
        }
        if let Some(channels) = &self.channels {
            ChannelSelection::new(channels.clone(), self.device.total_channels())?;
        }
        if self.read_timeout_ms == Some(0) {
            return Err(DaqError::InvalidConfig("read_timeout_ms must be positive when set".to_string()));
        }
        if let Some(simulator) = &self.simulator {
            simulator.validate()?;
            if simulator.class != self.device {
                return Err(DaqError::InvalidConfig(format!(
                    "simulator emits {} samples but the device is {}",
                    simulator.class, self.device
                )));
            }
        }
        Ok(())
    }

    /// Read bound as a [`Duration`]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Simulator settings, defaulting to the device class's nominal rate
    pub fn simulator_config(&self) -> SimulatorConfig {
        self.simulator
            .clone()
            .unwrap_or_else(|| SimulatorConfig::for_class(self.device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DaqConfig::default();
        assert_eq!(config.device, DeviceClass::Emg);
        assert_eq!(config.samples_per_read, reader::DEFAULT_SAMPLES_PER_READ);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = DaqConfig {
            channels: Some(vec![0, 2]),
            read_timeout_ms: Some(250),
            ..Default::default()
        };
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: DaqConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_channel_validation() {
        let config = DaqConfig {
            device: DeviceClass::Imu,
            channels: Some(vec![0, 4]),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DaqError::InvalidChannel { index: 4, .. })));
    }

    #[test]
    fn test_simulator_class_mismatch() {
        let config = DaqConfig {
            device: DeviceClass::Imu,
            simulator: Some(SimulatorConfig::for_class(DeviceClass::Emg)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_simulator_defaults_follow_device() {
        let config = DaqConfig {
            device: DeviceClass::Imu,
            ..Default::default()
        };
        assert_eq!(config.simulator_config().class, DeviceClass::Imu);
        assert_eq!(config.read_timeout(), None);
    }
}
