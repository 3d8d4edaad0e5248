// src/hal/types.rs
//! Core types shared between the event hub and the acquisition pipeline

use serde::{Deserialize, Serialize};

use crate::config::constants::device;
use crate::hal::traits::DeviceHandle;

/// One vector of per-channel readings, stamped with its arrival position
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    sequence: u64,
    values: Vec<f32>,
}

impl RawSample {
    pub(crate) fn new(sequence: u64, values: Vec<f32>) -> Self {
        Self { sequence, values }
    }

    /// Arrival position within the owning queue, starting at zero
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Channel readings in device order
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of channels carried by this sample
    pub fn channel_count(&self) -> usize {
        self.values.len()
    }

    /// Take ownership of the readings
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Kind of sensor stream a device instance acquires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Raw 8-channel electromyography
    Emg,
    /// Orientation quaternion (w, x, y, z)
    Imu,
}

impl DeviceClass {
    /// Channel count every sample of this class must carry
    pub fn total_channels(self) -> usize {
        match self {
            DeviceClass::Emg => device::EMG_CHANNEL_COUNT,
            DeviceClass::Imu => device::ORIENTATION_COMPONENTS,
        }
    }

    /// Nominal sampling rate of the stream in Hz
    pub fn rate_hz(self) -> f64 {
        match self {
            DeviceClass::Emg => device::EMG_RATE_HZ,
            DeviceClass::Imu => device::IMU_RATE_HZ,
        }
    }

    /// Short lowercase name used in logs
    pub fn name(self) -> &'static str {
        match self {
            DeviceClass::Emg => "emg",
            DeviceClass::Imu => "imu",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a hardware event
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A physical device paired with the hub
    Connected,
    /// A raw EMG frame
    Emg(Vec<f32>),
    /// An orientation quaternion
    Orientation(Vec<f32>),
    /// The device dropped its link
    Disconnected,
}

/// Event dispatched by the hub to a listener, on the hub's thread
pub struct DeviceEvent<'a> {
    /// Handle used to send commands back to the originating device
    pub device: &'a dyn DeviceHandle,
    /// What happened
    pub kind: EventKind,
}

impl<'a> DeviceEvent<'a> {
    /// Create a new event
    pub fn new(device: &'a dyn DeviceHandle, kind: EventKind) -> Self {
        Self { device, kind }
    }
}

impl std::fmt::Debug for DeviceEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEvent").field("kind", &self.kind).finish()
    }
}
