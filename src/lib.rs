//! myo-daq: concurrency-safe sample acquisition for Myo-class armbands
//!
//! The vendor SDK delivers samples from its own event loop, at its own
//! cadence. This crate decouples that loop from a polling consumer:
//!
//! - a background thread pumps the [`EventHub`] and is joined on `stop()`
//! - [`DeviceListener`]s turn hardware callbacks into queued [`RawSample`]s
//! - a [`SampleQueue`] buffers them in arrival order
//! - a [`BatchReader`] hands out `(channels, samples_per_read)` batches
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use myo_daq::{MyoDaq, SimulatedHub, SimulatorConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hubs = SimulatedHub::factory(SimulatorConfig::default())?;
//!     let daq = MyoDaq::emg(vec![0, 1, 2, 3], 40, hubs)?;
//!
//!     daq.start()?;
//!     for _ in 0..5 {
//!         let batch = daq.read()?;
//!         println!("batch: {:?}", batch.shape());
//!     }
//!     daq.stop()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod daq;
pub mod error;
pub mod hal;

// Re-export commonly used types for convenience
pub use crate::acquisition::{
    AcquisitionController, Batch, BatchReader, ChannelSelection, EmgListener, ImuListener, QueueStats,
    SampleQueue, SessionState,
};
pub use crate::config::{ConfigLoader, DaqConfig};
pub use crate::daq::{MalformedPolicy, MyoDaq};
pub use crate::error::{DaqError, DaqResult};
pub use crate::hal::simulator::{SimulatedHub, SimulatorConfig};
pub use crate::hal::{
    fresh_hub, shared_hub, DeviceClass, DeviceEvent, DeviceHandle, DeviceListener, EventHub, EventKind, HubError,
    HubFactory, RawSample, Shutdown,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Concurrency-safe sample acquisition for Myo-class armbands".to_string(),
        device_classes: vec![DeviceClass::Emg, DeviceClass::Imu],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Supported device classes
    pub device_classes: Vec<DeviceClass>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert_eq!(info.device_classes.len(), 2);
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
    }
}
