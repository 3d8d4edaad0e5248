// src/daq.rs
//! Device-level acquisition API
//!
//! [`MyoDaq`] wires a listener, a sample queue, an acquisition thread and a
//! batch reader together for one armband stream:
//!
//! ```rust,no_run
//! use myo_daq::{MyoDaq, SimulatedHub, SimulatorConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hubs = SimulatedHub::factory(SimulatorConfig::default())?;
//! let daq = MyoDaq::emg(vec![0, 2, 4], 20, hubs)?;
//!
//! daq.start()?;
//! let batch = daq.read()?;
//! assert_eq!(batch.shape(), &[3, 20]);
//! daq.stop()?;
//! # Ok(())
//! # }
//! ```

use crate::acquisition::{
    listener_factory, AcquisitionController, Batch, BatchReader, ChannelSelection, QueueStats, SampleQueue,
    SessionState,
};
use crate::config::DaqConfig;
use crate::error::{DaqError, DaqResult};
use crate::hal::{DeviceClass, HubFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What `read()` does when a batch contains a sample of the wrong width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Return [`DaqError::MalformedBatch`]
    #[default]
    Strict,
    /// Log a warning and return a zero-filled batch of the expected shape
    ZeroFill,
}

/// One acquisition stream from a Myo armband
pub struct MyoDaq {
    queue: Arc<SampleQueue>,
    reader: BatchReader,
    controller: AcquisitionController,
    policy: MalformedPolicy,
    read_timeout: Option<Duration>,
}

impl MyoDaq {
    /// EMG stream projected onto `channels` (indices 0..8)
    ///
    /// `hubs` is called on every [`MyoDaq::start`] to obtain the event hub
    /// for that session.
    pub fn emg(channels: impl Into<Vec<usize>>, samples_per_read: usize, hubs: HubFactory) -> DaqResult<Self> {
        let selection = ChannelSelection::new(channels, DeviceClass::Emg.total_channels())?;
        Self::new(DeviceClass::Emg, selection, samples_per_read, hubs)
    }

    /// Orientation stream; every batch carries the full quaternion
    pub fn imu(samples_per_read: usize, hubs: HubFactory) -> DaqResult<Self> {
        let selection = ChannelSelection::all(DeviceClass::Imu.total_channels());
        Self::new(DeviceClass::Imu, selection, samples_per_read, hubs)
    }

    /// Stream of `class` samples projected onto `selection`
    pub fn new(
        class: DeviceClass,
        selection: ChannelSelection,
        samples_per_read: usize,
        hubs: HubFactory,
    ) -> DaqResult<Self> {
        let queue = Arc::new(SampleQueue::new());
        let reader = BatchReader::new(queue.clone(), class, selection, samples_per_read)?;
        let controller = AcquisitionController::new(hubs, listener_factory(class, queue.clone()));

        debug!(%class, channels = ?reader.selection().indices(), samples_per_read, "device created");
        Ok(Self {
            queue,
            reader,
            controller,
            policy: MalformedPolicy::default(),
            read_timeout: None,
        })
    }

    /// Build from a validated configuration
    pub fn from_config(config: &DaqConfig, hubs: HubFactory) -> DaqResult<Self> {
        config.validate()?;
        let selection = match &config.channels {
            Some(channels) => ChannelSelection::new(channels.clone(), config.device.total_channels())?,
            None => ChannelSelection::all(config.device.total_channels()),
        };

        let mut daq = Self::new(config.device, selection, config.samples_per_read, hubs)?;
        daq.policy = config.malformed_policy;
        daq.read_timeout = config.read_timeout();
        Ok(daq)
    }

    /// Builder-style malformed-sample policy
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder-style default bound applied by [`MyoDaq::read`]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Start acquiring. Fails with [`DaqError::AlreadyRunning`] if running.
    pub fn start(&self) -> DaqResult<()> {
        self.controller.start()?;
        info!(class = %self.reader.class(), "acquisition session running");
        Ok(())
    }

    /// Stop acquiring and join the background thread. Fails with
    /// [`DaqError::NotRunning`] if no session is running.
    pub fn stop(&self) -> DaqResult<()> {
        self.controller.stop()
    }

    /// Next `(channels, samples_per_read)` batch.
    ///
    /// Blocks until enough samples have arrived, or for at most the
    /// configured read timeout.
    pub fn read(&self) -> DaqResult<Batch> {
        let result = match self.read_timeout {
            Some(timeout) => self.reader.read_timeout(timeout),
            None => self.reader.read(),
        };
        self.apply_policy(result)
    }

    /// Next batch, failing with [`DaqError::Timeout`] after `timeout`
    pub fn read_timeout(&self, timeout: Duration) -> DaqResult<Batch> {
        let result = self.reader.read_timeout(timeout);
        self.apply_policy(result)
    }

    /// Discard every sample queued but not yet read
    pub fn reset(&self) {
        let discarded = self.queue.reset();
        debug!(discarded, "sample queue reset");
    }

    fn apply_policy(&self, result: DaqResult<Batch>) -> DaqResult<Batch> {
        match (result, self.policy) {
            (Err(DaqError::MalformedBatch { sample_index, expected, actual }), MalformedPolicy::ZeroFill) => {
                warn!(sample_index, expected, actual, "malformed batch replaced with zeros");
                Ok(self.reader.zero_filled())
            }
            (result, _) => result,
        }
    }

    /// Queue counters
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Lifecycle state of the acquisition session
    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Whether the acquisition thread is alive
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Device class of the stream
    pub fn class(&self) -> DeviceClass {
        self.reader.class()
    }

    /// Nominal sampling rate of the stream in Hz
    pub fn rate_hz(&self) -> f64 {
        self.reader.class().rate_hz()
    }

    /// Selected channels, in batch row order
    pub fn channels(&self) -> &[usize] {
        self.reader.selection().indices()
    }

    /// Batch width
    pub fn samples_per_read(&self) -> usize {
        self.reader.samples_per_read()
    }

    /// Active malformed-sample policy
    pub fn malformed_policy(&self) -> MalformedPolicy {
        self.policy
    }
}
