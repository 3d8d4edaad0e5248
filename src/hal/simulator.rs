//! Simulated Myo hub
//!
//! Stands in for the vendor event loop: it announces a connection, then
//! emits one sample event per configured period until the shutdown token
//! fires. Samples are only emitted once the listener has requested the
//! matching streaming mode, the way the armband behaves.

use crate::config::constants::simulation;
use crate::error::{DaqError, DaqResult};
use crate::hal::traits::{fresh_hub, DeviceHandle, DeviceListener, EventHub, HubError, HubFactory, Shutdown};
use crate::hal::types::{DeviceClass, DeviceEvent, EventKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Kind of samples to emit
    pub class: DeviceClass,
    /// Time between samples in microseconds
    pub sample_period_us: u64,
    /// Peak of the EMG sine
    pub amplitude: f32,
    /// Noise as a fraction of the amplitude, in `0.0..=1.0`
    pub noise_level: f32,
    /// Emit a truncated vector every N samples
    pub malformed_every: Option<u64>,
    /// Stop emitting after N samples but keep the loop parked
    pub max_samples: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::for_class(DeviceClass::Emg)
    }
}

impl SimulatorConfig {
    /// Configuration pacing samples at the class's nominal rate
    pub fn for_class(class: DeviceClass) -> Self {
        Self {
            class,
            sample_period_us: (1_000_000.0 / class.rate_hz()).round() as u64,
            amplitude: simulation::DEFAULT_AMPLITUDE,
            noise_level: simulation::DEFAULT_NOISE_LEVEL,
            malformed_every: None,
            max_samples: None,
        }
    }

    /// Builder-style period override
    pub fn with_period(mut self, period: Duration) -> Self {
        self.sample_period_us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Sample period as a [`Duration`]
    pub fn period(&self) -> Duration {
        Duration::from_micros(self.sample_period_us)
    }

    /// Validate configuration
    pub fn validate(&self) -> DaqResult<()> {
        if self.sample_period_us == 0 {
            return Err(DaqError::InvalidConfig(
                "simulator sample period must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.noise_level) {
            return Err(DaqError::InvalidConfig(format!(
                "simulator noise level {} must be between 0.0 and 1.0",
                self.noise_level
            )));
        }
        if self.malformed_every == Some(0) {
            return Err(DaqError::InvalidConfig(
                "malformed_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Streaming state the simulated armband keeps between commands
#[derive(Debug, Default)]
struct SimulatedDevice {
    emg_streaming: AtomicBool,
    orientation_streaming: AtomicBool,
}

impl DeviceHandle for SimulatedDevice {
    fn stream_emg(&self, enabled: bool) {
        self.emg_streaming.store(enabled, Ordering::Release);
    }

    fn stream_orientation(&self, enabled: bool) {
        self.orientation_streaming.store(enabled, Ordering::Release);
    }
}

/// Event hub driving a synthetic armband
#[derive(Debug)]
pub struct SimulatedHub {
    config: SimulatorConfig,
    device: SimulatedDevice,
    samples_emitted: AtomicU64,
    runs: AtomicU64,
}

impl SimulatedHub {
    /// Create a hub, validating the configuration
    pub fn new(config: SimulatorConfig) -> DaqResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Factory building a new simulated hub for every session
    pub fn factory(config: SimulatorConfig) -> DaqResult<HubFactory> {
        config.validate()?;
        Ok(fresh_hub(move || Ok(Self::build(config.clone()))))
    }

    fn build(config: SimulatorConfig) -> Self {
        Self {
            config,
            device: SimulatedDevice::default(),
            samples_emitted: AtomicU64::new(0),
            runs: AtomicU64::new(0),
        }
    }

    /// Simulator configuration
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Total sample events dispatched across all runs
    pub fn samples_emitted(&self) -> u64 {
        self.samples_emitted.load(Ordering::Acquire)
    }

    /// Number of times the event loop has been entered
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }

    /// Whether a listener has requested EMG streaming
    pub fn emg_streaming(&self) -> bool {
        self.device.emg_streaming.load(Ordering::Acquire)
    }

    /// Whether a listener has requested orientation streaming
    pub fn orientation_streaming(&self) -> bool {
        self.device.orientation_streaming.load(Ordering::Acquire)
    }

    fn streaming(&self) -> bool {
        match self.config.class {
            DeviceClass::Emg => self.emg_streaming(),
            DeviceClass::Imu => self.orientation_streaming(),
        }
    }

    fn noise(&self, rng: &mut impl Rng) -> f32 {
        if self.config.noise_level > 0.0 {
            rng.gen_range(-1.0f32..1.0) * self.config.noise_level * self.config.amplitude
        } else {
            0.0
        }
    }

    fn generate(&self, index: u64, rng: &mut impl Rng) -> EventKind {
        let t = index as f32 * self.config.sample_period_us as f32 / 1_000_000.0;
        let truncated = self
            .config
            .malformed_every
            .is_some_and(|every| (index + 1) % every == 0);

        match self.config.class {
            DeviceClass::Emg => {
                let mut values: Vec<f32> = (0..self.config.class.total_channels())
                    .map(|channel| {
                        let freq = simulation::BASE_FREQUENCY_HZ + channel as f32 * simulation::CHANNEL_FREQUENCY_STEP_HZ;
                        let phase = 2.0 * std::f32::consts::PI * freq * t;
                        self.config.amplitude * phase.sin() + self.noise(&mut *rng)
                    })
                    .collect();
                if truncated {
                    values.truncate(values.len() / 2);
                }
                EventKind::Emg(values)
            }
            DeviceClass::Imu => {
                // Slow rotation about the z axis
                let half = 0.5 * simulation::ROTATION_RATE_RAD_S * t;
                let mut values = vec![half.cos(), 0.0, 0.0, half.sin()];
                if truncated {
                    values.truncate(1);
                }
                EventKind::Orientation(values)
            }
        }
    }
}

impl EventHub for SimulatedHub {
    fn run(&self, listener: &mut dyn DeviceListener, shutdown: &Shutdown) -> Result<(), HubError> {
        self.runs.fetch_add(1, Ordering::AcqRel);
        self.device.stream_emg(false);
        self.device.stream_orientation(false);

        debug!(class = %self.config.class, period_us = self.config.sample_period_us, "simulated hub running");
        listener.on_event(&DeviceEvent::new(&self.device, EventKind::Connected));

        let mut rng = rand::thread_rng();
        let period = self.config.period();
        let started = Instant::now();
        let mut tick: u32 = 0;
        let mut index: u64 = 0;

        loop {
            if self.config.max_samples.is_some_and(|max| index >= max) {
                shutdown.wait();
                break;
            }

            tick = tick.wrapping_add(1);
            let Some(deadline) = period.checked_mul(tick).and_then(|offset| started.checked_add(offset)) else {
                // Period too long to schedule; nothing is ever due
                shutdown.wait();
                break;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if shutdown.wait_timeout(remaining) {
                break;
            }

            if !self.streaming() {
                continue;
            }

            let kind = self.generate(index, &mut rng);
            trace!(index, "simulated sample");
            listener.on_event(&DeviceEvent::new(&self.device, kind));
            self.samples_emitted.fetch_add(1, Ordering::AcqRel);
            index += 1;
        }

        listener.on_event(&DeviceEvent::new(&self.device, EventKind::Disconnected));
        debug!(emitted = index, "simulated hub stopped");
        Ok(())
    }
}
