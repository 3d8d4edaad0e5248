// src/config/constants.rs
//! System-wide configuration constants

/// Device class constants
pub mod device {
    /// Channels in a raw EMG frame
    pub const EMG_CHANNEL_COUNT: usize = 8;
    /// Components of an orientation quaternion (w, x, y, z)
    pub const ORIENTATION_COMPONENTS: usize = 4;
    /// Nominal EMG sampling rate
    pub const EMG_RATE_HZ: f64 = 200.0;
    /// Nominal orientation sampling rate
    pub const IMU_RATE_HZ: f64 = 50.0;
}

/// Acquisition thread constants
pub mod acquisition {
    /// Name given to the background thread
    pub const THREAD_NAME: &str = "myo-acquisition";
    /// Back-off before re-entering an event loop that failed
    pub const RESTART_BACKOFF_MS: u64 = 100;
    /// Upper bound on the back-off after repeated failures
    pub const MAX_RESTART_BACKOFF_MS: u64 = 2_000;
    /// Interval between repeated stop requests while the thread unwinds
    pub const STOP_RETRY_MS: u64 = 5;
}

/// Batch reader constants
pub mod reader {
    /// Batch width when the configuration leaves it unset
    pub const DEFAULT_SAMPLES_PER_READ: usize = 50;
    /// Value written into every cell of a zero-filled batch
    pub const ZERO_FILL_VALUE: f32 = 0.0;
}

/// Simulator constants
pub mod simulation {
    /// Peak of the synthetic EMG sine
    pub const DEFAULT_AMPLITUDE: f32 = 0.5;
    /// Noise as a fraction of the amplitude
    pub const DEFAULT_NOISE_LEVEL: f32 = 0.05;
    /// Sine frequency of channel 0
    pub const BASE_FREQUENCY_HZ: f32 = 5.0;
    /// Frequency added per channel index
    pub const CHANNEL_FREQUENCY_STEP_HZ: f32 = 1.5;
    /// Angular speed of the simulated orientation
    pub const ROTATION_RATE_RAD_S: f32 = 0.5;
}

/// Configuration file locations
pub mod paths {
    /// File looked up when no path is given
    pub const DEFAULT_CONFIG_FILE: &str = "myo_daq.toml";
    /// Prefix of environment overrides, e.g. `MYO_DAQ__SAMPLES_PER_READ`
    pub const ENV_PREFIX: &str = "MYO_DAQ";
    /// Separator between nested keys in environment overrides
    pub const ENV_SEPARATOR: &str = "__";
}
