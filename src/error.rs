// src/error.rs
//! Unified error handling for the acquisition pipeline
//!
//! Every public operation of the crate returns [`DaqResult`]. Lifecycle
//! violations are reported synchronously to the caller; per-sample data
//! problems surface when a batch is assembled, never on the acquisition
//! thread.

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::hal::HubError;

/// Unified error type for the acquisition pipeline
#[derive(Debug, Error)]
pub enum DaqError {
    /// `start()` was called on a session that is already running
    #[error("acquisition is already running")]
    AlreadyRunning,

    /// `stop()` was called while no session was running
    #[error("acquisition is not running")]
    NotRunning,

    /// A dequeued sample did not carry the channel count of its device class
    #[error("malformed batch: sample {sample_index} has {actual} channels, expected {expected}")]
    MalformedBatch {
        /// Position of the offending sample inside the batch
        sample_index: usize,
        /// Channel count of the device class
        expected: usize,
        /// Channel count actually delivered
        actual: usize,
    },

    /// A bounded read gave up before enough samples arrived
    #[error("timed out after {waited:?} waiting for samples")]
    Timeout {
        /// How long the reader waited
        waited: Duration,
    },

    /// A channel index outside the device's channel range was requested
    #[error("channel {index} is out of range for a {total_channels}-channel device")]
    InvalidChannel {
        /// Requested index
        index: usize,
        /// Channel count of the device class
        total_channels: usize,
    },

    /// Construction parameters were rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external event hub reported a failure
    #[error(transparent)]
    Hub(#[from] HubError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The acquisition thread unwound with a panic
    #[error("acquisition thread panicked: {0}")]
    ThreadPanicked(String),
}

impl DaqError {
    /// Whether the error concerns the session lifecycle rather than data
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, DaqError::AlreadyRunning | DaqError::NotRunning)
    }
}

/// Result type alias for acquisition operations
pub type DaqResult<T> = Result<T, DaqError>;
