// src/acquisition/reader.rs
//! Consumer-side batch assembly

use crate::acquisition::sample_queue::SampleQueue;
use crate::config::constants::reader;
use crate::error::{DaqError, DaqResult};
use crate::hal::{DeviceClass, RawSample};
use ndarray::{Array2, Axis};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Channel-major block of samples: rows are channels, columns are time
pub type Batch = Array2<f32>;

/// Ordered subset of device channels projected into every batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSelection {
    indices: Vec<usize>,
}

impl ChannelSelection {
    /// Validate `indices` against a device with `total_channels` channels.
    ///
    /// The selection must be non-empty, in range and free of duplicates.
    pub fn new(indices: impl Into<Vec<usize>>, total_channels: usize) -> DaqResult<Self> {
        let indices = indices.into();
        if indices.is_empty() {
            return Err(DaqError::InvalidConfig("channel selection is empty".to_string()));
        }

        let mut seen = vec![false; total_channels];
        for &index in &indices {
            if index >= total_channels {
                return Err(DaqError::InvalidChannel { index, total_channels });
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(DaqError::InvalidConfig(format!("channel {} selected twice", index)));
            }
        }

        Ok(Self { indices })
    }

    /// Every channel, in device order
    pub fn all(total_channels: usize) -> Self {
        Self {
            indices: (0..total_channels).collect(),
        }
    }

    /// Channel indices in row order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of selected channels
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always false for a constructed selection
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Pulls fixed-size batches out of a [`SampleQueue`]
#[derive(Debug, Clone)]
pub struct BatchReader {
    queue: Arc<SampleQueue>,
    class: DeviceClass,
    selection: ChannelSelection,
    samples_per_read: usize,
}

impl BatchReader {
    /// Create a reader for `class` samples
    pub fn new(
        queue: Arc<SampleQueue>,
        class: DeviceClass,
        selection: ChannelSelection,
        samples_per_read: usize,
    ) -> DaqResult<Self> {
        if samples_per_read == 0 {
            return Err(DaqError::InvalidConfig("samples_per_read must be positive".to_string()));
        }
        let total_channels = class.total_channels();
        if let Some(&index) = selection.indices().iter().find(|&&i| i >= total_channels) {
            return Err(DaqError::InvalidChannel { index, total_channels });
        }

        Ok(Self {
            queue,
            class,
            selection,
            samples_per_read,
        })
    }

    /// Block until `samples_per_read` samples are queued and return them as a
    /// `(selected channels, samples_per_read)` batch.
    ///
    /// There is no timeout; see [`BatchReader::read_timeout`].
    pub fn read(&self) -> DaqResult<Batch> {
        let samples = self.queue.take(self.samples_per_read);
        self.assemble(&samples)
    }

    /// Like [`BatchReader::read`] but fails with [`DaqError::Timeout`] if the
    /// batch is not complete within `timeout`. Queued samples are kept.
    pub fn read_timeout(&self, timeout: Duration) -> DaqResult<Batch> {
        let samples = self
            .queue
            .take_timeout(self.samples_per_read, timeout)
            .ok_or(DaqError::Timeout { waited: timeout })?;
        self.assemble(&samples)
    }

    /// Stack samples row-wise, project the selected channels and transpose
    /// to channel-major.
    ///
    /// Fails on the first sample whose length differs from the class's
    /// channel count. The samples have already left the queue at this point.
    pub fn assemble(&self, samples: &[RawSample]) -> DaqResult<Batch> {
        let expected = self.class.total_channels();
        if let Some((sample_index, sample)) = samples
            .iter()
            .enumerate()
            .find(|(_, sample)| sample.channel_count() != expected)
        {
            return Err(DaqError::MalformedBatch {
                sample_index,
                expected,
                actual: sample.channel_count(),
            });
        }

        let stacked = Array2::from_shape_fn((samples.len(), expected), |(row, channel)| {
            samples[row].values()[channel]
        });
        let batch = stacked
            .select(Axis(1), self.selection.indices())
            .reversed_axes()
            .as_standard_layout()
            .into_owned();

        trace!(
            first = samples.first().map(RawSample::sequence),
            rows = batch.nrows(),
            cols = batch.ncols(),
            "batch assembled"
        );
        Ok(batch)
    }

    /// Batch of the configured shape holding only the fill value
    pub fn zero_filled(&self) -> Batch {
        Array2::from_elem(self.shape(), reader::ZERO_FILL_VALUE)
    }

    /// `(selected channels, samples_per_read)`
    pub fn shape(&self) -> (usize, usize) {
        (self.selection.len(), self.samples_per_read)
    }

    /// Samples per channel in every batch
    pub fn samples_per_read(&self) -> usize {
        self.samples_per_read
    }

    /// Projected channels
    pub fn selection(&self) -> &ChannelSelection {
        &self.selection
    }

    /// Device class whose channel count every sample must match
    pub fn class(&self) -> DeviceClass {
        self.class
    }
}
