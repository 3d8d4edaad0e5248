// src/acquisition/listener.rs
//! Device listeners converting hardware callbacks into queued samples
//!
//! Handlers run on the acquisition thread inside the vendor event loop. They
//! only enqueue; a sample whose length is off for its class is still queued
//! as-is and reported when the reader assembles a batch.

use crate::acquisition::sample_queue::SampleQueue;
use crate::hal::{DeviceClass, DeviceHandle, DeviceListener};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Builds a fresh listener for every acquisition session
pub type ListenerFactory = Arc<dyn Fn() -> Box<dyn DeviceListener> + Send + Sync>;

fn enqueue(queue: &SampleQueue, class: DeviceClass, values: &[f32]) {
    let expected = class.total_channels();
    if values.len() != expected {
        warn!(%class, expected, actual = values.len(), "sample has unexpected channel count");
    }
    let sequence = queue.push(values.to_vec());
    trace!(%class, sequence, "sample queued");
}

/// Listener for raw EMG frames
#[derive(Debug, Clone)]
pub struct EmgListener {
    queue: Arc<SampleQueue>,
}

impl EmgListener {
    /// Listener feeding `queue`
    pub fn new(queue: Arc<SampleQueue>) -> Self {
        Self { queue }
    }
}

impl DeviceListener for EmgListener {
    fn on_connected(&mut self, device: &dyn DeviceHandle) {
        debug!("device connected, requesting emg stream");
        device.stream_emg(true);
    }

    fn on_emg(&mut self, values: &[f32]) {
        enqueue(&self.queue, DeviceClass::Emg, values);
    }

    fn on_disconnected(&mut self) {
        debug!("emg device disconnected");
    }
}

/// Listener for orientation quaternions
#[derive(Debug, Clone)]
pub struct ImuListener {
    queue: Arc<SampleQueue>,
}

impl ImuListener {
    /// Listener feeding `queue`
    pub fn new(queue: Arc<SampleQueue>) -> Self {
        Self { queue }
    }
}

impl DeviceListener for ImuListener {
    fn on_connected(&mut self, device: &dyn DeviceHandle) {
        debug!("device connected, requesting orientation stream");
        device.stream_orientation(true);
    }

    fn on_orientation(&mut self, values: &[f32]) {
        enqueue(&self.queue, DeviceClass::Imu, values);
    }

    fn on_disconnected(&mut self) {
        debug!("imu device disconnected");
    }
}

/// Factory producing the listener that matches `class`
pub fn listener_factory(class: DeviceClass, queue: Arc<SampleQueue>) -> ListenerFactory {
    Arc::new(move || -> Box<dyn DeviceListener> {
        match class {
            DeviceClass::Emg => Box::new(EmgListener::new(queue.clone())),
            DeviceClass::Imu => Box::new(ImuListener::new(queue.clone())),
        }
    })
}
