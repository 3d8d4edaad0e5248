// src/hal/traits.rs
//! Seams between the acquisition core and the vendor event loop

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::hal::types::{DeviceEvent, EventKind};

/// Failures reported by an event hub
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    /// The hub could not be brought up
    #[error("hub initialization failed: {0}")]
    Initialization(String),
    /// The link to the device was lost while the loop was running
    #[error("device disconnected: {0}")]
    Disconnected(String),
    /// Any other vendor-side failure
    #[error("event loop failure: {0}")]
    EventLoop(String),
}

/// Commands the core may send back to a physical device
///
/// Both calls are fire-and-forget; they change the device's streaming mode,
/// never local state.
pub trait DeviceHandle {
    /// Enable or disable raw EMG streaming
    fn stream_emg(&self, enabled: bool);

    /// Enable or disable orientation streaming
    fn stream_orientation(&self, enabled: bool);
}

/// Receives hardware events on the hub's thread
///
/// Handlers must not block, sleep or perform I/O: any delay here stalls the
/// vendor event loop for every consumer.
pub trait DeviceListener: Send {
    /// Dispatch an event to the matching handler
    fn on_event(&mut self, event: &DeviceEvent<'_>) {
        match &event.kind {
            EventKind::Connected => self.on_connected(event.device),
            EventKind::Emg(values) => self.on_emg(values),
            EventKind::Orientation(values) => self.on_orientation(values),
            EventKind::Disconnected => self.on_disconnected(),
        }
    }

    /// A device paired; request the streaming mode this listener consumes
    fn on_connected(&mut self, device: &dyn DeviceHandle);

    /// A raw EMG frame arrived
    fn on_emg(&mut self, _values: &[f32]) {}

    /// An orientation quaternion arrived
    fn on_orientation(&mut self, _values: &[f32]) {}

    /// The device went away. Reconnection is left to the hub.
    fn on_disconnected(&mut self) {}
}

/// The vendor event loop
pub trait EventHub: Send + Sync {
    /// Drive the event loop, dispatching into `listener`, until `shutdown`
    /// fires or [`EventHub::request_stop`] is called.
    fn run(&self, listener: &mut dyn DeviceListener, shutdown: &Shutdown) -> Result<(), HubError>;

    /// Unblock a `run` call parked inside vendor code.
    ///
    /// Called repeatedly while a session is stopping, until the acquisition
    /// thread has exited, so a request that lands before `run` is entered
    /// is not lost. Hubs whose loop already waits on the [`Shutdown`] token
    /// can keep the default no-op.
    fn request_stop(&self) {}
}

/// Creates the event hub for one acquisition session
///
/// Invoked on every `start()`, so each session drives its own hub.
pub type HubFactory = Arc<dyn Fn() -> Result<Arc<dyn EventHub>, HubError> + Send + Sync>;

/// Factory building a new hub for every session
pub fn fresh_hub<H, F>(make: F) -> HubFactory
where
    H: EventHub + 'static,
    F: Fn() -> Result<H, HubError> + Send + Sync + 'static,
{
    Arc::new(move || Ok(Arc::new(make()?) as Arc<dyn EventHub>))
}

/// Factory handing the same hub to every session
///
/// The hub must be restartable: its `run` either observes the [`Shutdown`]
/// token or clears any earlier stop request when it is entered.
pub fn shared_hub<H: EventHub + 'static>(hub: Arc<H>) -> HubFactory {
    Arc::new(move || Ok(hub.clone() as Arc<dyn EventHub>))
}

/// Close-on-stop signal observed by the acquisition thread
///
/// Nothing is ever sent on the channel; dropping the sender held by the
/// [`ShutdownTrigger`] disconnects it, which wakes every waiter at once.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: Receiver<()>,
}

/// Owning side of a [`Shutdown`] signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: Option<Sender<()>>,
}

impl Shutdown {
    /// Create a connected trigger/token pair
    pub fn pair() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = channel::bounded(0);
        (ShutdownTrigger { tx: Some(tx) }, Shutdown { rx })
    }

    /// Whether the trigger has fired
    pub fn is_requested(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Park for at most `timeout`; returns `true` if shutdown was requested
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) | Ok(()) => false,
        }
    }

    /// Park until shutdown is requested
    pub fn wait(&self) {
        while self.rx.recv().is_ok() {}
    }

    /// Raw receiver, for use in `crossbeam::channel::select!`
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

impl ShutdownTrigger {
    /// Fire the signal. Idempotent.
    pub fn fire(&mut self) {
        self.tx.take();
    }

    /// Whether [`ShutdownTrigger::fire`] has been called
    pub fn has_fired(&self) -> bool {
        self.tx.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_shutdown_initially_clear() {
        let (_trigger, shutdown) = Shutdown::pair();
        assert!(!shutdown.is_requested());
        assert!(!shutdown.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_fire_wakes_waiter() {
        let (mut trigger, shutdown) = Shutdown::pair();
        let waiter = thread::spawn(move || {
            let start = Instant::now();
            shutdown.wait();
            start.elapsed()
        });

        thread::sleep(Duration::from_millis(20));
        trigger.fire();
        let parked = waiter.join().unwrap();
        assert!(parked < Duration::from_secs(1));
        assert!(trigger.has_fired());
    }

    #[test]
    fn test_fire_is_idempotent() {
        let (mut trigger, shutdown) = Shutdown::pair();
        trigger.fire();
        trigger.fire();
        assert!(shutdown.is_requested());
        assert!(shutdown.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_dropping_trigger_fires() {
        let (trigger, shutdown) = Shutdown::pair();
        drop(trigger);
        assert!(shutdown.is_requested());
    }

    struct Recorder {
        seen: Vec<&'static str>,
    }

    impl DeviceListener for Recorder {
        fn on_connected(&mut self, device: &dyn DeviceHandle) {
            device.stream_emg(true);
            self.seen.push("connected");
        }
        fn on_emg(&mut self, _values: &[f32]) {
            self.seen.push("emg");
        }
        fn on_disconnected(&mut self) {
            self.seen.push("disconnected");
        }
    }

    struct NullDevice;

    impl DeviceHandle for NullDevice {
        fn stream_emg(&self, _enabled: bool) {}
        fn stream_orientation(&self, _enabled: bool) {}
    }

    struct CountingHub;

    impl EventHub for CountingHub {
        fn run(&self, _listener: &mut dyn DeviceListener, _shutdown: &Shutdown) -> Result<(), HubError> {
            Ok(())
        }
    }

    #[test]
    fn test_fresh_hub_builds_per_call() {
        let factory = fresh_hub(|| Ok(CountingHub));
        let first = factory().unwrap();
        let second = factory().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_shared_hub_reuses_instance() {
        let hub = Arc::new(CountingHub);
        let factory = shared_hub(hub.clone());
        let first = factory().unwrap();
        let second = factory().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(Arc::strong_count(&hub), 4);
    }

    #[test]
    fn test_fresh_hub_propagates_init_error() {
        let factory = fresh_hub(|| -> Result<CountingHub, HubError> {
            Err(HubError::Initialization("no dongle".to_string()))
        });
        assert!(matches!(factory(), Err(HubError::Initialization(_))));
    }

    #[test]
    fn test_default_dispatch() {
        let device = NullDevice;
        let mut recorder = Recorder { seen: Vec::new() };

        for kind in [
            EventKind::Connected,
            EventKind::Emg(vec![0.0; 8]),
            EventKind::Orientation(vec![1.0, 0.0, 0.0, 0.0]),
            EventKind::Disconnected,
        ] {
            recorder.on_event(&DeviceEvent::new(&device, kind));
        }

        assert_eq!(recorder.seen, vec!["connected", "emg", "disconnected"]);
    }
}
