// src/acquisition/controller.rs
//! Acquisition thread lifecycle
//!
//! The controller owns at most one background thread, driving a hub built
//! for that session. `stop()` fires the session's shutdown token, keeps
//! asking the hub to unwind until the thread has exited, and joins it before
//! returning, so no sample is enqueued by the session once `stop()` has
//! returned.

use crate::acquisition::listener::ListenerFactory;
use crate::config::constants::acquisition;
use crate::error::{DaqError, DaqResult};
use crate::hal::{EventHub, HubError, HubFactory, Shutdown, ShutdownTrigger};
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle of an acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Never started
    Idle,
    /// Background thread alive
    Running,
    /// Started at least once and stopped since
    Stopped,
}

struct Session {
    hub: Arc<dyn EventHub>,
    trigger: ShutdownTrigger,
    /// Fires when the thread body has returned or unwound
    exited: Shutdown,
    handle: JoinHandle<Result<(), String>>,
}

struct ControllerState {
    session: Option<Session>,
    state: SessionState,
}

/// Owns the background thread that pumps the event hub
pub struct AcquisitionController {
    hubs: HubFactory,
    factory: ListenerFactory,
    inner: Mutex<ControllerState>,
}

impl AcquisitionController {
    /// Create an idle controller
    pub fn new(hubs: HubFactory, factory: ListenerFactory) -> Self {
        Self {
            hubs,
            factory,
            inner: Mutex::new(ControllerState {
                session: None,
                state: SessionState::Idle,
            }),
        }
    }

    /// Build a hub for the new session and spawn the acquisition thread
    pub fn start(&self) -> DaqResult<()> {
        let mut inner = self.inner.lock();
        if inner.session.is_some() {
            return Err(DaqError::AlreadyRunning);
        }

        let hub = (self.hubs)()?;
        let (trigger, shutdown) = Shutdown::pair();
        let (exit_trigger, exited) = Shutdown::pair();
        let thread_hub = hub.clone();
        let factory = self.factory.clone();

        let handle = thread::Builder::new()
            .name(acquisition::THREAD_NAME.to_string())
            .spawn(move || {
                // Dropped on return and on unwind alike
                let _exit = exit_trigger;
                acquisition_loop(thread_hub.as_ref(), &factory, &shutdown)
            })
            .map_err(|e| HubError::Initialization(format!("failed to spawn acquisition thread: {}", e)))?;

        inner.session = Some(Session {
            hub,
            trigger,
            exited,
            handle,
        });
        inner.state = SessionState::Running;
        info!("acquisition started");
        Ok(())
    }

    /// Stop the acquisition thread and wait for it to exit
    pub fn stop(&self) -> DaqResult<()> {
        // Held across the join so a concurrent start() cannot overlap the
        // unwinding thread.
        let mut inner = self.inner.lock();
        let Some(mut session) = inner.session.take() else {
            return Err(DaqError::NotRunning);
        };
        inner.state = SessionState::Stopped;

        session.trigger.fire();
        let retry = Duration::from_millis(acquisition::STOP_RETRY_MS);
        loop {
            session.hub.request_stop();
            if session.exited.wait_timeout(retry) {
                break;
            }
            trace!("event loop still running, repeating stop request");
        }

        let outcome = match session.handle.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(DaqError::ThreadPanicked(message)),
            Err(payload) => Err(DaqError::ThreadPanicked(panic_message(payload.as_ref()))),
        };

        match &outcome {
            Ok(()) => info!("acquisition stopped"),
            Err(err) => error!(error = %err, "acquisition thread ended abnormally"),
        }
        outcome
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Whether a session is active and its thread is still alive
    pub fn is_running(&self) -> bool {
        self.inner
            .lock()
            .session
            .as_ref()
            .is_some_and(|session| !session.handle.is_finished())
    }
}

impl Drop for AcquisitionController {
    fn drop(&mut self) {
        if self.inner.get_mut().session.is_some() {
            if let Err(err) = self.stop() {
                warn!(error = %err, "error while stopping acquisition on drop");
            }
        }
    }
}

/// Body of the acquisition thread
///
/// Re-enters the event loop if it returns without a stop request, after a
/// back-off that the shutdown token interrupts.
fn acquisition_loop(hub: &dyn EventHub, factory: &ListenerFactory, shutdown: &Shutdown) -> Result<(), String> {
    debug!("acquisition thread running");
    let mut backoff = Duration::from_millis(acquisition::RESTART_BACKOFF_MS);
    let max_backoff = Duration::from_millis(acquisition::MAX_RESTART_BACKOFF_MS);

    while !shutdown.is_requested() {
        let mut listener = factory();
        let result = panic::catch_unwind(AssertUnwindSafe(|| hub.run(listener.as_mut(), shutdown)));

        match result {
            Ok(Ok(())) if shutdown.is_requested() => break,
            Ok(Ok(())) => {
                debug!(backoff_ms = backoff.as_millis() as u64, "event loop returned early, re-entering");
            }
            Ok(Err(err)) => {
                warn!(error = %err, backoff_ms = backoff.as_millis() as u64, "event loop failed, restarting");
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "event loop panicked, acquisition halted");
                return Err(message);
            }
        }

        if shutdown.wait_timeout(backoff) {
            break;
        }
        backoff = (backoff * 2).min(max_backoff);
    }

    debug!("acquisition thread exiting");
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::listener::listener_factory;
    use crate::acquisition::sample_queue::SampleQueue;
    use crate::hal::{fresh_hub, shared_hub, DeviceListener};
    use parking_lot::Condvar;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    /// Hub that parks on the shutdown token and counts entries
    #[derive(Default)]
    struct ParkingHub {
        runs: AtomicUsize,
    }

    impl EventHub for ParkingHub {
        fn run(&self, _listener: &mut dyn DeviceListener, shutdown: &Shutdown) -> Result<(), HubError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            shutdown.wait();
            Ok(())
        }
    }

    /// Hub that fails immediately every time
    #[derive(Default)]
    struct FailingHub {
        runs: AtomicUsize,
    }

    impl EventHub for FailingHub {
        fn run(&self, _listener: &mut dyn DeviceListener, _shutdown: &Shutdown) -> Result<(), HubError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Err(HubError::EventLoop("no dongle".to_string()))
        }
    }

    struct PanickingHub;

    impl EventHub for PanickingHub {
        fn run(&self, _listener: &mut dyn DeviceListener, _shutdown: &Shutdown) -> Result<(), HubError> {
            panic!("vendor callback exploded");
        }
    }

    /// Hub parked in vendor code that only `request_stop` releases. Entering
    /// `run` clears earlier stop requests after a short vendor start-up.
    #[derive(Default)]
    struct RearmingHub {
        stopped: Mutex<bool>,
        wake: Condvar,
        runs: AtomicUsize,
    }

    impl EventHub for RearmingHub {
        fn run(&self, _listener: &mut dyn DeviceListener, _shutdown: &Shutdown) -> Result<(), HubError> {
            thread::sleep(Duration::from_millis(5));
            self.runs.fetch_add(1, Ordering::SeqCst);
            let mut stopped = self.stopped.lock();
            *stopped = false;
            while !*stopped {
                self.wake.wait(&mut stopped);
            }
            Ok(())
        }

        fn request_stop(&self) {
            *self.stopped.lock() = true;
            self.wake.notify_all();
        }
    }

    fn controller(hubs: HubFactory) -> AcquisitionController {
        let queue = Arc::new(SampleQueue::new());
        AcquisitionController::new(hubs, listener_factory(crate::hal::DeviceClass::Emg, queue))
    }

    #[test]
    fn test_lifecycle_transitions() {
        let controller = controller(shared_hub(Arc::new(ParkingHub::default())));
        assert_eq!(controller.state(), SessionState::Idle);

        controller.start().unwrap();
        assert_eq!(controller.state(), SessionState::Running);
        assert!(controller.is_running());

        controller.stop().unwrap();
        assert_eq!(controller.state(), SessionState::Stopped);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_double_start_rejected() {
        let controller = controller(shared_hub(Arc::new(ParkingHub::default())));
        controller.start().unwrap();
        assert!(matches!(controller.start(), Err(DaqError::AlreadyRunning)));
        controller.stop().unwrap();
    }

    #[test]
    fn test_stop_when_idle_rejected() {
        let controller = controller(shared_hub(Arc::new(ParkingHub::default())));
        assert!(matches!(controller.stop(), Err(DaqError::NotRunning)));

        controller.start().unwrap();
        controller.stop().unwrap();
        assert!(matches!(controller.stop(), Err(DaqError::NotRunning)));
    }

    #[test]
    fn test_restart_after_stop() {
        let hub = Arc::new(ParkingHub::default());
        let controller = controller(shared_hub(hub.clone()));

        for _ in 0..3 {
            controller.start().unwrap();
            controller.stop().unwrap();
        }
        assert!(hub.runs.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_stop_interrupts_backoff() {
        let hub = Arc::new(FailingHub::default());
        let controller = controller(shared_hub(hub.clone()));
        controller.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while hub.runs.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        let start = Instant::now();
        controller.stop().unwrap();
        assert!(start.elapsed() < Duration::from_millis(acquisition::RESTART_BACKOFF_MS));
    }

    #[test]
    fn test_panic_is_contained() {
        let controller = controller(shared_hub(Arc::new(PanickingHub)));
        controller.start().unwrap();

        let result = controller.stop();
        match result {
            Err(DaqError::ThreadPanicked(message)) => assert!(message.contains("exploded")),
            other => panic!("expected ThreadPanicked, got {:?}", other),
        }
        assert!(controller.start().is_ok());
        let _ = controller.stop();
    }

    #[test]
    fn test_drop_joins_thread() {
        let hub = Arc::new(ParkingHub::default());
        {
            let controller = controller(shared_hub(hub.clone()));
            controller.start().unwrap();
        }
        assert_eq!(Arc::strong_count(&hub), 1);
    }

    #[test]
    fn test_stop_before_vendor_loop_entered() {
        let hub = Arc::new(RearmingHub::default());
        let controller = controller(shared_hub(hub.clone()));

        for _ in 0..5 {
            controller.start().unwrap();
            let start = Instant::now();
            controller.stop().unwrap();
            assert!(start.elapsed() < Duration::from_secs(1));
        }
        assert!(!controller.is_running());
    }

    #[test]
    fn test_each_session_gets_fresh_hub() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let controller = controller(fresh_hub(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ParkingHub::default())
        }));

        for _ in 0..3 {
            controller.start().unwrap();
            controller.stop().unwrap();
        }
        assert_eq!(built.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_hub_init_failure_leaves_controller_idle() {
        let controller = controller(fresh_hub(|| -> Result<ParkingHub, HubError> {
            Err(HubError::Initialization("no dongle".to_string()))
        }));

        assert!(matches!(controller.start(), Err(DaqError::Hub(HubError::Initialization(_)))));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(matches!(controller.stop(), Err(DaqError::NotRunning)));
    }
}
