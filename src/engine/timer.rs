use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Lifecycle of a [`DeadlineTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Stopped,
}

type StopCallback = Box<dyn FnOnce() + Send>;

/// One-shot countdown that runs its callbacks when the duration elapses or
/// when stopped early, whichever comes first.
///
/// The stop transition happens at most once: callbacks run exactly once, in
/// registration order, and redundant `stop` calls are no-ops. Callbacks
/// registered after the transition are dropped. Clones share the same
/// underlying timer.
#[derive(Clone)]
pub struct DeadlineTimer {
    duration: Duration,
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<StateInner>,
    stop_tx: watch::Sender<bool>,
}

struct StateInner {
    state: TimerState,
    callbacks: Vec<StopCallback>,
}

impl DeadlineTimer {
    pub fn new(duration: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            duration,
            inner: Arc::new(Inner {
                state: Mutex::new(StateInner {
                    state: TimerState::Idle,
                    callbacks: Vec::new(),
                }),
                stop_tx,
            }),
        }
    }

    /// Register a callback to run on the stop transition.
    ///
    /// May be called before or after [`start`](Self::start); dropped without
    /// running if the timer is already stopped.
    pub fn on_stop(&self, callback: impl FnOnce() + Send + 'static) {
        let mut state = self.inner.state.lock().unwrap();
        if state.state != TimerState::Stopped {
            state.callbacks.push(Box::new(callback));
        }
    }

    /// Begin the countdown. Idle -> Running; a no-op in any other state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.state != TimerState::Idle {
                return;
            }
            state.state = TimerState::Running;
        }

        let inner = Arc::clone(&self.inner);
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            inner.fire();
        });
    }

    /// Trigger the stop transition now. A no-op once stopped.
    pub fn stop(&self) {
        self.inner.fire();
    }

    pub fn state(&self) -> TimerState {
        self.inner.state.lock().unwrap().state
    }

    /// Completes on the stop transition; immediately if already stopped.
    pub async fn stopped(&self) {
        let mut rx = self.inner.stop_tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// A receiver async tasks can hold to observe the stop transition.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.inner.stop_tx.subscribe()
    }
}

impl Inner {
    /// The single path into Stopped, shared by expiry and manual stop.
    fn fire(&self) {
        let callbacks = {
            let mut state = self.state.lock().unwrap();
            if state.state == TimerState::Stopped {
                return;
            }
            state.state = TimerState::Stopped;
            std::mem::take(&mut state.callbacks)
        };

        for callback in callbacks {
            callback();
        }
        let _ = self.stop_tx.send(true);
    }
}
