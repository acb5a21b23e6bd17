//! One-shot timer service shared by all extension watchdogs.
//!
//! A single thread sleeps until the earliest deadline and runs due callbacks
//! with no timer lock held, so callbacks may schedule or cancel timers.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::error::{ExtensionError, ExtensionResult};

type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct TimerState {
    deadlines: BinaryHeap<Reverse<(Instant, u64)>>,
    callbacks: HashMap<u64, TimerCallback>,
    next_id: u64,
    running: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

pub struct TimerService {
    shared: Arc<TimerShared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TimerService {
    /// Start the timer thread.
    pub fn start() -> ExtensionResult<Self> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                deadlines: BinaryHeap::new(),
                callbacks: HashMap::new(),
                next_id: 0,
                running: true,
            }),
            wake: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("nova-ext-timer".to_string())
            .spawn(move || timer_loop(&thread_shared))
            .map_err(|e| ExtensionError::Resource(format!("cannot start timer thread: {}", e)))?;

        Ok(Self {
            shared,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Run `callback` once on the timer thread after `delay`.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.deadlines.push(Reverse((Instant::now() + delay, id)));
        state.callbacks.insert(id, Box::new(callback));
        self.shared.wake.notify_one();
        TimerId(id)
    }

    /// Cancel a pending callback. Returns false if it already ran.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.shared.state.lock().callbacks.remove(&id.0).is_some()
    }

    /// Number of callbacks still waiting for their deadline.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().callbacks.len()
    }

    /// Stop the thread; pending callbacks are dropped without running.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.running = false;
            state.callbacks.clear();
            state.deadlines.clear();
            self.shared.wake.notify_all();
        }

        if let Some(handle) = self.thread.lock().take() {
            if handle.thread().id() == thread::current().id() {
                // Dropped from one of our own callbacks; the loop exits on its own.
                return;
            }
            if handle.join().is_err() {
                tracing::error!("watchdog timer thread panicked");
            }
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn timer_loop(shared: &TimerShared) {
    let mut state = shared.state.lock();

    while state.running {
        let next = state.deadlines.peek().map(|Reverse(entry)| *entry);
        match next {
            None => shared.wake.wait(&mut state),
            Some((deadline, id)) if deadline <= Instant::now() => {
                state.deadlines.pop();
                // Cancelled timers leave their deadline behind; skip those.
                if let Some(callback) = state.callbacks.remove(&id) {
                    MutexGuard::unlocked(&mut state, callback);
                }
            }
            Some((deadline, _)) => {
                shared.wake.wait_until(&mut state, deadline);
            }
        }
    }
}
