//! Liveness watchdog for an extension's worker thread.
//!
//! The watchdog is plain state living inside the extension's state mutex;
//! arming, disarming and firing all happen with that mutex held. Every arm
//! bumps a generation number which the scheduled callback carries along, so
//! a fire that raced with a newer check-in is recognised as stale and
//! ignored.

use std::time::Duration;

use super::timer::{TimerId, TimerService};

/// Externally visible watchdog state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchdogState {
    /// Not scheduled.
    #[default]
    Idle,
    /// Will fire once after the check-in period.
    Armed,
    /// Fired and asked the user whether to kill; polling for the answer.
    Escalated,
}

#[derive(Debug, Default)]
pub struct Watchdog {
    state: WatchdogState,
    generation: u64,
    timer: Option<TimerId>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    /// Check-in: (re)schedule a fire after `period`.
    ///
    /// `fire` receives the generation this arm was issued under.
    pub fn arm<F>(&mut self, timers: &TimerService, period: Duration, fire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.schedule(timers, period, fire);
        self.state = WatchdogState::Armed;
    }

    /// Reschedule while a kill confirmation is pending.
    pub fn poll<F>(&mut self, timers: &TimerService, period: Duration, fire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.schedule(timers, period, fire);
        self.state = WatchdogState::Escalated;
    }

    pub fn disarm(&mut self, timers: &TimerService) {
        self.cancel_timer(timers);
        self.generation = self.generation.wrapping_add(1);
        self.state = WatchdogState::Idle;
    }

    /// Whether a fire issued under `generation` is still the live one.
    pub fn is_current(&self, generation: u64) -> bool {
        self.state != WatchdogState::Idle && self.generation == generation
    }

    /// The scheduled callback has started running; its timer id is spent.
    pub fn fired(&mut self) {
        self.timer = None;
    }

    fn schedule<F>(&mut self, timers: &TimerService, period: Duration, fire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel_timer(timers);
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        self.timer = Some(timers.schedule(period, move || fire(generation)));
    }

    fn cancel_timer(&mut self, timers: &TimerService) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    /// Watchdog behind a mutex with a fire handler that honours generations,
    /// the way an extension instance drives it.
    struct Harness {
        timers: TimerService,
        dog: Arc<Mutex<Watchdog>>,
        fires: Arc<AtomicUsize>,
        fired_at: Arc<Mutex<Option<Instant>>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                timers: TimerService::start().unwrap(),
                dog: Arc::new(Mutex::new(Watchdog::new())),
                fires: Arc::new(AtomicUsize::new(0)),
                fired_at: Arc::new(Mutex::new(None)),
            }
        }

        fn arm(&self, period: Duration) {
            let dog = Arc::clone(&self.dog);
            let fires = Arc::clone(&self.fires);
            let fired_at = Arc::clone(&self.fired_at);
            self.dog.lock().arm(&self.timers, period, move |generation| {
                let mut dog = dog.lock();
                if !dog.is_current(generation) {
                    return;
                }
                dog.fired();
                fires.fetch_add(1, Ordering::SeqCst);
                fired_at.lock().get_or_insert_with(Instant::now);
            });
        }
    }

    #[test]
    fn test_regular_check_ins_prevent_fire() {
        let harness = Harness::new();
        let period = Duration::from_millis(80);

        harness.arm(period);
        for _ in 0..8 {
            thread::sleep(period / 2);
            harness.arm(period);
        }

        assert_eq!(harness.fires.load(Ordering::SeqCst), 0);
        harness.dog.lock().disarm(&harness.timers);
    }

    #[test]
    fn test_fires_within_window_after_check_ins_stop() {
        let harness = Harness::new();
        let period = Duration::from_millis(60);

        harness.arm(period);
        let last_check_in = Instant::now();

        thread::sleep(period * 3);
        assert_eq!(harness.fires.load(Ordering::SeqCst), 1);

        let fired_at = harness.fired_at.lock().unwrap();
        let elapsed = fired_at.duration_since(last_check_in);
        assert!(elapsed >= period);
        assert!(elapsed < period * 2);
    }

    #[test]
    fn test_disarm_makes_pending_fire_stale() {
        let harness = Harness::new();
        harness.arm(Duration::from_millis(20));
        harness.dog.lock().disarm(&harness.timers);

        thread::sleep(Duration::from_millis(60));
        assert_eq!(harness.fires.load(Ordering::SeqCst), 0);
        assert_eq!(harness.dog.lock().state(), WatchdogState::Idle);
    }

    #[test]
    fn test_generation_rejects_stale_fire() {
        let timers = TimerService::start().unwrap();
        let mut dog = Watchdog::new();

        dog.arm(&timers, Duration::from_secs(60), |_| {});
        let stale = dog.generation;
        dog.poll(&timers, Duration::from_secs(60), |_| {});

        assert!(!dog.is_current(stale));
        assert!(dog.is_current(dog.generation));
        assert_eq!(dog.state(), WatchdogState::Escalated);
        // Re-arming replaced the first timer rather than stacking a second one.
        assert_eq!(timers.pending(), 1);
    }
}
