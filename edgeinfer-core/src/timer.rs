//! Periodic Timer on a Dedicated Worker Thread
//!
//! ## Overview
//!
//! [`PeriodicTimer`] calls a callback once per interval. Expiries are waited
//! for on one worker thread per timer, using a `parking_lot` condition
//! variable as the handoff, so callbacks never run in signal context and two
//! timers never share state.
//!
//! ```text
//!  owner thread                      worker thread
//!  ────────────                      ─────────────
//!  create()  ── state ──┐
//!  start()   ── arm ────┼──notify──▶ wait_until(deadline)
//!                       │            │ expiry
//!                       │            ▼
//!                       │            callback()        (lock released)
//!  stop()    ── disarm ─┤◀──idle──── firing = false
//!  destroy() ── shutdown┴──notify──▶ exit loop ──▶ joined
//! ```
//!
//! ## Delivery Contract
//!
//! - Exactly one callback per expiry, never reentrant
//! - Expiries missed while a callback runs are coalesced: the next deadline is
//!   re-anchored to "now + interval" instead of firing a burst
//! - `stop()` blocks until an in-flight callback returns, except when called
//!   from the callback itself
//!
//! ## Teardown From the Callback
//!
//! Dropping the timer inside its own callback cannot join the worker (it is
//! the current thread). The join is handed to a short-lived reaper thread that
//! waits for the worker to leave its loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::constants::MAX_TIMER_INTERVAL_MS;
use crate::errors::{AiError, AiResult};

type Callback = Box<dyn Fn() + Send + Sync>;

struct TimerState {
    interval_ms: u32,
    armed: bool,
    /// Bumped on every arm or re-arm so the worker recomputes its deadline
    generation: u64,
    shutdown: bool,
    firing: bool,
    worker: Option<ThreadId>,
}

struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
    idle: Condvar,
    fires: AtomicU64,
    callback: Callback,
}

/// Periodic callback source with its own worker thread
pub struct PeriodicTimer {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

fn check_interval(interval_ms: u32) -> AiResult<()> {
    if interval_ms == 0 {
        return Err(AiError::InvalidArgument("timer interval must be positive"));
    }
    if interval_ms > MAX_TIMER_INTERVAL_MS {
        return Err(AiError::InvalidArgument("timer interval out of range"));
    }
    Ok(())
}

impl PeriodicTimer {
    /// Creates a disarmed timer
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `interval_ms` is 0 or above [`MAX_TIMER_INTERVAL_MS`].
    pub fn create<F>(callback: F, interval_ms: u32) -> AiResult<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        check_interval(interval_ms)?;
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState {
                    interval_ms,
                    armed: false,
                    generation: 0,
                    shutdown: false,
                    firing: false,
                    worker: None,
                }),
                wake: Condvar::new(),
                idle: Condvar::new(),
                fires: AtomicU64::new(0),
                callback: Box::new(callback),
            }),
            worker: None,
        })
    }

    /// Arms the timer, spawning the worker on first use
    pub fn start(&mut self) -> AiResult<()> {
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return Err(AiError::OperationFailed("timer destroyed"));
            }
            if !state.armed {
                state.armed = true;
                state.generation += 1;
            }
        }
        if let Err(e) = self.ensure_worker() {
            self.shared.state.lock().armed = false;
            return Err(e);
        }
        self.shared.wake.notify_all();
        log_debug!("timer armed at {} ms", self.interval_ms());
        Ok(())
    }

    /// Re-arms with a new period, arming a disarmed timer as well
    pub fn change_interval(&mut self, interval_ms: u32) -> AiResult<()> {
        check_interval(interval_ms)?;
        let was_armed = {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return Err(AiError::OperationFailed("timer destroyed"));
            }
            state.interval_ms = interval_ms;
            state.generation += 1;
            state.armed
        };
        if was_armed {
            self.shared.wake.notify_all();
            log_debug!("timer interval changed to {} ms", interval_ms);
            Ok(())
        } else {
            self.start()
        }
    }

    /// Disarms the timer. Idempotent.
    ///
    /// Waits for a running callback to return unless called from it.
    pub fn stop(&self) -> AiResult<()> {
        let mut state = self.shared.state.lock();
        if !state.armed {
            return Ok(());
        }
        state.armed = false;
        state.generation += 1;
        self.shared.wake.notify_all();

        let on_worker = state.worker == Some(thread::current().id());
        while state.firing && !on_worker {
            self.shared.idle.wait(&mut state);
        }
        log_debug!("timer disarmed");
        Ok(())
    }

    /// Stops the timer and releases its worker
    pub fn destroy(self) {
        drop(self);
    }

    /// Current period in milliseconds
    pub fn interval_ms(&self) -> u32 {
        self.shared.state.lock().interval_ms
    }

    /// Whether the timer is armed
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().armed
    }

    /// Callbacks delivered so far
    pub fn fire_count(&self) -> u64 {
        self.shared.fires.load(Ordering::Relaxed)
    }

    fn ensure_worker(&mut self) -> AiResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("edgeinfer-timer".into())
            .spawn(move || run(shared))
            .map_err(|_e| {
                log_error!("timer thread spawn failed: {}", _e);
                AiError::OperationFailed("timer thread spawn failed")
            })?;
        self.worker = Some(handle);
        Ok(())
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.armed = false;
        }
        self.shared.wake.notify_all();

        let Some(handle) = self.worker.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Dropped from our own callback; the worker exits once it returns.
            let reaper = thread::Builder::new()
                .name("edgeinfer-timer-reaper".into())
                .spawn(move || {
                    if handle.join().is_err() {
                        log_error!("timer worker panicked");
                    }
                });
            if reaper.is_err() {
                log_warn!("timer reaper spawn failed, worker left detached");
            }
        } else if handle.join().is_err() {
            log_error!("timer worker panicked");
        }
    }
}

fn run(shared: Arc<Shared>) {
    log_trace!("timer worker started");
    let mut state = shared.state.lock();
    // Recorded before the first expiry so a callback that stops the timer is recognised
    state.worker = Some(thread::current().id());
    let mut deadline: Option<(u64, Instant)> = None;

    while !state.shutdown {
        if !state.armed {
            deadline = None;
            shared.wake.wait(&mut state);
            continue;
        }

        let due = match deadline {
            Some((generation, due)) if generation == state.generation => due,
            _ => {
                let due = Instant::now() + period(&state);
                deadline = Some((state.generation, due));
                due
            }
        };

        if Instant::now() < due {
            shared.wake.wait_until(&mut state, due);
            continue;
        }

        fire(&shared, &mut state);

        let period = period(&state);
        let next = due + period;
        let now = Instant::now();
        let next = if next <= now { now + period } else { next };
        if let Some((_, slot)) = deadline.as_mut() {
            *slot = next;
        }
    }
    log_trace!("timer worker exiting");
}

fn fire(shared: &Shared, state: &mut MutexGuard<'_, TimerState>) {
    state.firing = true;
    shared.fires.fetch_add(1, Ordering::Relaxed);
    let outcome = MutexGuard::unlocked(state, || {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (shared.callback)()))
    });
    if outcome.is_err() {
        log_error!("timer callback panicked");
    }
    state.firing = false;
    shared.idle.notify_all();
}

fn period(state: &TimerState) -> Duration {
    Duration::from_millis(u64::from(state.interval_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    fn counting(interval_ms: u32) -> (PeriodicTimer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let timer = PeriodicTimer::create(
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
            interval_ms,
        )
        .unwrap();
        (timer, count)
    }

    #[test]
    fn create_rejects_bad_intervals() {
        assert!(matches!(PeriodicTimer::create(|| {}, 0), Err(AiError::InvalidArgument(_))));
        assert!(matches!(
            PeriodicTimer::create(|| {}, MAX_TIMER_INTERVAL_MS + 1),
            Err(AiError::InvalidArgument(_))
        ));
        assert!(PeriodicTimer::create(|| {}, MAX_TIMER_INTERVAL_MS).is_ok());
    }

    #[test]
    fn created_timer_is_disarmed() {
        let (timer, count) = counting(5);
        thread::sleep(Duration::from_millis(30));
        assert!(!timer.is_armed());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fires_periodically() {
        let (mut timer, count) = counting(10);
        timer.start().unwrap();
        thread::sleep(Duration::from_millis(120));
        timer.stop().unwrap();
        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 3, "fired {fired} times");
        assert_eq!(timer.fire_count(), fired as u64);
    }

    #[test]
    fn start_then_stop_fires_nothing() {
        let (mut timer, count) = counting(200);
        timer.start().unwrap();
        timer.stop().unwrap();
        timer.stop().unwrap();
        thread::sleep(Duration::from_millis(300));
        assert!(!timer.is_armed());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn change_interval_arms_disarmed_timer() {
        let (mut timer, count) = counting(10_000);
        timer.change_interval(10).unwrap();
        assert!(timer.is_armed());
        assert_eq!(timer.interval_ms(), 10);
        thread::sleep(Duration::from_millis(80));
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn zero_interval_change_keeps_previous() {
        let (mut timer, _count) = counting(50);
        assert!(matches!(timer.change_interval(0), Err(AiError::InvalidArgument(_))));
        assert_eq!(timer.interval_ms(), 50);
        assert!(!timer.is_armed());
    }

    #[test]
    fn stop_waits_for_running_callback() {
        let started = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let (s, d) = (Arc::clone(&started), Arc::clone(&done));
        let mut timer = PeriodicTimer::create(
            move || {
                s.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                d.store(true, Ordering::SeqCst);
            },
            5,
        )
        .unwrap();
        timer.start().unwrap();
        while !started.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        timer.stop().unwrap();
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn dropping_from_callback_defers_join() {
        let slot: Arc<Mutex<Option<PeriodicTimer>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicUsize::new(0));
        let (slot_cb, count_cb) = (Arc::clone(&slot), Arc::clone(&count));

        let timer = PeriodicTimer::create(
            move || {
                count_cb.fetch_add(1, Ordering::SeqCst);
                let timer = slot_cb.lock().take();
                drop(timer);
            },
            10,
        )
        .unwrap();
        *slot.lock() = Some(timer);
        if let Some(timer) = slot.lock().as_mut() {
            timer.start().unwrap();
        }

        thread::sleep(Duration::from_millis(150));
        assert!(slot.lock().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_from_callback_does_not_block() {
        let slot: Arc<Mutex<Option<PeriodicTimer>>> = Arc::new(Mutex::new(None));
        let slot_cb = Arc::clone(&slot);
        let timer = PeriodicTimer::create(
            move || {
                if let Some(timer) = slot_cb.lock().as_ref() {
                    timer.stop().unwrap();
                }
            },
            10,
        )
        .unwrap();
        *slot.lock() = Some(timer);
        if let Some(timer) = slot.lock().as_mut() {
            timer.start().unwrap();
        }

        thread::sleep(Duration::from_millis(100));
        let timer = slot.lock().take().unwrap();
        assert!(!timer.is_armed());
        assert_eq!(timer.fire_count(), 1);
    }

    #[test]
    fn stop_from_first_expiry_does_not_block() {
        for _ in 0..25 {
            let slot: Arc<Mutex<Option<PeriodicTimer>>> = Arc::new(Mutex::new(None));
            let slot_cb = Arc::clone(&slot);
            let timer = PeriodicTimer::create(
                move || {
                    if let Some(timer) = slot_cb.lock().as_ref() {
                        timer.stop().unwrap();
                    }
                },
                1,
            )
            .unwrap();
            *slot.lock() = Some(timer);
            if let Some(timer) = slot.lock().as_mut() {
                timer.start().unwrap();
            }

            let deadline = Instant::now() + Duration::from_secs(2);
            while slot.lock().as_ref().map_or(0, PeriodicTimer::fire_count) == 0 && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            thread::sleep(Duration::from_millis(5));
            let timer = slot.lock().take().unwrap();
            assert!(!timer.is_armed());
            assert_eq!(timer.fire_count(), 1);
        }
    }

    #[test]
    fn slow_callback_coalesces_missed_expiries() {
        let active = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicUsize::new(0));
        let (a, o, c) = (Arc::clone(&active), Arc::clone(&overlapped), Arc::clone(&count));
        let mut timer = PeriodicTimer::create(
            move || {
                if a.swap(true, Ordering::SeqCst) {
                    o.store(true, Ordering::SeqCst);
                }
                c.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(35));
                a.store(false, Ordering::SeqCst);
            },
            10,
        )
        .unwrap();

        timer.start().unwrap();
        thread::sleep(Duration::from_millis(300));
        timer.stop().unwrap();

        let fired = count.load(Ordering::SeqCst);
        assert!(!overlapped.load(Ordering::SeqCst));
        // Bounded by the callback duration, not by 300 / 10 backlogged expiries
        assert!((2..=9).contains(&fired), "fired {fired} times");
        assert_eq!(timer.fire_count(), fired as u64);
    }

    #[test]
    fn drop_from_other_thread_waits_for_callback() {
        let started = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let (s, d) = (Arc::clone(&started), Arc::clone(&done));
        let mut timer = PeriodicTimer::create(
            move || {
                s.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(80));
                d.store(true, Ordering::SeqCst);
            },
            5,
        )
        .unwrap();
        timer.start().unwrap();
        while !started.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }

        let dropper = thread::spawn(move || {
            drop(timer);
        });
        dropper.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
    }
}
