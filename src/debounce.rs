//! Debouncing primitives
//!
//! Collapses a burst of triggers into a single delayed effect that only
//! reflects the most recent trigger. Two flavours are provided:
//!
//! - [`Debouncer`] wraps a callback; every [`Debouncer::call`] supersedes the
//!   pending one and re-arms the timer with the latest arguments.
//! - [`DebouncedValue`] holds a derived value that lags its input and only
//!   catches up once the input has been quiet for the configured delay.
//!
//! Timers run on the tokio runtime, so both types must be driven from within
//! one. Dropping an instance cancels its pending timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Debounced callback with an argument of type `A`
///
/// Use a tuple for callbacks taking several parameters.
pub struct Debouncer<A> {
    callback: Callback<A>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<A: Send + 'static> Debouncer<A> {
    /// Create a debouncer invoking `callback` once `delay` has elapsed
    /// without a newer call
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule the callback with `args`, superseding any pending call.
    ///
    /// A zero delay still defers the callback to a later scheduler tick.
    pub fn call(&self, args: A) {
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;

        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback(args);
        }));
    }

    /// Build a new debouncer around the same callback with another delay.
    ///
    /// The returned instance is independent: a call still pending on `self`
    /// is not cancelled and fires unless `self` is cancelled or dropped.
    pub fn with_delay(&self, delay: Duration) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            delay,
            pending: Mutex::new(None),
        }
    }
}

impl<A> Debouncer<A> {
    /// Cancel the pending call, if any
    pub fn cancel(&self) {
        if let Some(pending) = self.slot().take() {
            pending.abort();
        }
    }

    /// Whether a scheduled call has not fired yet
    pub fn is_pending(&self) -> bool {
        self.slot()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Value that follows its input once the input stops changing for `delay`
pub struct DebouncedValue<T> {
    latest: Mutex<T>,
    output: Arc<watch::Sender<T>>,
    input: Debouncer<T>,
}

impl<T> DebouncedValue<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (sender, _) = watch::channel(initial.clone());
        let output = Arc::new(sender);
        let sink = Arc::clone(&output);

        let input = Debouncer::new(delay, move |value: T| {
            sink.send_if_modified(|current| {
                if *current == value {
                    return false;
                }
                *current = value;
                true
            });
        });

        Self {
            latest: Mutex::new(initial),
            output,
            input,
        }
    }

    /// Feed a new input value.
    ///
    /// Setting the same value as the latest input does not re-arm the timer.
    pub fn set(&self, value: T) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if *latest == value {
            return;
        }
        *latest = value.clone();
        self.input.call(value);
    }

    /// Current derived value
    pub fn get(&self) -> T {
        self.output.borrow().clone()
    }

    /// Receiver notified each time the derived value changes
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.input.is_pending()
    }

    /// Drop the pending update; the derived value keeps its current state
    pub fn cancel(&self) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        self.input.cancel();
        *latest = self.get();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Instant};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(u32) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        (count, move |_: u32| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_args() {
        let calls: Arc<Mutex<Vec<(u32, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&calls);
        let debouncer = Debouncer::new(Duration::from_millis(50), move |value: u32| {
            log.lock().unwrap().push((value, Instant::now()));
        });

        let start = Instant::now();
        debouncer.call(0);
        sleep(Duration::from_millis(10)).await;
        debouncer.call(10);
        sleep(Duration::from_millis(10)).await;
        debouncer.call(20);
        sleep(Duration::from_millis(200)).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (value, fired_at) = calls[0];
        assert_eq!(value, 20);
        let elapsed = fired_at - start;
        assert!(elapsed >= Duration::from_millis(70), "fired early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(75), "fired late: {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_each_fire() {
        let (count, callback) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(50), callback);

        debouncer.call(1);
        sleep(Duration::from_millis(60)).await;
        debouncer.call(2);
        sleep(Duration::from_millis(60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_is_deferred() {
        let (count, callback) = counter();
        let debouncer = Debouncer::new(Duration::ZERO, callback);

        debouncer.call(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_before_delay_never_fires() {
        let (count, callback) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(50), callback);

        debouncer.call(1);
        sleep(Duration::from_millis(20)).await;
        drop(debouncer);
        sleep(Duration::from_millis(500)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_clears_pending() {
        let (count, callback) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(50), callback);

        debouncer.call(1);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        sleep(Duration::from_millis(100)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_delay_leaves_previous_timer_running() {
        let (count, callback) = counter();
        let original = Debouncer::new(Duration::from_millis(50), callback);

        original.call(1);
        let rebound = original.with_delay(Duration::from_millis(10));
        assert_eq!(rebound.delay(), Duration::from_millis(10));
        assert!(!rebound.is_pending());
        rebound.call(2);
        sleep(Duration::from_millis(100)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_skips_intermediate_inputs() {
        let value = DebouncedValue::new("a", Duration::from_millis(50));

        value.set("b");
        sleep(Duration::from_millis(10)).await;
        value.set("c");

        // "b" would have landed at t=50 had it not been superseded
        sleep(Duration::from_millis(45)).await;
        assert_eq!(value.get(), "a");

        sleep(Duration::from_millis(10)).await;
        assert_eq!(value.get(), "c");
        assert!(!value.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_notifies_subscribers_once() {
        let value = DebouncedValue::new(0u32, Duration::from_millis(30));
        let mut rx = value.subscribe();

        for n in 1..=5 {
            value.set(n);
            sleep(Duration::from_millis(5)).await;
        }

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 5);
        sleep(Duration::from_millis(100)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_same_input_does_not_rearm() {
        let value = DebouncedValue::new(1u32, Duration::from_millis(30));

        value.set(1);
        assert!(!value.is_pending());

        value.set(2);
        sleep(Duration::from_millis(20)).await;
        value.set(2);
        sleep(Duration::from_millis(15)).await;
        assert_eq!(value.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_cancel_drops_pending_update() {
        let value = DebouncedValue::new(1u32, Duration::from_millis(30));
        let mut rx = value.subscribe();

        value.set(2);
        sleep(Duration::from_millis(10)).await;
        value.cancel();
        assert!(!value.is_pending());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(value.get(), 1);
        assert!(!rx.has_changed().unwrap());

        // the cancelled input can be fed again
        value.set(2);
        sleep(Duration::from_millis(35)).await;
        assert_eq!(value.get(), 2);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_drop_cancels_update() {
        let value = DebouncedValue::new(1u32, Duration::from_millis(30));
        let rx = value.subscribe();

        value.set(2);
        drop(value);
        sleep(Duration::from_millis(100)).await;

        assert_eq!(*rx.borrow(), 1);
    }
}
