//! Trailing-edge debounce on the tokio runtime.
//!
//! `debounce(callback, wait)` returns a handle whose `call(args)` cancels any
//! pending invocation and schedules a new one `wait` later with the latest
//! arguments. Only the last call in a burst fires. An invocation that has
//! already fired is never cancelled; it runs to completion.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Create a debounced wrapper around `callback`.
///
/// Each wrapper owns its own timer; wrappers never share state.
pub fn debounce<A, F, Fut>(callback: F, wait: Duration) -> Debounced<A>
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let callback: Callback<A> = Arc::new(move |args| {
        Box::pin(callback(args)) as std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
    });
    Debounced {
        callback,
        wait,
        slot: Arc::new(Mutex::new(Slot::default())),
    }
}

type Callback<A> =
    Arc<dyn Fn(A) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Scheduled invocation waiting for its quiet period.
struct Timer {
    handle: JoinHandle<()>,
    /// Set once the quiet period has elapsed and the callback is running.
    fired: bool,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    timer: Option<Timer>,
    /// Invocations that fired and may still be running.
    running: Vec<JoinHandle<()>>,
}

/// Handle returned by [`debounce`].
pub struct Debounced<A> {
    callback: Callback<A>,
    wait: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl<A: Send + 'static> Debounced<A> {
    /// Schedule the callback with `args`, superseding any pending call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, args: A) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        let generation = slot.generation;

        if let Some(prev) = slot.timer.take() {
            if prev.fired {
                slot.running.push(prev.handle);
            } else {
                prev.handle.abort();
            }
        }
        slot.running.retain(|h| !h.is_finished());

        let shared = Arc::clone(&self.slot);
        let callback = Arc::clone(&self.callback);
        let wait = self.wait;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            {
                let mut slot = lock(&shared);
                if slot.generation != generation {
                    return;
                }
                if let Some(timer) = slot.timer.as_mut() {
                    timer.fired = true;
                }
            }
            callback(args).await;
        });

        // The task cannot mark itself fired before this runs: it needs the lock we hold.
        slot.timer = Some(Timer {
            handle,
            fired: false,
        });
    }

    /// Whether a call is scheduled but has not fired yet.
    pub fn is_pending(&self) -> bool {
        lock(&self.slot)
            .timer
            .as_ref()
            .map(|t| !t.fired && !t.handle.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the pending call (if any) to fire and for every running
    /// invocation to finish.
    pub async fn settle(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut slot = lock(&self.slot);
            let mut handles = std::mem::take(&mut slot.running);
            if let Some(timer) = slot.timer.take() {
                handles.push(timer.handle);
            }
            handles
        };
        for handle in handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    log::error!("Debounced callback panicked: {}", e);
                }
            }
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    const WAIT: Duration = Duration::from_millis(300);

    fn recorder() -> (Arc<Mutex<Vec<(u32, Instant)>>>, Debounced<u32>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debounced = debounce(
            move |n: u32| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push((n, Instant::now()));
                }
            },
            WAIT,
        );
        (seen, debounced)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_only_last_call_once() {
        let (seen, debounced) = recorder();

        for n in 1..=5 {
            debounced.call(n);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(WAIT * 2).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_call_fires_after_wait() {
        let (seen, debounced) = recorder();
        let start = Instant::now();

        debounced.call(7);
        assert!(debounced.is_pending());

        tokio::time::sleep(WAIT - Duration::from_millis(1)).await;
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 7);
        assert!(seen[0].1 - start >= WAIT);
        assert!(!debounced.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_fire_separately() {
        let (seen, debounced) = recorder();

        debounced.call(1);
        tokio::time::sleep(WAIT + Duration::from_millis(10)).await;
        debounced.call(2);
        tokio::time::sleep(WAIT + Duration::from_millis(10)).await;

        let values: Vec<u32> = seen.lock().unwrap().iter().map(|(n, _)| *n).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrappers_do_not_share_timers() {
        let (seen_a, a) = recorder();
        let (seen_b, b) = recorder();

        a.call(1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        b.call(2);
        tokio::time::sleep(WAIT * 2).await;

        assert_eq!(seen_a.lock().unwrap().len(), 1);
        assert_eq!(seen_b.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_invocation_is_not_cancelled() {
        let started = Arc::new(AtomicU32::new(0));
        let finished = Arc::new(AtomicU32::new(0));
        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));

        let debounced = debounce(
            move |_: ()| {
                let (s, f) = (Arc::clone(&s), Arc::clone(&f));
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    f.fetch_add(1, Ordering::SeqCst);
                }
            },
            WAIT,
        );

        debounced.call(());
        tokio::time::sleep(WAIT + Duration::from_millis(10)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // A new call while the first is mid-flight must not abort it.
        debounced.call(());
        debounced.settle().await;

        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_flushes_pending_call() {
        let (seen, debounced) = recorder();
        debounced.call(1);
        debounced.call(2);
        debounced.settle().await;

        let values: Vec<u32> = seen.lock().unwrap().iter().map(|(n, _)| *n).collect();
        assert_eq!(values, vec![2]);
    }
}
