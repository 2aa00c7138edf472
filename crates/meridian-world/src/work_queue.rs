//! Fire-and-forget background work with owner-thread completion.
//!
//! Each submission runs its producer on a fresh worker thread. Results are
//! queued under a single mutex and handed back to the owning thread when it
//! calls [`WorkQueue::drain`], in the order the workers finished.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{error, trace};

use meridian_common::TerrainResult;

/// A finished job waiting to be applied on the owner thread.
type Completion<C> = Box<dyn FnOnce(&mut C) + Send>;

/// State shared between the owner and its workers.
struct Shared<C> {
    completed: Mutex<VecDeque<Completion<C>>>,
    ready: Condvar,
    in_flight: AtomicUsize,
}

/// Background work queue whose completions run against an owner context `C`.
pub struct WorkQueue<C> {
    shared: Arc<Shared<C>>,
    owner: ThreadId,
    name: String,
}

impl<C: 'static> WorkQueue<C> {
    /// Creates a new queue owned by the calling thread.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                completed: Mutex::new(VecDeque::new()),
                ready: Condvar::new(),
                in_flight: AtomicUsize::new(0),
            }),
            owner: thread::current().id(),
            name: name.into(),
        }
    }

    /// Runs `producer` on a worker thread and schedules `on_complete` for the
    /// next [`drain`](Self::drain) after it finishes.
    ///
    /// # Errors
    /// Returns an error if the worker thread could not be spawned.
    pub fn submit<T, P, F>(&self, producer: P, on_complete: F) -> TerrainResult<()>
    where
        T: Send + 'static,
        P: FnOnce() -> T + Send + 'static,
        F: FnOnce(&mut C, T) + Send + 'static,
    {
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-worker", self.name))
            .spawn(move || match panic::catch_unwind(AssertUnwindSafe(producer)) {
                Ok(result) => {
                    let completion: Completion<C> = Box::new(move |ctx| on_complete(ctx, result));
                    shared.completed.lock().push_back(completion);
                    shared.ready.notify_all();
                },
                Err(_) => {
                    error!("Background job panicked; its completion is dropped");
                    // Decrement under the lock so a waiter cannot miss the wakeup.
                    let _completed = shared.completed.lock();
                    shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                    shared.ready.notify_all();
                },
            });

        if let Err(e) = spawned {
            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    /// Applies every queued completion to `ctx`, returning how many ran.
    ///
    /// Never blocks on workers: only results already queued are applied.
    pub fn drain(&self, ctx: &mut C) -> usize {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "work queue '{}' drained off its owner thread",
            self.name
        );
        let ready = std::mem::take(&mut *self.shared.completed.lock());
        let count = ready.len();
        for completion in ready {
            completion(ctx);
            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if count > 0 {
            trace!("{}: applied {count} completions", self.name);
        }
        count
    }

    /// Number of submissions whose completion has not run yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Number of completions waiting for the next drain.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.completed.lock().len()
    }

    /// Blocks until at least one completion is queued, nothing is in flight,
    /// or `timeout` elapses. Returns whether completions are ready.
    ///
    /// Intended for headless drivers and tests; the update loop never waits.
    pub fn wait_for_completions(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut completed = self.shared.completed.lock();
        while completed.is_empty() && self.in_flight() > 0 {
            if self.shared.ready.wait_until(&mut completed, deadline).timed_out() {
                break;
            }
        }
        !completed.is_empty()
    }
}

impl<C> std::fmt::Debug for WorkQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.name)
            .field("in_flight", &self.shared.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tally {
        hits: Vec<u32>,
        order: Vec<usize>,
        threads: Vec<ThreadId>,
    }

    fn drain_all(queue: &WorkQueue<Tally>, tally: &mut Tally) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while queue.in_flight() > 0 && Instant::now() < deadline {
            queue.wait_for_completions(Duration::from_millis(50));
            queue.drain(tally);
        }
    }

    #[test]
    fn test_each_callback_runs_once_on_owner_thread() {
        let queue = WorkQueue::new("test");
        let mut tally = Tally {
            hits: vec![0; 50],
            ..Tally::default()
        };
        let mut rng = fastrand::Rng::with_seed(42);

        for id in 0..50_usize {
            let delay = Duration::from_millis(rng.u64(0..20));
            queue
                .submit(
                    move || {
                        thread::sleep(delay);
                        id
                    },
                    |tally: &mut Tally, id| {
                        tally.hits[id] += 1;
                        tally.order.push(id);
                        tally.threads.push(thread::current().id());
                    },
                )
                .expect("spawn");
        }

        drain_all(&queue, &mut tally);

        assert_eq!(queue.in_flight(), 0);
        assert!(tally.hits.iter().all(|&h| h == 1));
        assert_eq!(tally.order.len(), 50);
        let owner = thread::current().id();
        assert!(tally.threads.iter().all(|&t| t == owner));
    }

    #[test]
    fn test_drain_without_results_is_non_blocking() {
        let queue: WorkQueue<Tally> = WorkQueue::new("idle");
        let mut tally = Tally::default();
        assert_eq!(queue.drain(&mut tally), 0);
        assert_eq!(queue.pending(), 0);
        assert!(!queue.wait_for_completions(Duration::from_millis(1)));
    }

    #[test]
    fn test_completions_follow_finish_order() {
        let queue = WorkQueue::new("order");
        let mut tally = Tally::default();
        queue
            .submit(
                || {
                    thread::sleep(Duration::from_millis(150));
                    0_usize
                },
                |t: &mut Tally, id| t.order.push(id),
            )
            .expect("spawn");
        queue
            .submit(|| 1_usize, |t: &mut Tally, id| t.order.push(id))
            .expect("spawn");

        drain_all(&queue, &mut tally);
        assert_eq!(tally.order, vec![1, 0]);
    }

    #[test]
    fn test_panicking_job_is_not_counted_forever() {
        let queue: WorkQueue<Tally> = WorkQueue::new("panic");
        let mut tally = Tally::default();
        queue
            .submit(
                || -> usize { panic!("boom") },
                |t: &mut Tally, id| t.order.push(id),
            )
            .expect("spawn");
        drain_all(&queue, &mut tally);
        assert_eq!(queue.in_flight(), 0);
        assert!(tally.order.is_empty());
    }

    #[test]
    fn test_waiter_wakes_when_job_panics() {
        let queue: WorkQueue<Tally> = WorkQueue::new("panic-wait");
        queue
            .submit(
                || -> usize {
                    thread::sleep(Duration::from_millis(50));
                    panic!("boom")
                },
                |t: &mut Tally, id| t.order.push(id),
            )
            .expect("spawn");

        let start = Instant::now();
        assert!(!queue.wait_for_completions(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(queue.in_flight(), 0);
    }
}
