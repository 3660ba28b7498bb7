use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<String>,
    // keys waiting to be processed, queued or not
    dirty: HashSet<String>,
    processing: HashSet<String>,
    requeues: HashMap<String, u32>,
    // keys waiting out a backoff before being added back
    waiting: usize,
    shutting_down: bool,
}

impl QueueState {
    /// Returns true when a worker should be woken.
    fn add(&mut self, key: &str) -> bool {
        if self.shutting_down || self.dirty.contains(key) {
            return false;
        }
        self.dirty.insert(key.to_string());
        if self.processing.contains(key) {
            return false;
        }
        self.queue.push_back(key.to_string());
        true
    }
}

/// Queue of keys to sync.
///
/// A key is queued at most once however often it is added. A key handed out by
/// `get` is not handed out again until `done` is called for it; adds in the
/// meantime are replayed by `done`. Failed keys come back through
/// `add_rate_limited` after an exponential per-key backoff.
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    base_delay: Duration,
    max_delay: Duration,
}

impl WorkQueue {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            base_delay,
            max_delay,
        })
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, key: &str) {
        let queued = self.lock().add(key);
        if queued {
            self.notify.notify_one();
        }
    }

    /// Waits for the next key. None once the queue has been shut down.
    pub async fn get(&self) -> Option<String> {
        loop {
            {
                let mut state = self.lock();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Marks the key as processed.
    pub fn done(&self, key: &str) {
        let requeued = {
            let mut state = self.lock();
            state.processing.remove(key);
            if state.dirty.contains(key) {
                state.queue.push_back(key.to_string());
                true
            } else {
                false
            }
        };
        if requeued {
            self.notify.notify_one();
        }
    }

    /// Clears the key's failure count.
    pub fn forget(&self, key: &str) {
        self.lock().requeues.remove(key);
    }

    pub fn num_requeues(&self, key: &str) -> u32 {
        self.lock().requeues.get(key).copied().unwrap_or(0)
    }

    /// Backoff before the key's next retry. Counts the retry.
    pub fn when(&self, key: &str) -> Duration {
        let mut state = self.lock();
        let requeues = state.requeues.entry(key.to_string()).or_insert(0);
        let exp = *requeues;
        *requeues += 1;

        self.base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay)
    }

    /// Adds the key back once its backoff has passed. Must be called from within
    /// a tokio runtime.
    pub fn add_rate_limited(self: &Arc<Self>, key: &str) {
        let delay = self.when(key);
        self.lock().waiting += 1;
        let queue = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let queued = {
                let mut state = queue.lock();
                state.waiting -= 1;
                state.add(&key)
            };
            if queued {
                queue.notify.notify_one();
            }
        });
    }

    /// Number of keys waiting out a backoff.
    pub fn waiting(&self) -> usize {
        self.lock().waiting
    }

    /// True while keys are queued, or will be once their backoff has passed.
    pub fn has_pending(&self) -> bool {
        let state = self.lock();
        !state.queue.is_empty() || state.waiting > 0
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops accepting keys. Keys already queued are still handed out; `get`
    /// returns None once they are gone.
    pub fn shut_down(&self) {
        self.lock().shutting_down = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }
}
