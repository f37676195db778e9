//! Asynchronous caching layer for expensive value lookups
//!
//! Wraps any producer of a value sequence keyed by a lookup string (for
//! example "all constructor candidates for type T"). The first request
//! for a key starts the producer on the runtime and memoizes the
//! in-flight buffer, so late subscribers see already-produced items
//! without a re-run. Consumers that need a bounded-time snapshot use
//! [`CachingValueProvider::get_values_now`]: they never block past their
//! wall-clock budget, while the producer keeps running and its results
//! stay cached for the next caller.
//!
//! The only mutable state shared across tasks is the per-entry buffer;
//! its mutex guards buffer appends and the completeness transitions and
//! nothing else. No lock is held across an await point.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
// tokio's Instant respects the paused test clock, unlike std's.
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProducerError(pub String);

/// Source of the values being cached. Runs on the tokio runtime,
/// detached from any requesting call.
///
/// Producers cooperate with cancellation through the sink: once
/// [`ValueSink::push`] returns `false` they must stop emitting and
/// return.
#[async_trait]
pub trait ValueProducer<T>: Send + Sync + 'static {
    async fn produce(&self, key: &str, sink: ValueSink<T>) -> Result<(), ProducerError>;
}

/// Write side of one cache entry, handed to the producer.
pub struct ValueSink<T> {
    entry: Arc<CacheEntry<T>>,
    max_items: usize,
}

impl<T> ValueSink<T> {
    /// Append one item. Returns `false` when the producer should stop:
    /// the entry was cancelled or the buffer reached its bound (which
    /// completes the entry).
    pub fn push(&self, item: T) -> bool {
        let keep_going = {
            let mut state = self.entry.state.lock();
            if state.cancelled || state.complete || state.failed {
                false
            } else {
                state.items.push(item);
                if state.items.len() >= self.max_items {
                    state.complete = true;
                    false
                } else {
                    true
                }
            }
        };
        self.entry.notify.notify_waiters();
        keep_going
    }

    pub fn is_cancelled(&self) -> bool {
        self.entry.state.lock().cancelled
    }
}

struct EntryState<T> {
    items: Vec<T>,
    complete: bool,
    failed: bool,
    cancelled: bool,
}

struct CacheEntry<T> {
    created: Instant,
    state: Mutex<EntryState<T>>,
    notify: Notify,
}

impl<T: Clone> CacheEntry<T> {
    fn new() -> Self {
        CacheEntry {
            created: Instant::now(),
            state: Mutex::new(EntryState {
                items: Vec::new(),
                complete: false,
                failed: false,
                cancelled: false,
            }),
            notify: Notify::new(),
        }
    }

    /// (items so far, no more items coming).
    fn snapshot(&self) -> (Vec<T>, bool) {
        let state = self.state.lock();
        (
            state.items.clone(),
            state.complete || state.failed || state.cancelled,
        )
    }
}

/// Generic caching decorator around a [`ValueProducer`].
pub struct CachingValueProvider<T> {
    entries: Arc<DashMap<String, Arc<CacheEntry<T>>>>,
    producer: Arc<dyn ValueProducer<T>>,
    ttl: Duration,
    max_items: usize,
}

impl<T: Clone + Send + 'static> CachingValueProvider<T> {
    pub fn new(producer: Arc<dyn ValueProducer<T>>, ttl: Duration, max_items: usize) -> Self {
        CachingValueProvider {
            entries: Arc::new(DashMap::new()),
            producer,
            ttl,
            max_items,
        }
    }

    /// Items produced for `key` within the wall-clock `budget`.
    ///
    /// Returns as soon as the entry stops growing (complete, failed or
    /// cancelled) or the budget elapses, whichever comes first. The
    /// producer is unaffected by the caller's deadline; items racing past
    /// it are simply kept for the next caller.
    pub async fn get_values_now(&self, key: &str, budget: Duration) -> Vec<T> {
        let entry = self.entry_for(key);
        let deadline = tokio::time::Instant::now() + budget;

        loop {
            let notified = entry.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (items, finished) = entry.snapshot();
            if finished {
                return items;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => {
                    return entry.snapshot().0;
                }
            }
        }
    }

    /// Buffered items and completeness without waiting. `None` when the
    /// key has no live entry.
    pub fn peek(&self, key: &str) -> Option<(Vec<T>, bool)> {
        self.entries.get(key).map(|entry| entry.snapshot())
    }

    /// Non-blocking read: starts a producer run when nothing usable is
    /// cached and returns whatever is buffered right now. Callable from
    /// synchronous code running on the runtime; later calls for the same
    /// key see the items the producer has accumulated meanwhile.
    pub fn get_values_snapshot(&self, key: &str) -> Vec<T> {
        self.entry_for(key).snapshot().0
    }

    /// Cooperatively cancel the in-flight producer for `key`. The entry
    /// stays cached, marked (possibly) incomplete.
    pub fn cancel(&self, key: &str) {
        if let Some(entry) = self.entries.get(key) {
            entry.state.lock().cancelled = true;
            entry.notify.notify_waiters();
        }
    }

    pub fn live_entries(&self) -> usize {
        self.entries.len()
    }

    /// Entry for `key`, starting a producer run when there is nothing
    /// usable cached. An empty key is unrelated to every cached key by
    /// definition and always gets a fresh run; cross-key reuse is not
    /// attempted either — only same-key lookups hit the cache, anything
    /// else falls back to a fresh producer run.
    fn entry_for(&self, key: &str) -> Arc<CacheEntry<T>> {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let usable = !key.is_empty()
                    && occupied.get().created.elapsed() < self.ttl
                    && !occupied.get().state.lock().failed;
                if usable {
                    occupied.get().clone()
                } else {
                    // Expired (or empty-key) entry: cancel the old run
                    // and start over.
                    occupied.get().state.lock().cancelled = true;
                    let fresh = Arc::new(CacheEntry::new());
                    occupied.insert(fresh.clone());
                    self.spawn_producer(key.to_string(), fresh.clone());
                    fresh
                }
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(CacheEntry::new());
                vacant.insert(fresh.clone());
                self.spawn_producer(key.to_string(), fresh.clone());
                fresh
            }
        }
    }

    fn spawn_producer(&self, key: String, entry: Arc<CacheEntry<T>>) {
        let producer = self.producer.clone();
        let entries = self.entries.clone();
        let max_items = self.max_items;

        tokio::spawn(async move {
            let sink = ValueSink {
                entry: entry.clone(),
                max_items,
            };
            match producer.produce(&key, sink).await {
                Ok(()) => {
                    {
                        let mut state = entry.state.lock();
                        if !state.cancelled {
                            state.complete = true;
                        }
                    }
                    entry.notify.notify_waiters();
                }
                Err(err) => {
                    warn!("value producer for `{}` failed: {}", key, err);
                    {
                        entry.state.lock().failed = true;
                    }
                    entry.notify.notify_waiters();
                    // A failed entry is evicted immediately rather than
                    // cached as permanently failed. Other keys are
                    // unaffected.
                    entries.remove_if(&key, |_, cached| Arc::ptr_eq(cached, &entry));
                }
            }
        });
    }
}

/// [`HintProvider`](crate::schema::HintProvider) backed by a caching
/// provider keyed on the query string. Completion calls are synchronous,
/// so the first call for a query starts the producer and returns what is
/// already buffered; subsequent keystrokes pick up the accumulated
/// results.
pub struct CachedHintProvider {
    provider: CachingValueProvider<crate::schema::StaticHint>,
}

impl CachedHintProvider {
    pub fn new(
        producer: Arc<dyn ValueProducer<crate::schema::StaticHint>>,
        ttl: Duration,
        max_items: usize,
    ) -> Self {
        CachedHintProvider {
            provider: CachingValueProvider::new(producer, ttl, max_items),
        }
    }
}

impl crate::schema::HintProvider for CachedHintProvider {
    fn hints(&self, query: &str) -> Vec<crate::schema::StaticHint> {
        self.provider.get_values_snapshot(query)
    }
}
