#![allow(dead_code)]

use async_trait::async_trait;
use quotesync_core::{
    Capabilities, FixedClock, MemoryKeyValueStore, Quote, QuoteId, QuoteStore, RemoteClient,
    RemoteError, RemoteResult,
};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Remote fake with a scripted fetch batch and sequential ids.
pub struct ScriptedRemote {
    batch: Mutex<Option<Vec<Quote>>>,
    next_id: AtomicI64,
    register_fails: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self {
            batch: Mutex::new(Some(Vec::new())),
            next_id: AtomicI64::new(101),
            register_fails: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_batch(&self, batch: Vec<Quote>) {
        *self.batch.lock().unwrap() = Some(batch);
    }

    pub fn fail_fetch(&self) {
        *self.batch.lock().unwrap() = None;
    }

    pub fn fail_register(&self, fails: bool) {
        self.register_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_next_id(&self, id: QuoteId) {
        self.next_id.store(id, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClient for ScriptedRemote {
    async fn fetch_quotes(&self, limit: usize) -> RemoteResult<Vec<Quote>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match self.batch.lock().unwrap().as_ref() {
            Some(batch) => Ok(batch.iter().take(limit).cloned().collect()),
            None => Err(RemoteError::Status(503)),
        }
    }

    async fn register_quote(&self, _text: &str, _category: &str) -> RemoteResult<QuoteId> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if self.register_fails.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// Remote fake that yields inside `fetch_quotes` and can hold
/// `register_quote` until the test releases it.
pub struct GatedRemote {
    batch: Mutex<Vec<Quote>>,
    next_id: AtomicI64,
    fetches_in_flight: AtomicUsize,
    pub max_fetches_in_flight: AtomicUsize,
    hold_register: AtomicBool,
    pub register_entered: Notify,
    pub register_release: Notify,
}

impl GatedRemote {
    pub fn new() -> Self {
        Self {
            batch: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(101),
            fetches_in_flight: AtomicUsize::new(0),
            max_fetches_in_flight: AtomicUsize::new(0),
            hold_register: AtomicBool::new(false),
            register_entered: Notify::new(),
            register_release: Notify::new(),
        }
    }

    pub fn set_batch(&self, batch: Vec<Quote>) {
        *self.batch.lock().unwrap() = batch;
    }

    pub fn hold_register(&self, hold: bool) {
        self.hold_register.store(hold, Ordering::SeqCst);
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_fetches_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteClient for GatedRemote {
    async fn fetch_quotes(&self, limit: usize) -> RemoteResult<Vec<Quote>> {
        let now = self.fetches_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_fetches_in_flight.fetch_max(now, Ordering::SeqCst);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let batch = self.batch.lock().unwrap().iter().take(limit).cloned().collect();
        self.fetches_in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(batch)
    }

    async fn register_quote(&self, _text: &str, _category: &str) -> RemoteResult<QuoteId> {
        if self.hold_register.load(Ordering::SeqCst) {
            self.register_entered.notify_one();
            self.register_release.notified().await;
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

pub struct Harness {
    pub store: QuoteStore,
    pub durable: Arc<MemoryKeyValueStore>,
    pub session: Arc<MemoryKeyValueStore>,
    pub clock: Arc<FixedClock>,
}

pub fn capabilities(
    durable: Arc<MemoryKeyValueStore>,
    session: Arc<MemoryKeyValueStore>,
    remote: Arc<dyn RemoteClient>,
    clock: Arc<FixedClock>,
) -> Capabilities {
    Capabilities {
        durable,
        session,
        remote,
        clock,
    }
}

/// Store over fresh in-memory storage, seeded with the default quotes.
pub fn harness(remote: Arc<dyn RemoteClient>) -> Harness {
    let durable = Arc::new(MemoryKeyValueStore::new());
    let session = Arc::new(MemoryKeyValueStore::new());
    let clock = Arc::new(FixedClock::new(1_700_000_000_000));
    let store = QuoteStore::open(
        capabilities(durable.clone(), session.clone(), remote, clock.clone()),
        10,
    )
    .unwrap();
    Harness {
        store,
        durable,
        session,
        clock,
    }
}

/// Store whose durable storage already holds `quotes`.
pub fn harness_with_quotes(remote: Arc<dyn RemoteClient>, quotes: &[Quote]) -> Harness {
    let durable = Arc::new(MemoryKeyValueStore::new());
    quotesync_core::KeyValueStore::set(
        durable.as_ref(),
        quotesync_core::storage::KEY_QUOTES,
        &serde_json::to_string(quotes).unwrap(),
    )
    .unwrap();
    let session = Arc::new(MemoryKeyValueStore::new());
    let clock = Arc::new(FixedClock::new(1_700_000_000_000));
    let store = QuoteStore::open(
        capabilities(durable.clone(), session.clone(), remote, clock.clone()),
        10,
    )
    .unwrap();
    Harness {
        store,
        durable,
        session,
        clock,
    }
}
