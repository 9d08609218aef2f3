//! Quote store and sync engine.
//!
//! # Responsibility
//! - Own the canonical quote list for one session.
//! - Persist every mutation to durable key-value storage.
//! - Register local quotes with the remote and reconcile remote batches.
//! - Hold conflict records until manually resolved or superseded.
//!
//! # Invariants
//! - All list mutations happen under the single `state` lock.
//! - Network calls never hold the `state` lock.
//! - Quotes are never removed, so positions recorded on append stay valid.
//! - No two quotes share a non-null id; a remote id that is already taken
//!   is not assigned.
//! - Remote failures degrade to local-only behavior and are reported as
//!   notifications, never as errors.

use crate::clock::Clock;
use crate::model::conflict::ConflictRecord;
use crate::model::quote::{
    category_key, is_all_selector, seed_quotes, Quote, QuoteId, QuoteValidationError,
    ALL_CATEGORIES,
};
use crate::remote::RemoteClient;
use crate::service::notification::{
    import_unsynced_message, sync_conflicts_message, NoticeLevel, Notification, MSG_ADD_LOCAL_ONLY,
    MSG_ADD_SYNCED, MSG_FETCH_FAILED, MSG_IMPORT_OK, MSG_KEPT_LOCAL, MSG_KEPT_SERVER,
    MSG_NOTHING_TO_RESOLVE, MSG_SYNC_OK,
};
use crate::storage::{
    KeyValueStore, KvError, KEY_CONFLICTS, KEY_LAST_CATEGORY_FILTER, KEY_LAST_QUOTE, KEY_QUOTES,
};
use crate::sync::{reconcile, SyncOutcome, SyncReport};
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};

/// Rendered by `Pick::Empty`.
pub const NO_QUOTES_SENTINEL: &str = "No quotes available for this category.";

/// File name used for exported snapshots.
pub const EXPORT_FILE_NAME: &str = "quotes.json";

const NOTIFICATION_CAPACITY: usize = 32;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced synchronously by store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Blank text or category on manual add.
    InvalidInput(QuoteValidationError),
    /// Import payload is not an array of valid quote objects.
    InvalidFormat(String),
    /// Durable storage could not be read at startup.
    Storage(KvError),
    /// Persisted quote data violates store invariants.
    CorruptState(String),
    Serialize(serde_json::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidFormat(_) => "invalid_format",
            Self::Storage(err) => err.code(),
            Self::CorruptState(_) => "corrupt_state",
            Self::Serialize(_) => "serialize_failed",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::InvalidFormat(details) => write!(f, "invalid import format: {details}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
            Self::CorruptState(details) => write!(f, "corrupt stored quotes: {details}"),
            Self::Serialize(err) => write!(f, "serialization failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::InvalidFormat(_) | Self::CorruptState(_) => None,
        }
    }
}

impl From<QuoteValidationError> for StoreError {
    fn from(value: QuoteValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<KvError> for StoreError {
    fn from(value: KvError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Injected collaborators of the store.
#[derive(Clone)]
pub struct Capabilities {
    /// Survives restarts: `quotes`, `lastCategoryFilter`.
    pub durable: Arc<dyn KeyValueStore>,
    /// Lives for the session: `lastQuote`, `conflicts`.
    pub session: Arc<dyn KeyValueStore>,
    pub remote: Arc<dyn RemoteClient>,
    pub clock: Arc<dyn Clock>,
}

/// Result of `filter_and_pick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    Quote(Quote),
    /// No quote matched the selector.
    Empty,
}

impl Pick {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Quote(quote) => Some(quote),
            Self::Empty => None,
        }
    }
}

impl Display for Pick {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quote(quote) => write!(f, "{}", quote.display_line()),
            Self::Empty => write!(f, "{NO_QUOTES_SENTINEL}"),
        }
    }
}

/// Result of `resolve_conflicts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// There was no outstanding conflict; nothing changed.
    NothingToResolve,
    /// Local versions restored for this many conflicts.
    KeptLocal(usize),
    /// Server versions kept for this many conflicts.
    KeptServer(usize),
}

struct StoreState {
    quotes: Vec<Quote>,
    conflicts: Vec<ConflictRecord>,
}

/// Session-wide quote store.
///
/// Shared as `Arc<QuoteStore>` between the front end and the sync scheduler.
pub struct QuoteStore {
    state: Mutex<StoreState>,
    sync_gate: Mutex<()>,
    caps: Capabilities,
    batch_limit: usize,
    notices: broadcast::Sender<Notification>,
}

impl QuoteStore {
    /// Loads the store from durable storage, seeding defaults when empty.
    ///
    /// # Errors
    /// - `Storage` when durable storage cannot be read.
    /// - `CorruptState` when stored quotes fail to parse, contain blank
    ///   fields or duplicate ids.
    pub fn open(caps: Capabilities, batch_limit: usize) -> StoreResult<Self> {
        let quotes = match caps.durable.get(KEY_QUOTES)? {
            Some(raw) => parse_stored_quotes(&raw)?,
            None => {
                info!("event=store_open module=store status=seeded");
                seed_quotes()
            }
        };
        let conflicts = load_session_conflicts(caps.session.as_ref());
        info!(
            "event=store_open module=store status=ok quotes={} conflicts={} batch_limit={}",
            quotes.len(),
            conflicts.len(),
            batch_limit
        );

        let (notices, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Ok(Self {
            state: Mutex::new(StoreState { quotes, conflicts }),
            sync_gate: Mutex::new(()),
            caps,
            batch_limit: batch_limit.max(1),
            notices,
        })
    }

    /// Subscribes to transient notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notices.subscribe()
    }

    /// Snapshot of all quotes in insertion order.
    pub async fn quotes(&self) -> Vec<Quote> {
        self.state.lock().await.quotes.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.quotes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Category selector values: `"all"` then each distinct category.
    ///
    /// Categories differing only by case are listed once, using the first
    /// spelling seen.
    pub async fn categories(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut seen = HashSet::new();
        let mut categories = vec![ALL_CATEGORIES.to_string()];
        for quote in &state.quotes {
            if seen.insert(category_key(&quote.category)) {
                categories.push(quote.category.clone());
            }
        }
        categories
    }

    /// Outstanding conflicts awaiting manual resolution.
    pub async fn pending_conflicts(&self) -> Vec<ConflictRecord> {
        self.state.lock().await.conflicts.clone()
    }

    /// Last rendered pick of this session.
    pub fn last_viewed(&self) -> Option<String> {
        read_key(self.caps.session.as_ref(), KEY_LAST_QUOTE)
    }

    /// Last category selector, `"all"` when none was stored.
    pub fn last_category_filter(&self) -> String {
        read_key(self.caps.durable.as_ref(), KEY_LAST_CATEGORY_FILTER)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| ALL_CATEGORIES.to_string())
    }

    /// Adds one quote locally, then tries to register it remotely.
    ///
    /// The quote is kept locally with `id = None` when registration fails.
    ///
    /// # Errors
    /// - `InvalidInput` for blank text or category; nothing is stored.
    pub async fn add_quote(&self, text: &str, category: &str) -> StoreResult<Quote> {
        let mut quote = Quote::parse_input(text, category).inspect_err(|err| {
            debug!("event=quote_add module=store status=rejected reason={err}");
        })?;

        let index = {
            let mut state = self.state.lock().await;
            state.quotes.push(quote.clone());
            self.persist_quotes(&state.quotes);
            state.quotes.len() - 1
        };
        info!("event=quote_add module=store status=ok index={index}");

        match self
            .caps
            .remote
            .register_quote(&quote.text, &quote.category)
            .await
        {
            Ok(id) => {
                if self.assign_remote_id(index, id).await {
                    quote.id = Some(id);
                    self.notify(NoticeLevel::Info, MSG_ADD_SYNCED);
                } else {
                    self.notify(NoticeLevel::Warning, MSG_ADD_LOCAL_ONLY);
                }
            }
            Err(err) => {
                warn!(
                    "event=quote_register module=store status=error error_code={} error={err}",
                    err.code()
                );
                self.notify(NoticeLevel::Warning, MSG_ADD_LOCAL_ONLY);
            }
        }

        Ok(quote)
    }

    /// Parses raw file content and imports it.
    ///
    /// # Errors
    /// - `InvalidFormat` when `bytes` is not valid JSON or fails validation.
    pub async fn import_json(&self, bytes: &[u8]) -> StoreResult<usize> {
        let raw: Value = serde_json::from_slice(bytes)
            .map_err(|err| StoreError::InvalidFormat(format!("invalid JSON: {err}")))?;
        self.import_quotes(raw).await
    }

    /// Imports a batch of quotes atomically, then registers each remotely.
    ///
    /// Incoming ids are discarded; every imported quote starts unsynced.
    /// Registration of each quote is independent of the others.
    ///
    /// # Errors
    /// - `InvalidFormat` when `raw` is not an array of objects with
    ///   non-blank string `text` and `category`; nothing is stored.
    pub async fn import_quotes(&self, raw: Value) -> StoreResult<usize> {
        let imported = validate_import(raw).inspect_err(|err| {
            warn!("event=quote_import module=store status=rejected error={err}");
        })?;
        let count = imported.len();

        let first_index = {
            let mut state = self.state.lock().await;
            let first_index = state.quotes.len();
            state.quotes.extend(imported.iter().cloned());
            self.persist_quotes(&state.quotes);
            first_index
        };
        info!("event=quote_import module=store status=ok count={count}");
        self.notify(NoticeLevel::Info, MSG_IMPORT_OK);

        let mut unsynced = 0;
        for (offset, quote) in imported.iter().enumerate() {
            let registered = match self
                .caps
                .remote
                .register_quote(&quote.text, &quote.category)
                .await
            {
                Ok(id) => self.assign_remote_id(first_index + offset, id).await,
                Err(err) => {
                    debug!(
                        "event=quote_register module=store status=error error_code={} error={err}",
                        err.code()
                    );
                    false
                }
            };
            if !registered {
                unsynced += 1;
            }
        }

        if unsynced > 0 {
            warn!("event=quote_import_register module=store status=partial unsynced={unsynced}");
            self.notify(NoticeLevel::Warning, &import_unsynced_message(unsynced));
        }

        Ok(count)
    }

    /// Picks one quote at random among those matching `category`.
    ///
    /// Records the selector as the durable last filter and the rendered
    /// result as the session's last viewed quote.
    pub async fn filter_and_pick(&self, category: &str) -> Pick {
        let selector = category.trim();
        let pick = {
            let state = self.state.lock().await;
            let candidates: Vec<&Quote> = state
                .quotes
                .iter()
                .filter(|quote| quote.matches_category(selector))
                .collect();
            match candidates.choose(&mut rand::thread_rng()) {
                Some(quote) => Pick::Quote((*quote).clone()),
                None => Pick::Empty,
            }
        };

        let stored_selector = if is_all_selector(selector) {
            ALL_CATEGORIES
        } else {
            selector
        };
        write_key(
            self.caps.durable.as_ref(),
            KEY_LAST_CATEGORY_FILTER,
            stored_selector,
        );
        write_key(
            self.caps.session.as_ref(),
            KEY_LAST_QUOTE,
            &pick.to_string(),
        );

        pick
    }

    /// Serializes the full store as a JSON array.
    pub async fn export_snapshot(&self) -> StoreResult<Vec<u8>> {
        let state = self.state.lock().await;
        let bytes = serde_json::to_vec(&state.quotes)?;
        info!(
            "event=quote_export module=store status=ok count={} bytes={}",
            state.quotes.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Runs one reconciliation cycle against the remote.
    ///
    /// Concurrent calls are serialized. A failed fetch leaves the store
    /// untouched and is reported through the returned outcome.
    pub async fn sync(&self) -> SyncReport {
        let _in_flight = self.sync_gate.lock().await;
        let started_at = Instant::now();
        info!("event=sync module=store status=start");

        let batch = match self.caps.remote.fetch_quotes(self.batch_limit).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(
                    "event=sync module=store status=error duration_ms={} error_code={} error={err}",
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                self.notify(NoticeLevel::Warning, MSG_FETCH_FAILED);
                return SyncReport {
                    applied: 0,
                    conflicts: Vec::new(),
                    outcome: SyncOutcome::RemoteUnavailable(err.to_string()),
                    finished_at_ms: self.caps.clock.now_ms(),
                };
            }
        };

        if batch.is_empty() {
            info!("event=sync module=store status=ok applied=0 reason=empty_batch");
            return SyncReport {
                applied: 0,
                conflicts: Vec::new(),
                outcome: SyncOutcome::Synced,
                finished_at_ms: self.caps.clock.now_ms(),
            };
        }

        let merge = {
            let mut state = self.state.lock().await;
            let batch = batch.into_iter().take(self.batch_limit).collect();
            let merge = reconcile(&mut state.quotes, batch);
            self.persist_quotes(&state.quotes);
            if !merge.conflicts.is_empty() {
                state.conflicts = merge.conflicts.clone();
                self.persist_conflicts(&state.conflicts);
            }
            merge
        };

        info!(
            "event=sync module=store status=ok duration_ms={} appended={} overwritten={} skipped={} conflicts={}",
            started_at.elapsed().as_millis(),
            merge.appended,
            merge.overwritten,
            merge.skipped,
            merge.conflicts.len()
        );

        let outcome = if merge.conflicts.is_empty() {
            self.notify(NoticeLevel::Info, MSG_SYNC_OK);
            SyncOutcome::Synced
        } else {
            self.notify(
                NoticeLevel::Warning,
                &sync_conflicts_message(merge.conflicts.len()),
            );
            SyncOutcome::Conflicted
        };

        SyncReport {
            applied: merge.applied(),
            conflicts: merge.conflicts,
            outcome,
            finished_at_ms: self.caps.clock.now_ms(),
        }
    }

    /// Settles outstanding conflicts.
    ///
    /// With `keep_local`, each conflicting position is restored to its
    /// pre-sync local version; otherwise the applied server versions stay.
    /// The outstanding set is cleared in both cases.
    pub async fn resolve_conflicts(&self, keep_local: bool) -> Resolution {
        let mut state = self.state.lock().await;
        if state.conflicts.is_empty() {
            info!("event=conflict_resolve module=store status=noop");
            self.notify(NoticeLevel::Info, MSG_NOTHING_TO_RESOLVE);
            return Resolution::NothingToResolve;
        }

        let conflicts = std::mem::take(&mut state.conflicts);
        let count = conflicts.len();
        let resolution = if keep_local {
            for conflict in conflicts {
                let target = conflict.id();
                if let Some(index) = state
                    .quotes
                    .iter()
                    .position(|quote| target.is_some() && quote.id == target)
                {
                    state.quotes[index] = conflict.local;
                }
            }
            self.persist_quotes(&state.quotes);
            self.notify(NoticeLevel::Info, MSG_KEPT_LOCAL);
            Resolution::KeptLocal(count)
        } else {
            self.notify(NoticeLevel::Info, MSG_KEPT_SERVER);
            Resolution::KeptServer(count)
        };

        if let Err(err) = self.caps.session.remove(KEY_CONFLICTS) {
            error!(
                "event=session_write module=store status=error key={KEY_CONFLICTS} error_code={} error={err}",
                err.code()
            );
        }
        info!("event=conflict_resolve module=store status=ok keep_local={keep_local} count={count}");
        resolution
    }

    /// Sets the remote id of the quote at `index` if the id is still free.
    async fn assign_remote_id(&self, index: usize, id: QuoteId) -> bool {
        let mut state = self.state.lock().await;
        if state.quotes.iter().any(|quote| quote.id == Some(id)) {
            warn!("event=quote_register module=store status=skipped id={id} reason=id_in_use");
            return false;
        }
        match state.quotes.get_mut(index) {
            Some(quote) if quote.id.is_none() => {
                quote.id = Some(id);
                self.persist_quotes(&state.quotes);
                true
            }
            _ => false,
        }
    }

    fn persist_quotes(&self, quotes: &[Quote]) {
        match serde_json::to_string(quotes) {
            Ok(encoded) => write_key(self.caps.durable.as_ref(), KEY_QUOTES, &encoded),
            Err(err) => error!("event=store_persist module=store status=error error={err}"),
        }
    }

    fn persist_conflicts(&self, conflicts: &[ConflictRecord]) {
        match serde_json::to_string(conflicts) {
            Ok(encoded) => write_key(self.caps.session.as_ref(), KEY_CONFLICTS, &encoded),
            Err(err) => error!("event=conflict_persist module=store status=error error={err}"),
        }
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        // No subscribers is normal for one-shot callers.
        let _ = self.notices.send(Notification {
            level,
            message: message.to_string(),
            at_ms: self.caps.clock.now_ms(),
        });
    }
}

/// Validates an import payload and converts it into fresh local quotes.
pub fn validate_import(raw: Value) -> StoreResult<Vec<Quote>> {
    let Value::Array(items) = raw else {
        return Err(StoreError::InvalidFormat(
            "expected a JSON array of quotes".to_string(),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let text = required_field(item, "text", index)?;
            let category = required_field(item, "category", index)?;
            Ok(Quote::new(text.trim(), category.trim()))
        })
        .collect()
}

fn required_field<'a>(item: &'a Value, field: &str, index: usize) -> StoreResult<&'a str> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            StoreError::InvalidFormat(format!(
                "item {index} must have a non-empty string `{field}`"
            ))
        })
}

fn parse_stored_quotes(raw: &str) -> StoreResult<Vec<Quote>> {
    let quotes: Vec<Quote> =
        serde_json::from_str(raw).map_err(|err| StoreError::CorruptState(err.to_string()))?;

    let mut ids = HashSet::new();
    for (index, quote) in quotes.iter().enumerate() {
        quote
            .validate()
            .map_err(|err| StoreError::CorruptState(format!("quote {index}: {err}")))?;
        if let Some(id) = quote.id {
            if !ids.insert(id) {
                return Err(StoreError::CorruptState(format!("duplicate quote id {id}")));
            }
        }
    }
    Ok(quotes)
}

fn load_session_conflicts(session: &dyn KeyValueStore) -> Vec<ConflictRecord> {
    let Some(raw) = read_key(session, KEY_CONFLICTS) else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!("event=session_read module=store status=ignored key={KEY_CONFLICTS} error={err}");
        Vec::new()
    })
}

fn read_key(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    store.get(key).unwrap_or_else(|err| {
        error!(
            "event=kv_read module=store status=error key={key} error_code={} error={err}",
            err.code()
        );
        None
    })
}

fn write_key(store: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(err) = store.set(key, value) {
        error!(
            "event=kv_write module=store status=error key={key} error_code={} error={err}",
            err.code()
        );
    }
}
