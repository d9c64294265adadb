//! Tag-aware cache store: keyed entries, a tag index and single-flight
//! population.
//!
//! The entry map is sharded ([`dashmap`]) so hits stay lock-free. Everything
//! that must move together - the tag index, per-tag epoch counters and the
//! in-flight table - sits behind one mutex that is only ever held for map
//! surgery, never across an `.await`.
//!
//! Epochs give invalidation its ordering guarantee: a load snapshots the
//! epochs of its tags when it starts, and its insert is discarded if any
//! epoch moved while it was in flight. A sweep bumps epochs unconditionally,
//! so even a key that had nothing stored yet cannot be repopulated with
//! pre-sweep data.

use crate::error::Result;
use crate::key::CacheKey;
use crate::model::Tag;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// One cached payload with its grouping tags.
///
/// Entries are immutable: population replaces the whole entry, never patches
/// the payload in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: CacheKey,
    payload: Bytes,
    tags: Vec<Tag>,
    created_at: Instant,
    ttl: Option<Duration>,
}

impl CacheEntry {
    fn new(key: CacheKey, payload: Bytes, tags: Vec<Tag>, ttl: Option<Duration>) -> Self {
        CacheEntry {
            key,
            payload,
            tags,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Time since this entry was stored.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.created_at.elapsed() >= ttl,
            None => false,
        }
    }
}

/// How a [`TagStore::get_or_compute`] call was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from a stored entry.
    Hit,
    /// This caller ran the compute and (epoch permitting) populated the entry.
    Loaded,
    /// Another caller's in-flight compute supplied the payload.
    Joined,
}

type FlightResult = Result<Bytes>;

/// An in-flight load: its identity, the epochs it saw at claim time and the
/// channel joiners wait on.
#[derive(Debug)]
struct Flight {
    id: u64,
    epochs: Vec<(Tag, u64)>,
    rx: watch::Receiver<Option<FlightResult>>,
}

#[derive(Debug, Default)]
struct CacheIndex {
    keys_by_tag: HashMap<Tag, HashSet<CacheKey>>,
    epochs: HashMap<Tag, u64>,
    flights: HashMap<CacheKey, Flight>,
}

/// The claim a caller holds after the slow-path lock round.
enum Claim {
    /// An entry landed while the caller queued on the lock.
    Ready(Bytes),
    /// This caller leads the load.
    Lead {
        tx: watch::Sender<Option<FlightResult>>,
        id: u64,
        epochs: Vec<(Tag, u64)>,
    },
    /// Another caller is already loading this key.
    Join(watch::Receiver<Option<FlightResult>>),
}

/// Tag-aware cache store with single-flight population.
///
/// # Example
///
/// ```ignore
/// use catalog_cache::{Tag, TagStore};
/// use bytes::Bytes;
///
/// let store = TagStore::new();
/// let (payload, _) = store
///     .get_or_compute("books-1-3".into(), vec![Tag::new("booksCache")], None, || async {
///         Ok(Bytes::from_static(b"[]"))
///     })
///     .await?;
///
/// // A book mutation later drops every entry tagged booksCache
/// store.invalidate_tags(&[Tag::new("booksCache")]);
/// ```
#[derive(Debug)]
pub struct TagStore {
    entries: DashMap<CacheKey, CacheEntry>,
    index: Mutex<CacheIndex>,
    flight_seq: AtomicU64,
}

impl TagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        TagStore {
            entries: DashMap::new(),
            index: Mutex::new(CacheIndex::default()),
            flight_seq: AtomicU64::new(0),
        }
    }

    /// Look up an entry. Pure: never populates and never purges.
    ///
    /// Expired entries read as absent; the next [`get_or_compute`] for the
    /// key replaces them.
    ///
    /// [`get_or_compute`]: TagStore::get_or_compute
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.clone())
    }

    /// Fetch `key` from cache or populate it via `compute`, collapsing
    /// concurrent callers into a single flight.
    ///
    /// Exactly one caller runs `compute` per key at a time; the rest await
    /// the shared outcome, success and failure alike. Failures are never
    /// stored, so the call after a failed load starts from scratch. A sweep
    /// of any of `tags` while the load is in flight discards the insert: the
    /// callers already waiting still receive the payload they asked for, but
    /// the store never republishes pre-sweep data to later readers.
    ///
    /// # Errors
    ///
    /// Whatever error `compute` produced, shared verbatim with every caller
    /// of the flight.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        tags: Vec<Tag>,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<(Bytes, CacheOutcome)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes>>,
    {
        // Lock-free fast path.
        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired() {
                debug!("✓ Cache hit for {}", key);
                return Ok((entry.payload.clone(), CacheOutcome::Hit));
            }
        }

        let mut claim = self.claim(&key, &tags);
        loop {
            match claim {
                Claim::Ready(payload) => {
                    debug!("✓ Cache hit for {} (after lock)", key);
                    return Ok((payload, CacheOutcome::Hit));
                }
                Claim::Lead { tx, id, epochs } => {
                    debug!("» Leading load for {}", key);
                    let mut guard = FlightGuard {
                        store: self,
                        key: key.clone(),
                        id,
                        armed: true,
                    };
                    let result = compute().await;
                    let published = self.complete_flight(&key, id, &epochs, ttl, &result);
                    guard.armed = false;

                    // Wake joiners only once the store state is settled.
                    let _ = tx.send(Some(result.clone()));

                    return match result {
                        Ok(payload) => {
                            if published {
                                debug!("✓ Cached {} ({} bytes)", key, payload.len());
                            }
                            Ok((payload, CacheOutcome::Loaded))
                        }
                        Err(e) => {
                            debug!("✗ Load for {} failed: {}", key, e);
                            Err(e)
                        }
                    };
                }
                Claim::Join(rx) => {
                    debug!("» Joining in-flight load for {}", key);
                    match Self::await_flight(rx).await {
                        Some(result) => {
                            return result.map(|payload| (payload, CacheOutcome::Joined));
                        }
                        None => {
                            // The leader went away without publishing; claim again.
                            claim = self.claim(&key, &tags);
                        }
                    }
                }
            }
        }
    }

    /// Remove every entry carrying any of `tags`. Returns how many entries
    /// were dropped.
    ///
    /// Each swept tag's epoch advances even when nothing was stored under it,
    /// so an in-flight load that began before the sweep cannot publish after
    /// it. Entries under other tags are untouched.
    pub fn invalidate_tags(&self, tags: &[Tag]) -> usize {
        let mut removed = 0usize;
        let mut index = self.lock_index();

        for tag in tags {
            *index.epochs.entry(tag.clone()).or_insert(0) += 1;

            let Some(keys) = index.keys_by_tag.remove(tag) else {
                continue;
            };
            for key in keys {
                let Some((_, entry)) = self.entries.remove(&key) else {
                    continue;
                };
                removed += 1;
                // Unlink the entry from its other tags.
                for other in entry.tags() {
                    if other == tag {
                        continue;
                    }
                    if let Some(set) = index.keys_by_tag.get_mut(other) {
                        set.remove(&key);
                        if set.is_empty() {
                            index.keys_by_tag.remove(other);
                        }
                    }
                }
            }
        }

        debug!(
            "Invalidated {} entries for tags [{}]",
            removed,
            tags.iter()
                .map(Tag::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        removed
    }

    /// Drop every entry and tag association.
    ///
    /// Epochs advance for every known tag so in-flight loads cannot
    /// resurrect cleared data.
    pub fn clear(&self) {
        let mut index = self.lock_index();

        let mut tags: HashSet<Tag> = index.epochs.keys().cloned().collect();
        tags.extend(index.keys_by_tag.keys().cloned());
        for flight in index.flights.values() {
            tags.extend(flight.epochs.iter().map(|(tag, _)| tag.clone()));
        }
        for tag in tags {
            *index.epochs.entry(tag).or_insert(0) += 1;
        }

        index.keys_by_tag.clear();
        self.entries.clear();
        info!("✓ Cache cleared");
    }

    /// Number of stored entries, counting expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decide this caller's role for `key` under the index lock.
    fn claim(&self, key: &CacheKey, tags: &[Tag]) -> Claim {
        let mut index = self.lock_index();

        // The entry may have landed while this caller queued on the lock.
        let cached = self
            .entries
            .get(key)
            .map(|entry| (entry.payload.clone(), entry.is_expired(), entry.tags.clone()));
        match cached {
            Some((payload, false, _)) => return Claim::Ready(payload),
            Some((_, true, expired_tags)) => {
                // Lazily purge the expired entry before repopulating.
                self.entries.remove(key);
                for tag in &expired_tags {
                    if let Some(keys) = index.keys_by_tag.get_mut(tag) {
                        keys.remove(key);
                        if keys.is_empty() {
                            index.keys_by_tag.remove(tag);
                        }
                    }
                }
            }
            None => {}
        }

        if let Some(flight) = index.flights.get(key) {
            let current = flight
                .epochs
                .iter()
                .all(|(tag, seen)| index.epochs.get(tag).copied().unwrap_or(0) == *seen);
            if current {
                return Claim::Join(flight.rx.clone());
            }
            // A sweep outdated this flight; its insert will be discarded.
            // Fall through and replace it with a fresh one.
        }

        let id = self.flight_seq.fetch_add(1, Ordering::Relaxed);
        let epochs: Vec<(Tag, u64)> = tags
            .iter()
            .map(|tag| (tag.clone(), index.epochs.get(tag).copied().unwrap_or(0)))
            .collect();
        let (tx, rx) = watch::channel(None);
        index.flights.insert(
            key.clone(),
            Flight {
                id,
                epochs: epochs.clone(),
                rx,
            },
        );
        Claim::Lead { tx, id, epochs }
    }

    /// Unregister the flight and, if the result is a success and no swept tag
    /// outdated it, publish the entry. Returns whether the entry landed.
    fn complete_flight(
        &self,
        key: &CacheKey,
        id: u64,
        snapshot: &[(Tag, u64)],
        ttl: Option<Duration>,
        result: &FlightResult,
    ) -> bool {
        let mut index = self.lock_index();

        if index.flights.get(key).is_some_and(|flight| flight.id == id) {
            index.flights.remove(key);
        }

        let Ok(payload) = result else {
            return false;
        };

        let current = snapshot
            .iter()
            .all(|(tag, seen)| index.epochs.get(tag).copied().unwrap_or(0) == *seen);
        if !current {
            debug!("✗ Discarding stale load for {} (tag swept mid-flight)", key);
            return false;
        }

        let tags: Vec<Tag> = snapshot.iter().map(|(tag, _)| tag.clone()).collect();
        for tag in &tags {
            index
                .keys_by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(
            key.clone(),
            CacheEntry::new(key.clone(), payload.clone(), tags, ttl),
        );
        true
    }

    /// Wait for a flight's broadcast. `None` means the leader vanished.
    async fn await_flight(
        mut rx: watch::Receiver<Option<FlightResult>>,
    ) -> Option<FlightResult> {
        loop {
            {
                let value = rx.borrow_and_update();
                if let Some(result) = value.as_ref() {
                    return Some(result.clone());
                }
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Lock the index, recovering from poisoning.
    fn lock_index(&self) -> MutexGuard<'_, CacheIndex> {
        match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("⚠ Cache index mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for TagStore {
    fn default() -> Self {
        TagStore::new()
    }
}

/// Unregisters an in-flight load if its leader is dropped before completing,
/// so joiners re-claim instead of waiting forever.
struct FlightGuard<'a> {
    store: &'a TagStore,
    key: CacheKey,
    id: u64,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut index = self.store.lock_index();
        if index
            .flights
            .get(&self.key)
            .is_some_and(|flight| flight.id == self.id)
        {
            index.flights.remove(&self.key);
            debug!("⚠ In-flight load for {} dropped before completion", self.key);
        }
    }
}
