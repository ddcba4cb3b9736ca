//! # Lease Registry
//!
//! The registry map is guarded by a short-held `parking_lot::Mutex` that is
//! only taken to look up or create a key's slot, and always dropped before
//! the slot itself is awaited. Slots are `tokio::sync::Mutex<bool>`: fair,
//! so waiters on one key are served in arrival order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::error::LeaseError;

/// The unit of mutual exclusion: one tag key on one resource.
///
/// Ordered by identifier, then tag key. Batch acquisition uses this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseKey {
    pub identifier: String,
    pub tag_key: String,
}

impl LeaseKey {
    pub fn new(identifier: impl Into<String>, tag_key: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            tag_key: tag_key.into(),
        }
    }

    /// Every `(identifier, tag_key)` combination of the two lists.
    pub fn product<I, K>(identifiers: I, tag_keys: K) -> Vec<LeaseKey>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let tag_keys: Vec<K::Item> = tag_keys.into_iter().collect();
        identifiers
            .into_iter()
            .flat_map(|id| {
                tag_keys
                    .iter()
                    .map(move |key| LeaseKey::new(id.as_ref(), key.as_ref()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn claimed(&self) -> LeaseError {
        LeaseError::WriteAlreadyClaimed {
            identifier: self.identifier.clone(),
            tag_key: self.tag_key.clone(),
        }
    }
}

impl fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.identifier, self.tag_key)
    }
}

/// Non-blocking snapshot of a key's lease, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// The key has never been leased.
    Unseen,
    /// Nobody holds the key and the last holder did not claim a write.
    Free,
    /// Nobody holds the key and the last holder claimed a write.
    Claimed,
    /// Someone holds the key right now.
    Held,
}

type Slot = Arc<tokio::sync::Mutex<bool>>;

/// Process-wide registry of tag leases.
///
/// Create one per process and share it behind an `Arc`. Tests create a fresh
/// one per case.
#[derive(Debug, Default)]
pub struct LeaseRegistry {
    slots: Mutex<HashMap<LeaseKey, Slot>>,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &LeaseKey) -> Slot {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Wait for exclusive access to `(identifier, tag_key)`.
    ///
    /// Fails with [`LeaseError::WriteAlreadyClaimed`] if the previous holder
    /// released with a write claim. The pair is unlocked again before the
    /// error is returned.
    pub async fn acquire(&self, identifier: &str, tag_key: &str) -> Result<Lease, LeaseError> {
        self.acquire_key(LeaseKey::new(identifier, tag_key)).await
    }

    /// [`acquire`](Self::acquire) for an already-built key.
    pub async fn acquire_key(&self, key: LeaseKey) -> Result<Lease, LeaseError> {
        let slot = self.slot(&key);
        let guard = slot.lock_owned().await;

        if *guard {
            drop(guard);
            tracing::debug!(lease = %key, "lease refused: write already claimed");
            return Err(key.claimed());
        }

        tracing::debug!(lease = %key, "lease granted");
        Ok(Lease { key, guard })
    }

    /// Lease every `identifier × tag_key` pair, all or nothing.
    ///
    /// Pairs are taken in sorted order. On the first refused pair, every
    /// lease already taken by this call is dropped and the refused pair is
    /// reported.
    pub async fn acquire_many<I, K>(&self, identifiers: I, tag_keys: K) -> Result<LeaseSet, LeaseError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let grant = self
            .acquire_batch(LeaseKey::product(identifiers, tag_keys), Vec::new())
            .await?;
        Ok(grant.required)
    }

    /// Lease two disjoint groups of keys in one sorted pass.
    ///
    /// A refused `required` key aborts the whole batch. A refused `yielding`
    /// key is skipped and reported in [`LeaseGrant::deferred`]. A key present
    /// in both groups is treated as required.
    pub async fn acquire_batch<R, Y>(&self, required: R, yielding: Y) -> Result<LeaseGrant, LeaseError>
    where
        R: IntoIterator<Item = LeaseKey>,
        Y: IntoIterator<Item = LeaseKey>,
    {
        let mut plan: BTreeMap<LeaseKey, bool> = yielding.into_iter().map(|k| (k, false)).collect();
        plan.extend(required.into_iter().map(|k| (k, true)));

        let mut grant = LeaseGrant::default();
        for (key, is_required) in plan {
            match self.acquire_key(key.clone()).await {
                Ok(lease) if is_required => grant.required.leases.push(lease),
                Ok(lease) => grant.yielding.leases.push(lease),
                Err(err) if is_required => {
                    tracing::debug!(
                        lease = %key,
                        abandoned = grant.required.len() + grant.yielding.len(),
                        "batch lease aborted"
                    );
                    return Err(err);
                }
                Err(_) => grant.deferred.push(key),
            }
        }
        Ok(grant)
    }

    /// Inspect a key without waiting for it.
    pub fn claim_state(&self, identifier: &str, tag_key: &str) -> ClaimState {
        let key = LeaseKey::new(identifier, tag_key);
        let Some(slot) = self.slots.lock().get(&key).cloned() else {
            return ClaimState::Unseen;
        };
        let state = match slot.try_lock() {
            Ok(flag) if *flag => ClaimState::Claimed,
            Ok(_) => ClaimState::Free,
            Err(_) => ClaimState::Held,
        };
        state
    }

    /// Number of keys ever leased.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one key.
///
/// Conclude it with [`release`](Self::release). Dropping it instead unlocks
/// the key and leaves the flag unclaimed.
#[derive(Debug)]
pub struct Lease {
    key: LeaseKey,
    guard: OwnedMutexGuard<bool>,
}

impl Lease {
    pub fn key(&self) -> &LeaseKey {
        &self.key
    }

    /// Record `claim_write` for the key and unlock it.
    ///
    /// `true` means this holder's write is the pair's lasting state, so a
    /// later delete must not undo it. `false` relinquishes the pair.
    pub fn release(mut self, claim_write: bool) {
        *self.guard = claim_write;
        tracing::trace!(lease = %self.key, claim_write, "lease released");
    }
}

/// A group of leases released together.
#[derive(Debug, Default)]
pub struct LeaseSet {
    leases: Vec<Lease>,
}

impl LeaseSet {
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &LeaseKey> {
        self.leases.iter().map(Lease::key)
    }

    pub fn contains(&self, identifier: &str, tag_key: &str) -> bool {
        self.keys()
            .any(|k| k.identifier == identifier && k.tag_key == tag_key)
    }

    /// Release every lease with the same `claim_write`.
    pub fn release(self, claim_write: bool) {
        for lease in self.leases {
            lease.release(claim_write);
        }
    }
}

/// Result of [`LeaseRegistry::acquire_batch`].
#[derive(Debug, Default)]
pub struct LeaseGrant {
    /// Leases for the required keys.
    pub required: LeaseSet,
    /// Leases for the yielding keys that were not claimed.
    pub yielding: LeaseSet,
    /// Yielding keys skipped because a write already claimed them.
    pub deferred: Vec<LeaseKey>,
}
