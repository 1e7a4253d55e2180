//! Session-scoped identity map.
//!
//! Guarantees at most one live resource instance per composite key
//! within a builder session. The map is an explicit, passed-around
//! object — never process-global state — so independent sessions
//! (different spaces, environments, tests) cannot contaminate each
//! other.

use crate::resource::Resource;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use strata_types::ResourceKey;
use tracing::debug;

/// Outcome of a revision-gated [`IdentityMap::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No instance existed for the key; the incoming one was registered.
    Inserted,
    /// The incoming revision was strictly greater; the instance was
    /// replaced (last-writer-wins by revision, not arrival order).
    Replaced,
    /// The incoming revision equaled the cached one; the cached instance
    /// was kept (idempotent against replays).
    Unchanged,
    /// The incoming revision was older than the cached one; ignored.
    StaleIgnored,
}

/// Cache enforcing one live instance per resource identity.
///
/// Mutations are serialized behind the write lock, so two references to
/// the same id discovered while resolving different fields can never
/// produce two instances. Reads are cheap: resources are immutable after
/// registration, only whole-instance replacement occurs.
#[derive(Debug, Default)]
pub struct IdentityMap {
    inner: RwLock<HashMap<ResourceKey, Arc<Resource>>>,
}

impl IdentityMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the instance registered under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<Resource>> {
        self.inner.read().expect("identity map poisoned").get(key).cloned()
    }

    /// Returns the existing instance for `key`, or builds one with
    /// `factory`, registers it and returns it.
    ///
    /// Atomic relative to resolution: the write lock is held across the
    /// presence check and the insert.
    pub fn get_or_create<F>(&self, key: ResourceKey, factory: F) -> Arc<Resource>
    where
        F: FnOnce() -> Resource,
    {
        let mut inner = self.inner.write().expect("identity map poisoned");
        inner
            .entry(key)
            .or_insert_with(|| Arc::new(factory()))
            .clone()
    }

    /// Registers `incoming` under `key` only if its revision is strictly
    /// greater than the cached one. Stale and equal-revision updates
    /// leave the map unchanged and return the cached instance.
    pub fn update(
        &self,
        key: ResourceKey,
        incoming: Arc<Resource>,
    ) -> (Arc<Resource>, UpdateOutcome) {
        let mut inner = self.inner.write().expect("identity map poisoned");
        match inner.get(&key) {
            None => {
                inner.insert(key, incoming.clone());
                (incoming, UpdateOutcome::Inserted)
            }
            Some(cached) if incoming.revision() > cached.revision() => {
                inner.insert(key, incoming.clone());
                (incoming, UpdateOutcome::Replaced)
            }
            Some(cached) if incoming.revision() == cached.revision() => {
                (cached.clone(), UpdateOutcome::Unchanged)
            }
            Some(cached) => {
                debug!(
                    %key,
                    incoming = incoming.revision(),
                    cached = cached.revision(),
                    "stale update ignored"
                );
                (cached.clone(), UpdateOutcome::StaleIgnored)
            }
        }
    }

    /// Unconditionally swaps the instance under `key`, unless the cached
    /// revision has moved past the incoming one in the meantime.
    ///
    /// Used by the builder to promote a registered shell (sys only) to
    /// its fully populated instance at the same revision — the public
    /// revision-gated [`Self::update`] would treat that as a replay.
    pub(crate) fn promote(&self, key: ResourceKey, incoming: Arc<Resource>) -> Arc<Resource> {
        let mut inner = self.inner.write().expect("identity map poisoned");
        match inner.get(&key) {
            Some(cached) if cached.revision() > incoming.revision() => cached.clone(),
            _ => {
                inner.insert(key, incoming.clone());
                incoming
            }
        }
    }

    /// Undoes a shell registration after a failed populate: if `shell`
    /// is still the live instance for `key`, the previous instance is
    /// reinstated (or the key removed when there was none).
    pub(crate) fn rollback(
        &self,
        key: ResourceKey,
        shell: &Arc<Resource>,
        previous: Option<Arc<Resource>>,
    ) {
        let mut inner = self.inner.write().expect("identity map poisoned");
        if inner.get(&key).is_some_and(|current| Arc::ptr_eq(current, shell)) {
            match previous {
                Some(previous) => {
                    inner.insert(key, previous);
                }
                None => {
                    inner.remove(&key);
                }
            }
        }
    }

    /// Number of registered instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().expect("identity map poisoned").len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
