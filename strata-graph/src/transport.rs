//! Transport collaborator boundary.
//!
//! The builder never talks HTTP itself: when a link target is absent
//! from the identity map it asks this trait for the raw document, once,
//! bounded by the session's fetch timeout. Retry, rate limiting and
//! caching belong to the implementation behind the trait.

use async_trait::async_trait;
use serde_json::Value;
use strata_types::{EnvironmentId, ResourceId, ResourceType, SpaceId};

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors a transport may surface. All of them resolve the requesting
/// link to its broken marker; none abort the surrounding graph build.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("fetch timed out")]
    Timeout,
}

/// Fetches raw resource documents for deferred link resolution.
#[async_trait]
pub trait ResourceTransport: Send + Sync {
    /// Fetches the raw JSON document for a resource, or `Ok(None)` when
    /// the service reports it does not exist.
    async fn fetch_resource(
        &self,
        resource_type: ResourceType,
        id: &ResourceId,
        space: &SpaceId,
        environment: &EnvironmentId,
        locale: Option<&str>,
    ) -> TransportResult<Option<Value>>;
}

/// An in-memory transport for testing.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Serves canned raw payloads keyed by resource type and id.
    /// Counts fetches and can be switched to fail every request.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        payloads: Mutex<HashMap<(ResourceType, String), Value>>,
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl MockTransport {
        /// Creates an empty mock; every fetch is a miss until payloads
        /// are inserted.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a raw payload to serve for the given type and id.
        pub fn insert(&self, resource_type: ResourceType, id: impl Into<String>, raw: Value) {
            self.payloads
                .lock()
                .unwrap()
                .insert((resource_type, id.into()), raw);
        }

        /// Makes every subsequent fetch fail with a network error.
        pub fn fail_all(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Number of fetches seen so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResourceTransport for MockTransport {
        async fn fetch_resource(
            &self,
            resource_type: ResourceType,
            id: &ResourceId,
            _space: &SpaceId,
            _environment: &EnvironmentId,
            _locale: Option<&str>,
        ) -> TransportResult<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Network("mock transport failing".into()));
            }
            Ok(self
                .payloads
                .lock()
                .unwrap()
                .get(&(resource_type, id.as_str().to_string()))
                .cloned())
        }
    }
}
