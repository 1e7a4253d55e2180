//! Core type definitions for the Strata content model.
//!
//! This crate defines the fundamental types shared by the schema model
//! and the resource graph builder:
//! - Resource, space and environment identifiers (opaque server-assigned strings)
//! - The `sys` metadata block attached to every delivery-API resource
//! - Link descriptors (unresolved references to entries and assets)
//! - The composite identity-map key
//!
//! Everything that depends on a content-type schema (field definitions,
//! coercion) lives in `strata-schema`; graph construction lives in
//! `strata-graph`.

mod ids;
mod key;
mod link;
mod sys;

pub use ids::{EnvironmentId, ResourceId, SpaceId};
pub use key::ResourceKey;
pub use link::{Link, LinkTarget};
pub use sys::{ResourceLink, ResourceType, SystemProperties};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while interpreting raw delivery-API payloads.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The `sys` block is missing or structurally invalid. Fatal to the
    /// single resource it belongs to, never to a batch.
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// `sys.type` carried a tag this client does not recognize.
    #[error("unknown resource type: {tag}")]
    UnknownResourceType { tag: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a malformed-payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}
