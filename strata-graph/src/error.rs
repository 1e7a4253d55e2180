//! Error and warning taxonomy for graph building.
//!
//! Only two conditions are fatal, and only to the single resource they
//! belong to: a structurally invalid `sys` block and an unrecognized
//! `sys.type` tag. Everything else degrades — coercion mismatches and
//! unresolvable links are recorded as warnings attached to the built
//! resource, and stale updates are ignored with a log line.

use std::fmt;
use strata_schema::CoercionWarning;
use strata_types::{Link, ResourceKey};

/// Result type for graph building.
pub type BuildResult<T> = Result<T, BuildError>;

/// Fatal-per-resource build failures.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The document has no usable `sys` block (missing, not an object,
    /// or without `sys.id`).
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// `sys.type` carried a tag this client does not recognize.
    /// Fatal for this resource only; a batch carries on.
    #[error("unknown resource type: {tag}")]
    UnknownResourceType { tag: String },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuildError {
    /// Shorthand for a malformed-payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

impl From<strata_types::Error> for BuildError {
    fn from(err: strata_types::Error) -> Self {
        match err {
            strata_types::Error::MalformedPayload { reason } => Self::MalformedPayload { reason },
            strata_types::Error::UnknownResourceType { tag } => Self::UnknownResourceType { tag },
            strata_types::Error::Serialization(e) => Self::Json(e),
        }
    }
}

/// Non-fatal conditions recorded during a build and attached to the
/// resource (or batch outcome) they occurred in.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildWarning {
    /// A field value could not be safely converted to its declared type
    /// and was kept raw.
    FieldCoercion(CoercionWarning),

    /// A link whose target could not be resolved from the identity map,
    /// the same batch, or a deferred fetch. The field keeps an explicit
    /// broken-link marker so "empty" and "broken" stay distinguishable.
    UnresolvableLink { field_id: String, link: Link },

    /// An incoming resource carried a revision at or below the cached
    /// one; the identity map was left unchanged.
    StaleUpdateIgnored {
        key: ResourceKey,
        incoming_revision: u64,
        cached_revision: u64,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCoercion(w) => write!(f, "coercion: {w}"),
            Self::UnresolvableLink { field_id, link } => {
                write!(f, "unresolvable link in field '{field_id}': {link}")
            }
            Self::StaleUpdateIgnored {
                key,
                incoming_revision,
                cached_revision,
            } => write!(
                f,
                "stale update ignored for {key}: incoming revision {incoming_revision} <= cached {cached_revision}"
            ),
        }
    }
}
