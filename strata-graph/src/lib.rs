//! Resource graph builder and link resolution engine for Strata.
//!
//! Takes raw delivery-API JSON and produces a strongly-typed,
//! internally-consistent resource graph:
//!
//! - **Builder**: dispatches on the `sys.type` discriminator, coerces
//!   entry fields against their content type, and registers every
//!   resource in the session's identity map
//! - **Identity map**: at most one live instance per (type, id, space,
//!   environment, locale) within a session; updates are last-writer-wins
//!   by revision, not arrival order
//! - **Link resolution**: identity-map lookup first, then one bounded
//!   deferred fetch through the transport collaborator, then an explicit
//!   broken-link marker — never a silent null
//! - **Transport**: the abstract boundary to whatever actually talks to
//!   the service; a mock lives in [`transport::mock`] for tests
//!
//! Reference cycles are safe by construction: a resource's shell is
//! registered before its fields resolve, so a link back to it reads the
//! existing instance instead of recursing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_graph::{BuilderConfig, ResourceBuilder};
//! use strata_graph::transport::mock::MockTransport;
//!
//! let config = BuilderConfig::new("cfexampleapi", "master");
//! let builder = ResourceBuilder::new(config, Arc::new(MockTransport::new()));
//! ```

mod builder;
mod error;
mod identity;
mod resource;
pub mod transport;

pub use builder::{BuilderConfig, CollectionOutcome, ResourceBuilder};
pub use error::{BuildError, BuildResult, BuildWarning};
pub use identity::{IdentityMap, UpdateOutcome};
pub use resource::{
    Asset, AssetFile, DeletionMarker, Entry, Environment, FieldValue, LinkState,
    LocaleDefinition, Resource, Space,
};
pub use transport::{ResourceTransport, TransportError, TransportResult};
