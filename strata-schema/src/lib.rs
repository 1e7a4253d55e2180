//! Content-type schema model for Strata.
//!
//! Defines the types the resource graph builder coerces entry fields
//! against:
//! - [`FieldType`] — the closed set of field data-type tags, plus the
//!   `Unknown` placeholder for forward compatibility
//! - [`FieldDefinition`] — one schema field (id, name, type, link target,
//!   array items, localized/required flags, validations)
//! - [`ContentType`] — a named, order-preserving collection of field
//!   definitions with an optional display field
//! - [`coerce_field`] — best-effort conversion of raw field values to
//!   their declared types, reporting [`CoercionWarning`]s instead of
//!   failing
//!
//! Schemas (de)serialize to the exact delivery-API wire shape so cached
//! payloads re-hydrate without loss.

mod coerce;
mod content_type;
mod field;

pub use coerce::{CoercionWarning, coerce_field};
pub use content_type::ContentType;
pub use field::{ArrayItems, FieldDefinition, FieldType};
