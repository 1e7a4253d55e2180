//! Typed resources built from `sys`-tagged raw JSON.
//!
//! Resources are immutable once registered in the identity map; a newer
//! revision replaces the whole instance. Cross-resource references are
//! stored as identity-map keys, not owning pointers, so shared targets
//! and reference cycles need no per-resource ownership bookkeeping.

use crate::error::BuildWarning;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_schema::ContentType;
use strata_types::{Link, ResourceKey, SystemProperties};

/// A resolved or explicitly-broken reference held by an entry field.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    /// The target is registered in the session's identity map under this
    /// key. Ownership stays with the map; any number of parents may hold
    /// the same key.
    Resolved(ResourceKey),

    /// Resolution failed (not found, deleted, fetch error or timeout).
    /// Kept instead of null so callers can tell "empty" from "broken".
    Broken(Link),
}

impl LinkState {
    /// The identity-map key of a resolved link.
    #[must_use]
    pub fn resolved_key(&self) -> Option<&ResourceKey> {
        match self {
            Self::Resolved(key) => Some(key),
            Self::Broken(_) => None,
        }
    }

    /// Whether this link failed to resolve.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken(_))
    }
}

/// One coerced entry field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A non-reference value, already coerced against the schema.
    Scalar(Value),
    /// A reference to another resource.
    Link(LinkState),
    /// An ordered collection (arrays of links resolve element-wise).
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// The scalar JSON value, if this is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// The link state, if this is a reference field.
    #[must_use]
    pub fn as_link(&self) -> Option<&LinkState> {
        match self {
            Self::Link(state) => Some(state),
            _ => None,
        }
    }

    /// The elements, if this is an array field.
    #[must_use]
    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// A content entry: schema-coerced fields plus the warnings gathered
/// while building them.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub sys: SystemProperties,
    fields: Vec<(String, FieldValue)>,
    warnings: Vec<BuildWarning>,
}

impl Entry {
    pub(crate) fn new(
        sys: SystemProperties,
        fields: Vec<(String, FieldValue)>,
        warnings: Vec<BuildWarning>,
    ) -> Self {
        Self {
            sys,
            fields,
            warnings,
        }
    }

    /// The value of field `id`, or `None` when the payload did not carry
    /// it.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field_id, _)| field_id == id)
            .map(|(_, value)| value)
    }

    /// All fields in payload order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(id, value)| (id.as_str(), value))
    }

    /// Non-fatal warnings recorded while this entry was built.
    #[must_use]
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }
}

/// The `file` payload of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFile {
    pub url: String,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// A media asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub sys: SystemProperties,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file: Option<AssetFile>,
    /// Fields beyond the modeled ones, kept raw.
    pub extra_fields: serde_json::Map<String, Value>,
    pub(crate) warnings: Vec<BuildWarning>,
}

impl Asset {
    /// Non-fatal warnings recorded while this asset was built.
    #[must_use]
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }
}

/// A space: the top-level container resources belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    pub sys: SystemProperties,
    pub name: Option<String>,
}

/// An environment within a space.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub sys: SystemProperties,
    pub name: Option<String>,
}

/// A locale definition resource (not to be confused with the locale
/// component of an identity-map key).
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleDefinition {
    pub sys: SystemProperties,
    pub code: String,
    pub name: Option<String>,
    pub default: bool,
    pub fallback_code: Option<String>,
}

/// Tombstone for a deleted entry or asset.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionMarker {
    pub sys: SystemProperties,
}

/// Any typed resource built from a `sys`-tagged document.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    ContentType(ContentType),
    Entry(Entry),
    Asset(Asset),
    Space(Space),
    Environment(Environment),
    Locale(LocaleDefinition),
    DeletedEntry(DeletionMarker),
    DeletedAsset(DeletionMarker),
}

impl Resource {
    /// The metadata block shared by every resource kind.
    #[must_use]
    pub fn sys(&self) -> &SystemProperties {
        match self {
            Self::ContentType(ct) => &ct.sys,
            Self::Entry(e) => &e.sys,
            Self::Asset(a) => &a.sys,
            Self::Space(s) => &s.sys,
            Self::Environment(e) => &e.sys,
            Self::Locale(l) => &l.sys,
            Self::DeletedEntry(d) | Self::DeletedAsset(d) => &d.sys,
        }
    }

    /// The revision stamp, 0 when the service omitted one.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.sys().revision()
    }

    /// Downcast to an entry.
    #[must_use]
    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Self::Entry(e) => Some(e),
            _ => None,
        }
    }

    /// Downcast to an asset.
    #[must_use]
    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            Self::Asset(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast to a content type.
    #[must_use]
    pub fn as_content_type(&self) -> Option<&ContentType> {
        match self {
            Self::ContentType(ct) => Some(ct),
            _ => None,
        }
    }
}
