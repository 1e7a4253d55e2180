//! The `sys` metadata block attached to every delivery-API resource.
//!
//! `SystemProperties` is created once at parse time and never mutated:
//! a newer revision of the same resource id produces a whole new value.
//! Raw timestamp strings are preserved verbatim so that re-serialization
//! is byte-identical to what the service sent (cache interoperability);
//! chrono is only used to parse them when ordering matters.

use crate::ids::ResourceId;
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The closed set of resource kinds the delivery API emits.
///
/// Selected by the `sys.type` discriminator. An unrecognized tag is a
/// per-resource [`Error::UnknownResourceType`], never fatal to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    ContentType,
    Entry,
    Asset,
    Space,
    Environment,
    Locale,
    DeletedEntry,
    DeletedAsset,
}

impl ResourceType {
    /// Returns the wire tag for this resource type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ContentType => "ContentType",
            Self::Entry => "Entry",
            Self::Asset => "Asset",
            Self::Space => "Space",
            Self::Environment => "Environment",
            Self::Locale => "Locale",
            Self::DeletedEntry => "DeletedEntry",
            Self::DeletedAsset => "DeletedAsset",
        }
    }

    /// Whether this type marks a deleted resource (sync tombstones).
    #[must_use]
    pub const fn is_deletion_marker(&self) -> bool {
        matches!(self, Self::DeletedEntry | Self::DeletedAsset)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ContentType" => Ok(Self::ContentType),
            "Entry" => Ok(Self::Entry),
            "Asset" => Ok(Self::Asset),
            "Space" => Ok(Self::Space),
            "Environment" => Ok(Self::Environment),
            "Locale" => Ok(Self::Locale),
            "DeletedEntry" => Ok(Self::DeletedEntry),
            "DeletedAsset" => Ok(Self::DeletedAsset),
            other => Err(Error::UnknownResourceType {
                tag: other.to_string(),
            }),
        }
    }
}

/// A weak reference from `sys` to an owning space, environment or
/// content type.
///
/// Serializes to exactly `{"sys":{"type":"Link","linkType":…,"id":…}}`.
/// This is id-plus-lookup only — never an ownership edge; the referenced
/// resource lives in the session's identity map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
    sys: ResourceLinkSys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ResourceLinkSys {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "linkType")]
    link_type: String,
    id: ResourceId,
}

impl ResourceLink {
    /// Creates a link to a resource of the given link type (e.g. "Space").
    #[must_use]
    pub fn new(link_type: impl Into<String>, id: impl Into<ResourceId>) -> Self {
        Self {
            sys: ResourceLinkSys {
                kind: "Link".to_string(),
                link_type: link_type.into(),
                id: id.into(),
            },
        }
    }

    /// Creates a link to a space.
    #[must_use]
    pub fn space(id: impl Into<ResourceId>) -> Self {
        Self::new("Space", id)
    }

    /// Creates a link to an environment.
    #[must_use]
    pub fn environment(id: impl Into<ResourceId>) -> Self {
        Self::new("Environment", id)
    }

    /// Creates a link to a content type.
    #[must_use]
    pub fn content_type(id: impl Into<ResourceId>) -> Self {
        Self::new("ContentType", id)
    }

    /// The id of the referenced resource.
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.sys.id
    }

    /// The wire link type (e.g. "Space", "Environment", "ContentType").
    #[must_use]
    pub fn link_type(&self) -> &str {
        &self.sys.link_type
    }
}

/// Immutable metadata record attached to every resource.
///
/// Parsed once from the raw `sys` object; never mutated afterward.
/// Keys the client does not model are retained in `extra` so the block
/// re-serializes without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemProperties {
    pub id: ResourceId,

    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    /// Monotonically non-decreasing version stamp per resource id.
    /// Absent on resources the service never versions (e.g. spaces).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,

    /// Raw RFC 3339 string, preserved byte-for-byte.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Raw RFC 3339 string, preserved byte-for-byte. The service keeps
    /// `updatedAt >= createdAt`; the client stores whatever arrived and
    /// never rejects a payload over timestamp order.
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<ResourceLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ResourceLink>,

    /// Present on entries: the schema their fields are coerced against.
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ResourceLink>,

    /// Present on single-locale entry/asset instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Unmodeled `sys` keys, retained for lossless re-serialization.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SystemProperties {
    /// Parses the raw `sys` object of a resource.
    ///
    /// Distinguishes the two fatal-per-resource conditions: a missing or
    /// structurally invalid block ([`Error::MalformedPayload`]) and an
    /// unrecognized `sys.type` tag ([`Error::UnknownResourceType`]).
    pub fn from_raw(sys: &Value) -> Result<Self> {
        let obj = sys
            .as_object()
            .ok_or_else(|| Error::malformed("sys is not a JSON object"))?;

        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::malformed("sys.id missing or not a string"))?;
        if id.is_empty() {
            return Err(Error::malformed("sys.id is empty"));
        }

        let tag = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::malformed("sys.type missing or not a string"))?;
        // Classify the tag first so a new server-side type surfaces as
        // UnknownResourceType rather than a generic deserialization error.
        tag.parse::<ResourceType>()?;

        serde_json::from_value(sys.clone()).map_err(|e| Error::malformed(e.to_string()))
    }

    /// Serializes back to the raw `sys` object shape.
    pub fn to_raw(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// The revision, defaulting to 0 when the service omitted it.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.unwrap_or(0)
    }

    /// Parses `createdAt`, if present and well-formed.
    #[must_use]
    pub fn created_at_time(&self) -> Option<DateTime<FixedOffset>> {
        self.created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    /// Parses `updatedAt`, if present and well-formed.
    #[must_use]
    pub fn updated_at_time(&self) -> Option<DateTime<FixedOffset>> {
        self.updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }
}
