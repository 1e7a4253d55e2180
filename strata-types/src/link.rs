//! Unresolved references between resources.
//!
//! A link is a transient descriptor embedded in raw entry/asset field
//! data. It is consumed during resolution and replaced by the concrete
//! resource (or an explicit unresolvable marker) — it is never itself a
//! cached resource.

use crate::ids::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// What kind of resource a field-level link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkTarget {
    Entry,
    Asset,
}

impl LinkTarget {
    /// Returns the wire tag ("Entry" or "Asset").
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "Entry",
            Self::Asset => "Asset",
        }
    }
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkTarget {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Entry" => Ok(Self::Entry),
            "Asset" => Ok(Self::Asset),
            _ => Err(()),
        }
    }
}

/// A placeholder reference to another resource: type plus target id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub link_type: LinkTarget,
    pub target: ResourceId,
}

impl Link {
    /// Creates a link descriptor.
    #[must_use]
    pub fn new(link_type: LinkTarget, target: impl Into<ResourceId>) -> Self {
        Self {
            link_type,
            target: target.into(),
        }
    }

    /// Extracts a link from a raw field value.
    ///
    /// Returns `None` when the value is not link-shaped at all (a plain
    /// scalar, an array, an object without a `sys.type == "Link"` block),
    /// so callers can tell "ordinary value" apart from "malformed link".
    /// A link to something other than an entry or asset also yields
    /// `None`; such values stay in the field as raw data.
    #[must_use]
    pub fn from_raw(value: &Value) -> Option<Self> {
        let sys = value.get("sys")?.as_object()?;
        if sys.get("type")?.as_str()? != "Link" {
            return None;
        }
        let link_type = sys.get("linkType")?.as_str()?.parse().ok()?;
        let target = sys.get("id")?.as_str()?;
        if target.is_empty() {
            return None;
        }
        Some(Self::new(link_type, target))
    }

    /// Serializes back to the wire shape
    /// `{"sys":{"type":"Link","linkType":…,"id":…}}`.
    #[must_use]
    pub fn to_raw(&self) -> Value {
        json!({
            "sys": {
                "type": "Link",
                "linkType": self.link_type.as_str(),
                "id": self.target.as_str(),
            }
        })
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.link_type, self.target)
    }
}
