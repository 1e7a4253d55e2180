//! Field definitions: one schema field of a content type.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use strata_types::LinkTarget;

/// The data type of a field.
///
/// `Unknown` is never emitted by the service: it is synthesized for
/// fields the schema does not (yet) declare, and is also the fallback
/// when a schema payload carries a type tag this client does not know,
/// so forward-incompatible schemas still parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Symbol,
    Text,
    Integer,
    Number,
    Boolean,
    Date,
    Location,
    Link,
    Array,
    Object,
    Unknown,
}

impl FieldType {
    /// Returns the wire tag for this field type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Symbol => "Symbol",
            Self::Text => "Text",
            Self::Integer => "Integer",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Location => "Location",
            Self::Link => "Link",
            Self::Array => "Array",
            Self::Object => "Object",
            Self::Unknown => "Unknown",
        }
    }

    /// Parses a wire tag, degrading unrecognized tags to `Unknown`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Symbol" => Self::Symbol,
            "Text" => Self::Text,
            "Integer" => Self::Integer,
            "Number" => Self::Number,
            "Boolean" => Self::Boolean,
            "Date" => Self::Date,
            "Location" => Self::Location,
            "Link" => Self::Link,
            "Array" => Self::Array,
            "Object" => Self::Object,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        if tag.is_empty() {
            return Err(D::Error::custom("field type tag is empty"));
        }
        Ok(Self::from_tag(&tag))
    }
}

/// Element description for `Array` fields.
///
/// Serializes as `{type, linkType?, validations?}`, the shape nested
/// under a field definition's `items` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItems {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(rename = "linkType", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkTarget>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Value>,
}

/// Describes one schema field of a content type.
///
/// Wire shape: `{id, name, type, linkType?, items?, localized, required,
/// validations}` — optional keys omitted when absent, so cached schemas
/// re-serialize exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Set only when `field_type` is `Link`.
    #[serde(rename = "linkType", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkTarget>,

    /// Set only when `field_type` is `Array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ArrayItems>,

    #[serde(default)]
    pub localized: bool,

    #[serde(default)]
    pub required: bool,

    /// Validation rules, opaque beyond best-effort application during
    /// coercion. Failures are reported as warnings, never fatal.
    #[serde(default)]
    pub validations: Vec<Value>,
}

impl FieldDefinition {
    /// Creates a field definition with the given data type and no
    /// link target, items, flags or validations.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            link_type: None,
            items: None,
            localized: false,
            required: false,
            validations: Vec::new(),
        }
    }

    /// Shorthand for a `Symbol` field.
    #[must_use]
    pub fn symbol(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Symbol)
    }

    /// Shorthand for a `Text` field.
    #[must_use]
    pub fn text(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Text)
    }

    /// Shorthand for an `Integer` field.
    #[must_use]
    pub fn integer(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Integer)
    }

    /// Shorthand for a `Number` field.
    #[must_use]
    pub fn number(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Number)
    }

    /// Shorthand for a `Boolean` field.
    #[must_use]
    pub fn boolean(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Boolean)
    }

    /// Shorthand for a `Date` field.
    #[must_use]
    pub fn date(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Date)
    }

    /// Shorthand for a `Location` field.
    #[must_use]
    pub fn location(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Location)
    }

    /// Shorthand for an `Object` field.
    #[must_use]
    pub fn object(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, FieldType::Object)
    }

    /// Shorthand for a single-link field.
    #[must_use]
    pub fn link(id: impl Into<String>, name: impl Into<String>, target: LinkTarget) -> Self {
        let mut def = Self::new(id, name, FieldType::Link);
        def.link_type = Some(target);
        def
    }

    /// Shorthand for an array-of-links field.
    #[must_use]
    pub fn link_array(id: impl Into<String>, name: impl Into<String>, target: LinkTarget) -> Self {
        let mut def = Self::new(id, name, FieldType::Array);
        def.items = Some(ArrayItems {
            field_type: FieldType::Link,
            link_type: Some(target),
            validations: Vec::new(),
        });
        def
    }

    /// The placeholder definition synthesized for a field the schema
    /// does not declare. Display name mirrors the id.
    #[must_use]
    pub fn unknown(id: impl Into<String>) -> Self {
        let id = id.into();
        let name = id.clone();
        Self::new(id, name, FieldType::Unknown)
    }

    /// Marks the field as localized.
    #[must_use]
    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Adds a validation rule.
    #[must_use]
    pub fn with_validation(mut self, rule: Value) -> Self {
        self.validations.push(rule);
        self
    }

    /// Whether values of this field hold a single link.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.field_type == FieldType::Link
    }

    /// Whether values of this field hold an array of links.
    #[must_use]
    pub fn is_link_array(&self) -> bool {
        self.field_type == FieldType::Array
            && self
                .items
                .as_ref()
                .is_some_and(|items| items.field_type == FieldType::Link)
    }
}
