//! Content types: named, order-preserving field schemas.

use crate::field::FieldDefinition;
use serde_json::{Map, Value, json};
use strata_types::{Error, ResourceType, Result, SystemProperties};

/// A content-type schema.
///
/// Fields keep their insertion order (the schema's default display
/// order). Lookup is by field id; later duplicates overwrite earlier
/// ones in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentType {
    pub name: String,
    pub description: Option<String>,
    display_field: Option<String>,
    pub sys: SystemProperties,
    fields: Vec<FieldDefinition>,
}

impl ContentType {
    /// Creates a content type with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>, sys: SystemProperties) -> Self {
        Self {
            name: name.into(),
            description: None,
            display_field: None,
            sys,
            fields: Vec::new(),
        }
    }

    /// Returns the field definition for `id`, or `None` if the schema
    /// does not declare it. Never fails.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// All fields in schema order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// The configured display-field id, if any.
    #[must_use]
    pub fn display_field_id(&self) -> Option<&str> {
        self.display_field.as_deref()
    }

    /// Resolves the configured display field through [`Self::field`].
    /// `None` when no display field is configured.
    #[must_use]
    pub fn display_field(&self) -> Option<&FieldDefinition> {
        self.display_field.as_deref().and_then(|id| self.field(id))
    }

    /// Sets the display-field id. Synthesizes an `Unknown` placeholder
    /// when the schema does not declare the referenced field, so a
    /// dangling reference degrades instead of breaking the invariant
    /// that a configured display field always resolves.
    pub fn set_display_field(&mut self, id: Option<String>) {
        if let Some(id) = &id
            && self.field(id).is_none()
        {
            self.add_unknown_field(id.clone());
        }
        self.display_field = id;
    }

    /// Inserts a field, overwriting any earlier definition with the same
    /// id in place (position retained).
    pub fn upsert_field(&mut self, def: FieldDefinition) {
        match self.fields.iter_mut().find(|f| f.id == def.id) {
            Some(existing) => *existing = def,
            None => self.fields.push(def),
        }
    }

    /// Synthesizes and registers an `Unknown`-typed field definition
    /// under `id`, returning it.
    ///
    /// Used by the resolver when a value arrives for a field id the
    /// schema does not (yet) declare, so unexpected-but-present data is
    /// preserved rather than dropped. Idempotent: an existing definition
    /// with that id is returned untouched.
    pub fn add_unknown_field(&mut self, id: impl Into<String>) -> &FieldDefinition {
        let id = id.into();
        if let Some(pos) = self.fields.iter().position(|f| f.id == id) {
            return &self.fields[pos];
        }
        self.fields.push(FieldDefinition::unknown(id));
        self.fields.last().expect("just pushed")
    }

    /// Parses a raw `ContentType` resource document.
    pub fn from_raw(raw: &Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::malformed("content type payload is not a JSON object"))?;

        let sys = SystemProperties::from_raw(
            obj.get("sys")
                .ok_or_else(|| Error::malformed("content type has no sys block"))?,
        )?;
        if sys.resource_type != ResourceType::ContentType {
            return Err(Error::malformed(format!(
                "expected sys.type ContentType, got {}",
                sys.resource_type
            )));
        }

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::malformed("content type name missing or not a string"))?
            .to_string();

        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut content_type = Self {
            name,
            description,
            display_field: None,
            sys,
            fields: Vec::new(),
        };

        if let Some(raw_fields) = obj.get("fields") {
            let raw_fields = raw_fields
                .as_array()
                .ok_or_else(|| Error::malformed("content type fields is not an array"))?;
            for raw_field in raw_fields {
                let def: FieldDefinition = serde_json::from_value(raw_field.clone())
                    .map_err(|e| Error::malformed(format!("invalid field definition: {e}")))?;
                content_type.upsert_field(def);
            }
        }

        let display_field = obj
            .get("displayField")
            .and_then(Value::as_str)
            .map(str::to_string);
        content_type.set_display_field(display_field);

        Ok(content_type)
    }

    /// Serializes to the wire shape
    /// `{name, description?, displayField?, sys, fields: [...]}` with
    /// fields as an order-preserving sequence and optional keys omitted
    /// when unset, matching the original API so the schema can be cached
    /// and re-hydrated without loss.
    pub fn to_raw(&self) -> Result<Value> {
        let fields = self
            .fields
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut obj = Map::new();
        obj.insert("name".into(), json!(self.name));
        if let Some(description) = &self.description {
            obj.insert("description".into(), json!(description));
        }
        if let Some(display_field) = &self.display_field {
            obj.insert("displayField".into(), json!(display_field));
        }
        obj.insert("sys".into(), self.sys.to_raw()?);
        obj.insert("fields".into(), Value::Array(fields));
        Ok(Value::Object(obj))
    }
}
