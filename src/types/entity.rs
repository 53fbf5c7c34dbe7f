use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Context key naming the scraped organization.
pub const ORGANIZATION: &str = "organization";
/// Context key naming the repository an item was fetched for.
pub const REPOSITORY: &str = "repository";
/// Context key naming the user an item was fetched for.
pub const USER: &str = "user";

/// Key/value fields attached to every item a request produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    fields: BTreeMap<String, String>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Shorthand for an organization-only context.
    pub fn organization(org: impl Into<String>) -> Self {
        Self::new().with(ORGANIZATION, org)
    }

    /// Gets a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Iterates over the fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Describes the context for progress messages, e.g. `organization=acme user=alice`.
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A value read from an entity, either a tag or a source field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    /// Value attached by tagging.
    Tag(&'a str),
    /// Value returned by the API.
    Source(&'a Value),
}

/// One JSON object returned by the API plus the tags attached to it.
///
/// Source fields are never modified. Tags live beside them and shadow a
/// source field of the same name when read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    fields: Map<String, Value>,
    tags: BTreeMap<String, String>,
}

impl Entity {
    /// Wraps a JSON object. Returns `None` for any other JSON value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self {
                fields,
                tags: BTreeMap::new(),
            }),
            _ => None,
        }
    }

    /// Looks a key up, tags first.
    pub fn get(&self, key: &str) -> Option<FieldRef<'_>> {
        if let Some(tag) = self.tags.get(key) {
            return Some(FieldRef::Tag(tag));
        }
        self.fields.get(key).map(FieldRef::Source)
    }

    /// Looks a key up and returns it only if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            FieldRef::Tag(tag) => Some(tag),
            FieldRef::Source(value) => value.as_str(),
        }
    }

    /// Returns the untouched source field.
    pub fn source(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the tag for a key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Sets a tag. Source fields are left as they are.
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Decodes the source fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}
