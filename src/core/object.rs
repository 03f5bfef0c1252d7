use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Namespace carried by `has_model` values, e.g. `info:fedora/afmodel:Item`.
pub const MODEL_URI_PREFIX: &str = "info:fedora/afmodel:";

/// Builds the `has_model` value asserted for a model name.
pub fn model_uri(name: &str) -> String {
    format!("{}{}", MODEL_URI_PREFIX, name)
}

/// Extracts the model name from a `has_model` value.
///
/// Values outside the model namespace are returned unchanged.
pub fn model_name(value: &str) -> &str {
    value.strip_prefix(MODEL_URI_PREFIX).unwrap_or(value)
}

/// Stable identity of an object in the repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of relationship asserted by an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationKind {
    #[default]
    HasModel,
    IsMemberOf,
    IsPartOf,
    Other(String),
}

impl RelationKind {
    pub fn as_str(&self) -> &str {
        match self {
            RelationKind::HasModel => "has_model",
            RelationKind::IsMemberOf => "is_member_of",
            RelationKind::IsPartOf => "is_part_of",
            RelationKind::Other(name) => name,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RelationKind {
    fn from(name: &str) -> Self {
        match name {
            "has_model" => RelationKind::HasModel,
            "is_member_of" => RelationKind::IsMemberOf,
            "is_part_of" => RelationKind::IsPartOf,
            other => RelationKind::Other(other.to_string()),
        }
    }
}

impl From<String> for RelationKind {
    fn from(name: String) -> Self {
        RelationKind::from(name.as_str())
    }
}

impl From<RelationKind> for String {
    fn from(kind: RelationKind) -> Self {
        kind.as_str().to_string()
    }
}

/// An object persisted in the repository together with its relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryObject {
    pub id: ObjectId,
    #[serde(default)]
    pub relationships: BTreeMap<RelationKind, BTreeSet<String>>,
}

impl RepositoryObject {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            relationships: BTreeMap::new(),
        }
    }

    /// Adds a relationship value, builder style.
    pub fn with_relation(mut self, kind: RelationKind, value: impl Into<String>) -> Self {
        self.add_relation(kind, value);
        self
    }

    /// Asserts `has_model` for the given model name.
    pub fn with_model(self, name: &str) -> Self {
        self.with_relation(RelationKind::HasModel, model_uri(name))
    }

    pub fn add_relation(&mut self, kind: RelationKind, value: impl Into<String>) {
        self.relationships.entry(kind).or_default().insert(value.into());
    }

    /// Raw values asserted for one relationship kind.
    pub fn relations(&self, kind: &RelationKind) -> impl Iterator<Item = &str> {
        self.relationships
            .get(kind)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    /// Tags for a relationship kind, with model URIs reduced to model names.
    pub fn tags(&self, kind: &RelationKind) -> BTreeSet<String> {
        self.relations(kind).map(|v| model_name(v).to_string()).collect()
    }
}
