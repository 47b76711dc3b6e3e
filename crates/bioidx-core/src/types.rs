//! Domain types moved through the indexing pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub type DocId = String;
pub type Fields = BTreeMap<String, String>;

/// The biological entity a document describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Gene,
    Protein,
    OntologyTerm,
    Taxon,
    CrossReference,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Gene => "gene",
            EntityKind::Protein => "protein",
            EntityKind::OntologyTerm => "ontology_term",
            EntityKind::Taxon => "taxon",
            EntityKind::CrossReference => "cross_reference",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of searchable content.
///
/// - `id`: stable identifier of the source record (accession, term id, ...)
/// - `kind`: entity type tag
/// - `name`: display text
/// - `fields`: remaining attributes, keyed by document field name
///
/// Immutable once built; the pipeline only moves ownership from a producer to a
/// consumer and never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: DocId,
    kind: EntityKind,
    name: String,
    fields: Fields,
}

impl Document {
    pub fn builder(kind: EntityKind) -> DocumentBuilder {
        DocumentBuilder::new(kind)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Display text followed by every attribute value, for full-text indexing.
    pub fn searchable_text(&self) -> String {
        let mut text = self.name.clone();
        for value in self.fields.values() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(value);
        }
        text
    }
}

/// Maps flat key/value attributes onto a [`Document`].
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    id: DocId,
    kind: EntityKind,
    name: String,
    fields: Fields,
}

impl DocumentBuilder {
    pub fn new(kind: EntityKind) -> Self {
        Self { id: String::new(), kind, name: String::new(), fields: Fields::new() }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an attribute. Empty values are dropped; a repeated key keeps the last value.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.insert(key.into(), value);
        }
        self
    }

    pub fn build(self) -> Result<Document> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(Error::InvalidDocument(format!("{} record without an id", self.kind)));
        }
        Ok(Document { id, kind: self.kind, name: self.name, fields: self.fields })
    }
}
