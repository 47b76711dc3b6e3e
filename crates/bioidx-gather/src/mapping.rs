//! How a row of an entity export becomes a document.

use bioidx_core::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMapping {
    pub kind: EntityKind,
    /// Directory under the source root holding this entity's exports.
    pub dir: &'static str,
    pub id_column: &'static str,
    pub name_column: &'static str,
    /// `(column, field)` renames; unlisted columns keep their header name.
    pub rename: &'static [(&'static str, &'static str)],
}

impl EntityMapping {
    pub fn field_name<'a>(&self, column: &'a str) -> &'a str {
        for (from, to) in self.rename {
            if *from == column {
                return to;
            }
        }
        column
    }
}

pub const GENE: EntityMapping = EntityMapping {
    kind: EntityKind::Gene,
    dir: "gene",
    id_column: "gene_id",
    name_column: "symbol",
    rename: &[("full_name", "description"), ("tax_id", "taxon"), ("map_location", "location")],
};

pub const PROTEIN: EntityMapping = EntityMapping {
    kind: EntityKind::Protein,
    dir: "protein",
    id_column: "accession",
    name_column: "name",
    rename: &[("organism_id", "taxon"), ("gene_names", "genes")],
};

pub const ONTOLOGY: EntityMapping = EntityMapping {
    kind: EntityKind::OntologyTerm,
    dir: "ontology",
    id_column: "term_id",
    name_column: "term_name",
    rename: &[("term_definition", "definition"), ("term_type", "namespace")],
};

pub const TAXONOMY: EntityMapping = EntityMapping {
    kind: EntityKind::Taxon,
    dir: "taxonomy",
    id_column: "taxon_id",
    name_column: "scientific_name",
    rename: &[("parent_taxon_id", "parent")],
};

pub const XREF: EntityMapping = EntityMapping {
    kind: EntityKind::CrossReference,
    dir: "xref",
    id_column: "xref_id",
    name_column: "accession",
    rename: &[("db_name", "database"), ("object_id", "target")],
};
