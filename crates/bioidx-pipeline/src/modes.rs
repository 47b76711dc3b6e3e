//! Static registry from mode code to gatherer factory and analyzer profile.

use std::path::Path;

use bioidx_core::config::Settings;
use bioidx_core::error::{Error, Result};
use bioidx_core::traits::Gatherer;
use bioidx_gather::mapping;
use bioidx_gather::DelimitedGatherer;
use bioidx_text::AnalyzerProfile;

type GathererFactory = fn(&Path) -> Box<dyn Gatherer>;

#[derive(Clone, Copy)]
pub struct Mode {
    pub code: &'static str,
    pub description: &'static str,
    pub analyzer: AnalyzerProfile,
    factory: GathererFactory,
}

impl Mode {
    /// Builds this mode's gatherer over the configured source directory.
    pub fn gatherer(&self, settings: &Settings) -> Box<dyn Gatherer> {
        (self.factory)(&settings.data.source_path())
    }
}

impl std::fmt::Debug for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mode").field("code", &self.code).field("analyzer", &self.analyzer).finish()
    }
}

fn genes(root: &Path) -> Box<dyn Gatherer> {
    Box::new(DelimitedGatherer::new(root, mapping::GENE))
}

fn proteins(root: &Path) -> Box<dyn Gatherer> {
    Box::new(DelimitedGatherer::new(root, mapping::PROTEIN))
}

fn ontology_terms(root: &Path) -> Box<dyn Gatherer> {
    Box::new(DelimitedGatherer::new(root, mapping::ONTOLOGY))
}

fn taxa(root: &Path) -> Box<dyn Gatherer> {
    Box::new(DelimitedGatherer::new(root, mapping::TAXONOMY))
}

fn cross_references(root: &Path) -> Box<dyn Gatherer> {
    Box::new(DelimitedGatherer::new(root, mapping::XREF))
}

pub const MODES: &[Mode] = &[
    Mode { code: "gene", description: "genes, symbols and descriptions", analyzer: AnalyzerProfile::Standard, factory: genes },
    Mode { code: "protein", description: "protein entries", analyzer: AnalyzerProfile::Standard, factory: proteins },
    Mode { code: "ontology", description: "ontology terms and definitions", analyzer: AnalyzerProfile::Standard, factory: ontology_terms },
    Mode { code: "taxonomy", description: "taxa by scientific name", analyzer: AnalyzerProfile::Standard, factory: taxa },
    Mode { code: "xref", description: "cross-reference accessions", analyzer: AnalyzerProfile::Identifier, factory: cross_references },
];

/// Case-insensitive lookup of a mode code.
pub fn resolve(code: &str) -> Result<&'static Mode> {
    let code = code.trim();
    MODES
        .iter()
        .find(|m| m.code.eq_ignore_ascii_case(code))
        .ok_or_else(|| Error::UnknownMode { code: code.to_string(), expected: codes() })
}

pub fn codes() -> String {
    MODES.iter().map(|m| m.code).collect::<Vec<_>>().join(", ")
}
