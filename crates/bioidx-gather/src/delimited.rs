use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use bioidx_core::traits::{GatherReport, Gatherer};
use bioidx_core::{Document, DocumentProducer};

use crate::mapping::EntityMapping;

/// Gathers one entity from tab-separated exports.
///
/// Every `*.tsv` file under `<source_root>/<mapping.dir>` is one extraction
/// subtask. A failing file is logged and counted; the remaining files still run.
pub struct DelimitedGatherer {
    name: String,
    source_root: PathBuf,
    mapping: EntityMapping,
}

#[derive(Debug, Default)]
struct FileStats {
    emitted: u64,
    skipped: u64,
}

impl DelimitedGatherer {
    pub fn new(source_root: impl Into<PathBuf>, mapping: EntityMapping) -> Self {
        Self { name: format!("{}-tsv", mapping.dir), source_root: source_root.into(), mapping }
    }

    fn entity_dir(&self) -> PathBuf {
        self.source_root.join(self.mapping.dir)
    }

    /// Export files for this entity, sorted. Empty when the directory is missing.
    pub fn list_sources(&self) -> Vec<PathBuf> {
        let root = self.entity_dir();
        if !root.is_dir() {
            tracing::warn!(dir = %root.display(), gatherer = %self.name, "entity directory missing; nothing to gather");
            return vec![];
        }
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("tsv"))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn gather_file(&self, path: &Path, out: &DocumentProducer, stats: &mut FileStats) -> Result<()> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut lines = data_lines(BufReader::new(file));

        let header = match lines.next() {
            Some(line) => line.with_context(|| format!("reading header of {}", path.display()))?.1,
            None => return Ok(()),
        };
        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
        let id_idx = required_column(&columns, self.mapping.id_column, path)?;
        let name_idx = required_column(&columns, self.mapping.name_column, path)?;

        for line in lines {
            let (line_no, line) = line.with_context(|| format!("reading {}", path.display()))?;
            let values: Vec<&str> = line.split('\t').map(str::trim).collect();
            if values.len() != columns.len() {
                tracing::warn!(file = %path.display(), line = line_no, expected = columns.len(), found = values.len(), "column count mismatch; record skipped");
                stats.skipped += 1;
                continue;
            }
            match self.build_document(&columns, &values, id_idx, name_idx) {
                Ok(doc) => {
                    out.emit(doc);
                    stats.emitted += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), line = line_no, error = %e, "record skipped");
                    stats.skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn build_document(&self, columns: &[&str], values: &[&str], id_idx: usize, name_idx: usize) -> Result<Document> {
        if values[name_idx].is_empty() {
            bail!("{} record '{}' has an empty {}", self.mapping.kind, values[id_idx], self.mapping.name_column);
        }
        let mut builder = Document::builder(self.mapping.kind).id(values[id_idx]).name(values[name_idx]);
        for (idx, (column, value)) in columns.iter().zip(values).enumerate() {
            if idx == id_idx || idx == name_idx {
                continue;
            }
            builder = builder.field(self.mapping.field_name(column), *value);
        }
        Ok(builder.build()?)
    }
}

impl Gatherer for DelimitedGatherer {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, out: &DocumentProducer) -> GatherReport {
        let sources = self.list_sources();
        let mut report = GatherReport { subtasks: sources.len(), ..GatherReport::default() };
        tracing::info!(gatherer = %self.name, files = sources.len(), "gathering");

        for path in &sources {
            let mut stats = FileStats::default();
            let result = self.gather_file(path, out, &mut stats);
            report.emitted += stats.emitted;
            report.skipped_records += stats.skipped;
            match result {
                Ok(()) => tracing::info!(file = %path.display(), emitted = stats.emitted, skipped = stats.skipped, "subtask done"),
                Err(e) => {
                    report.failed_subtasks += 1;
                    tracing::error!(file = %path.display(), emitted = stats.emitted, error = %format!("{e:#}"), "subtask failed");
                }
            }
        }
        report
    }
}

/// Non-blank, non-comment lines paired with their 1-based physical line number.
fn data_lines<R: BufRead>(reader: R) -> impl Iterator<Item = std::io::Result<(usize, String)>> {
    reader.lines().enumerate().filter_map(|(idx, line)| match line {
        Ok(line) if is_data_line(&line) => Some(Ok((idx + 1, line))),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    })
}

fn required_column(columns: &[&str], name: &str, path: &Path) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("{} has no '{}' column", path.display(), name))
}

fn is_data_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}
