use std::fs;
use std::path::Path;

use bioidx_core::config::Settings;
use bioidx_core::error::Error;
use tantivy::collector::Count;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, Term};

fn settings_for(source: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.data.source_dir = source.to_string_lossy().to_string();
    settings.pipeline.workers = 3;
    settings.pipeline.queue_cap = 8;
    settings.pipeline.backoff_max_ms = 16;
    settings.writer.heap_size_bytes = 20_000_000;
    settings.writer.max_buffered_docs = 64;
    settings.writer.threads = 1;
    settings
}

fn write_genes(root: &Path, files: usize, rows_per_file: usize) {
    let dir = root.join("gene");
    fs::create_dir_all(&dir).unwrap();
    for f in 0..files {
        let mut body = String::from("gene_id\tsymbol\tfull_name\ttax_id\n");
        for r in 0..rows_per_file {
            body.push_str(&format!("{f}{r:04}\tSYM{f}_{r}\tsynthetic gene {r}\t9606\n"));
        }
        fs::write(dir.join(format!("part-{f}.tsv")), body).unwrap();
    }
}

#[test]
fn gene_mode_indexes_every_row() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_genes(data.path(), 3, 100);
    let index_dir = out.path().join("gene-index");

    let summary = bioidx_pipeline::run(&index_dir, "gene", &settings_for(data.path())).expect("run");
    assert_eq!(summary.mode, "gene");
    assert_eq!(summary.gather.subtasks, 3);
    assert_eq!(summary.gather.emitted, 300);
    assert_eq!(summary.documents_indexed, 300);

    let index = Index::open_in_dir(&index_dir).expect("open");
    assert_eq!(index.reader().unwrap().searcher().num_docs(), 300);
    assert_eq!(index.searchable_segment_ids().unwrap().len(), 1);
}

#[test]
fn xref_mode_uses_identifier_analysis() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let dir = data.path().join("xref");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("xrefs.tsv"), "xref_id\taccession\tdb_name\nx1\tGO:0008150\tGO\nx2\tUniProtKB:P04637\tUniProt\n").unwrap();
    let index_dir = out.path().join("xref-index");

    let summary = bioidx_pipeline::run(&index_dir, "XREF", &settings_for(data.path())).expect("run");
    assert_eq!(summary.documents_indexed, 2);

    let index = Index::open_in_dir(&index_dir).unwrap();
    let name = index.schema().get_field("name").unwrap();
    let searcher = index.reader().unwrap().searcher();
    let q = TermQuery::new(Term::from_field_text(name, "uniprotkb:p04637"), IndexRecordOption::Basic);
    assert_eq!(searcher.search(&q, &Count).unwrap(), 1);
}

#[test]
fn missing_source_directory_produces_an_empty_index() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let index_dir = out.path().join("empty");
    let summary = bioidx_pipeline::run(&index_dir, "taxonomy", &settings_for(data.path())).expect("run");
    assert_eq!(summary.gather.subtasks, 0);
    assert_eq!(summary.documents_indexed, 0);
    assert_eq!(Index::open_in_dir(&index_dir).unwrap().reader().unwrap().searcher().num_docs(), 0);
}

#[test]
fn unknown_mode_fails_before_touching_the_output() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let index_dir = out.path().join("never");
    let err = bioidx_pipeline::run(&index_dir, "metabolite", &settings_for(data.path())).unwrap_err();
    assert!(matches!(err, Error::UnknownMode { .. }));
    assert!(!index_dir.exists());
}
