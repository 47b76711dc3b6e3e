use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tantivy::indexer::{LogMergePolicy, NoMergePolicy};
use tantivy::{doc, Index, IndexWriter, TantivyDocument};

use bioidx_core::config::WriterSettings;
use bioidx_core::error::Error;
use bioidx_core::traits::IndexSink;
use bioidx_core::types::Document;

use crate::tantivy_utils::{build_schema, register_tokenizers, AnalyzerProfile, DocFields};

/// Tantivy-backed [`IndexSink`].
///
/// Workers add through a shared read lock; commits (every `max_buffered_docs`
/// additions, on optimize and on close) take the write lock. The slot is empty
/// only while `optimize` swaps the writer.
pub struct TantivySink {
	index: Index,
	fields: DocFields,
	writer: RwLock<Option<IndexWriter>>,
	settings: WriterSettings,
	index_dir: PathBuf,
	pending: AtomicUsize,
	added: AtomicU64,
	max_buffered_docs: usize,
}

impl TantivySink {
	/// Creates a fresh index at `index_dir`, replacing whatever was there.
	pub fn create(index_dir: &Path, profile: AnalyzerProfile, settings: &WriterSettings) -> Result<Self> {
		let schema = build_schema(profile);
		if index_dir.exists() { std::fs::remove_dir_all(index_dir).with_context(|| format!("removing old index at {}", index_dir.display()))?; }
		std::fs::create_dir_all(index_dir).with_context(|| format!("creating {}", index_dir.display()))?;
		let index = Index::create_in_dir(index_dir, schema.clone())?;
		register_tokenizers(&index);
		let fields = DocFields::from_schema(&schema)?;

		let writer = open_writer(&index, settings)?;
		let mut merge_policy = LogMergePolicy::default();
		merge_policy.set_min_num_segments(settings.merge_factor.max(2));
		writer.set_merge_policy(Box::new(merge_policy));

		tracing::info!(dir = %index_dir.display(), ?profile, heap = settings.heap_size_bytes, merge_factor = settings.merge_factor, "created index");
		Ok(Self {
			index,
			fields,
			writer: RwLock::new(Some(writer)),
			settings: settings.clone(),
			index_dir: index_dir.to_path_buf(),
			pending: AtomicUsize::new(0),
			added: AtomicU64::new(0),
			max_buffered_docs: settings.max_buffered_docs.max(1),
		})
	}

	pub fn added(&self) -> u64 {
		self.added.load(Ordering::Relaxed)
	}

	fn to_tantivy(&self, d: &Document) -> Result<TantivyDocument> {
		let attributes = serde_json::to_string(d.fields())?;
		Ok(doc!(
			self.fields.id => d.id().to_string(),
			self.fields.kind => d.kind().as_str().to_string(),
			self.fields.name => d.name().to_string(),
			self.fields.text => d.searchable_text(),
			self.fields.fields => attributes,
		))
	}

	fn commit(&self) -> Result<()> {
		let mut slot = self.writer.write();
		let writer = slot.as_mut().ok_or_else(|| Error::Index("writer unavailable".into()))?;
		let pending = self.pending.swap(0, Ordering::AcqRel);
		if pending > 0 {
			writer.commit()?;
			tracing::debug!(pending, "committed buffered documents");
		}
		Ok(())
	}
}

fn open_writer(index: &Index, settings: &WriterSettings) -> tantivy::Result<IndexWriter> {
	if settings.threads > 0 {
		index.writer_with_num_threads(settings.threads, settings.heap_size_bytes)
	} else {
		index.writer(settings.heap_size_bytes)
	}
}

impl IndexSink for TantivySink {
	fn add(&self, d: Document) -> Result<()> {
		let tdoc = self.to_tantivy(&d)?;
		{
			let slot = self.writer.read();
			let writer = slot.as_ref().ok_or_else(|| Error::Index("writer unavailable".into()))?;
			writer.add_document(tdoc)?;
		}
		self.added.fetch_add(1, Ordering::Relaxed);
		if self.pending.fetch_add(1, Ordering::AcqRel) + 1 >= self.max_buffered_docs {
			self.commit()?;
		}
		Ok(())
	}

	/// Commits, lets background merges finish, then merges every segment into one.
	fn optimize(&self) -> Result<()> {
		let mut slot = self.writer.write();
		let mut writer = slot.take().ok_or_else(|| Error::Index("writer unavailable".into()))?;
		writer.commit()?;
		self.pending.store(0, Ordering::Release);
		writer.wait_merging_threads()?;

		let mut writer = open_writer(&self.index, &self.settings)?;
		writer.set_merge_policy(Box::new(NoMergePolicy));
		let segments = self.index.searchable_segment_ids()?;
		if segments.len() > 1 {
			tracing::info!(segments = segments.len(), "merging segments");
			writer.merge(&segments).wait()?;
		}
		*slot = Some(writer);
		Ok(())
	}

	fn close(self) -> Result<()> {
		let mut writer = self.writer.into_inner().ok_or_else(|| Error::Index("writer unavailable".into()))?;
		writer.commit()?;
		writer.wait_merging_threads()?;
		tracing::info!(dir = %self.index_dir.display(), documents = self.added.load(Ordering::Relaxed), "index closed");
		Ok(())
	}
}
