use serde::{Deserialize, Serialize};
use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

pub const STANDARD_TOKENIZER: &str = "bio_standard";
pub const IDENTIFIER_TOKENIZER: &str = "bio_identifier";

/// Text analysis applied to the `name` and `text` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerProfile {
    /// Word tokens, lowercased, English stop-words removed.
    Standard,
    /// Whitespace-delimited tokens kept intact apart from case, for accessions
    /// and other identifiers containing punctuation.
    Identifier,
}

impl AnalyzerProfile {
    pub fn tokenizer_name(&self) -> &'static str {
        match self {
            AnalyzerProfile::Standard => STANDARD_TOKENIZER,
            AnalyzerProfile::Identifier => IDENTIFIER_TOKENIZER,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DocFields {
    pub id: Field,
    pub kind: Field,
    pub name: Field,
    pub text: Field,
    pub fields: Field,
}

impl DocFields {
    pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field("id")?,
            kind: schema.get_field("kind")?,
            name: schema.get_field("name")?,
            text: schema.get_field("text")?,
            fields: schema.get_field("fields")?,
        })
    }
}

pub fn build_schema(profile: AnalyzerProfile) -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	schema_builder.add_text_field("kind", STRING | STORED);
	let indexing = TextFieldIndexing::default().set_tokenizer(profile.tokenizer_name()).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	schema_builder.add_text_field("name", TextOptions::default().set_indexing_options(indexing.clone()).set_stored());
	schema_builder.add_text_field("text", TextOptions::default().set_indexing_options(indexing));
	schema_builder.add_text_field("fields", STORED);
	schema_builder.build()
}

pub fn register_tokenizers(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","in","is","it","its","of","on","that","the","to","was","will","with","or","not","this","these","which",
	];
	let standard = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(64))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(STANDARD_TOKENIZER, standard);

	let identifier = TextAnalyzer::builder(WhitespaceTokenizer::default())
		.filter(RemoveLongFilter::limit(128))
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(IDENTIFIER_TOKENIZER, identifier);
}
