//! `FolioEngine`: the service object behind every tool call.
//!
//! It owns the document registry, the passage index and the converter.
//! One engine is built per process and shared by reference.

use crate::builder::{DocumentSession, ListItemSpec};
use crate::convert::{Converter, DocumentSource, NativeConverter};
use crate::export::{self, SavedPaths};
use crate::index::{PassageIndex, SearchHit};
use crate::registry::DocumentRegistry;
use crate::tree::DocTree;
use crate::{document_key, overview, resolver};
use folio_common::{FolioError, Result};
use folio_config::Config;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Name given to documents built from a prompt
pub const GENERATED_DOCUMENT_NAME: &str = "Generated Document";

pub struct FolioEngine {
    registry: DocumentRegistry,
    index: Mutex<PassageIndex>,
    converter: Box<dyn Converter>,
    cache_dir: PathBuf,
    text_width: usize,
    top_k: usize,
}

impl FolioEngine {
    pub fn new(config: &Config) -> Self {
        Self::with_converter(config, Box::new(NativeConverter))
    }

    pub fn with_converter(config: &Config, converter: Box<dyn Converter>) -> Self {
        Self {
            registry: DocumentRegistry::new(),
            index: Mutex::new(PassageIndex::new(config.rag.chunk_size)),
            converter,
            cache_dir: config.cache_dir(),
            text_width: config.storage.markdown_text_width,
            top_k: config.rag.top_k,
        }
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registry.contains(key)
    }

    /// Creates an empty document for `prompt`. Returns the key and whether a
    /// new document was created; an existing document is left as it is.
    #[tracing::instrument(skip(self))]
    pub fn create_document(&self, prompt: &str) -> Result<(String, bool)> {
        let key = document_key(prompt.as_bytes());
        if self.registry.contains(&key) {
            tracing::debug!("Document {} already exists", key);
            return Ok((key, false));
        }

        let session = DocumentSession::new(
            DocTree::new(GENERATED_DOCUMENT_NAME),
            format!("prompt: {}", prompt),
        )?;
        match self.registry.create(&key, session) {
            Ok(_) => Ok((key, true)),
            Err(FolioError::AlreadyExists(_)) => Ok((key, false)),
            Err(e) => Err(e),
        }
    }

    /// Converts `source` and registers the result under `key`. The sentinel
    /// records `origin`, the path or URL the caller gave.
    #[tracing::instrument(skip(self, source), fields(source = %source.name))]
    pub fn convert_into(&self, key: &str, source: &DocumentSource, origin: &str) -> Result<()> {
        if self.registry.contains(key) {
            return Err(FolioError::AlreadyExists(
                "Document already exists in the system cache.".to_string(),
            ));
        }
        let tree = self.converter.convert(source)?;
        let session = DocumentSession::new(tree, format!("source: {}", origin))?;
        self.registry.create(key, session)?;
        Ok(())
    }

    pub fn add_title(&self, key: &str, text: &str) -> Result<String> {
        self.registry
            .with_session(key, |s| s.add_title(text))
            .map(|a| a.to_string())
    }

    pub fn add_section_heading(&self, key: &str, text: &str, level: u8) -> Result<String> {
        self.registry
            .with_session(key, |s| s.add_section_heading(text, level))
            .map(|a| a.to_string())
    }

    pub fn add_paragraph(&self, key: &str, text: &str) -> Result<String> {
        self.registry
            .with_session(key, |s| s.add_paragraph(text))
            .map(|a| a.to_string())
    }

    pub fn open_list(&self, key: &str, ordered: bool) -> Result<String> {
        self.registry
            .with_session(key, |s| s.open_list(ordered))
            .map(|a| a.to_string())
    }

    pub fn close_list(&self, key: &str) -> Result<String> {
        self.registry
            .with_session(key, |s| s.close_list())
            .map(|a| a.to_string())
    }

    pub fn add_list_items(&self, key: &str, items: &[ListItemSpec]) -> Result<Vec<String>> {
        self.registry
            .with_session(key, |s| s.add_list_items(items))
            .map(|anchors| anchors.iter().map(ToString::to_string).collect())
    }

    pub fn add_table(
        &self,
        key: &str,
        html_table: &str,
        captions: &[String],
        footnotes: &[String],
    ) -> Result<String> {
        self.registry
            .with_session(key, |s| s.add_table(html_table, captions, footnotes))
            .map(|a| a.to_string())
    }

    /// Depth of the document's build stack
    pub fn stack_depth(&self, key: &str) -> Result<usize> {
        self.registry.with_session(key, |s| Ok(s.stack().depth()))
    }

    pub fn overview(&self, key: &str) -> Result<String> {
        self.registry
            .with_session(key, |s| Ok(overview::render(s.tree())))
    }

    pub fn read_text(&self, key: &str, anchor: &str) -> Result<String> {
        self.registry.with_session(key, |s| {
            let node = resolver::resolve(s.tree(), anchor)?;
            resolver::read_text(node).map(str::to_string)
        })
    }

    pub fn update_text(&self, key: &str, anchor: &str, text: &str) -> Result<()> {
        self.registry
            .with_session(key, |s| resolver::update_text(s.tree_mut(), anchor, text))
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_items(&self, key: &str, anchors: &[String]) -> Result<usize> {
        self.registry
            .with_session(key, |s| resolver::delete(s.tree_mut(), anchors))
    }

    /// Markdown of the whole document, unwrapped
    pub fn export_markdown(&self, key: &str) -> Result<String> {
        self.registry
            .with_session(key, |s| Ok(export::to_markdown(s.tree(), None)))
    }

    pub fn export_json(&self, key: &str) -> Result<String> {
        self.registry.with_session(key, |s| export::to_json(s.tree()))
    }

    /// Writes markdown and JSON to `directory`, or to the cache dir
    pub fn save(&self, key: &str, directory: Option<&Path>) -> Result<SavedPaths> {
        let dir = directory.unwrap_or(self.cache_dir.as_path());
        let width = self.text_width;
        self.registry
            .with_session(key, |s| export::save(s.tree(), dir, key, width))
    }

    /// Adds the document's markdown to the passage index
    pub fn index_document(&self, key: &str) -> Result<usize> {
        let markdown = self.export_markdown(key)?;
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .index_document(key, &markdown)
    }

    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .search(query, self.top_k)
    }

    /// Evicts every document. The passage index is kept.
    pub fn clear(&self) -> usize {
        self.registry.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingConverter;

    impl Converter for FailingConverter {
        fn convert(&self, _source: &DocumentSource) -> Result<DocTree> {
            Err(FolioError::ConversionFailed("engine offline".to_string()))
        }
    }

    fn engine() -> FolioEngine {
        FolioEngine::new(&Config::with_root(Path::new("/tmp/folio-engine-test")))
    }

    #[test]
    fn test_create_is_idempotent() {
        let engine = engine();
        let (key, created) = engine.create_document("hello").unwrap();
        assert!(created);
        engine.add_paragraph(&key, "kept").unwrap();

        let (again, created) = engine.create_document("hello").unwrap();
        assert_eq!(again, key);
        assert!(!created);
        assert_eq!(engine.export_markdown(&key).unwrap(), "kept\n");
    }

    #[test]
    fn test_convert_existing_key_is_rejected() {
        let engine = engine();
        let source = DocumentSource::new("a.md", b"# A".to_vec());
        engine.convert_into("k", &source, "a.md").unwrap();

        let err = engine.convert_into("k", &source, "a.md").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Already exists: Document already exists in the system cache."
        );
    }

    #[test]
    fn test_converted_document_accepts_edits() {
        let engine = engine();
        let source = DocumentSource::new("a.md", b"# A\n\nbody".to_vec());
        engine.convert_into("k", &source, "/data/a.md").unwrap();

        assert_eq!(engine.stack_depth("k").unwrap(), 1);
        engine.add_paragraph("k", "appended").unwrap();
        assert_eq!(engine.export_markdown("k").unwrap(), "# A\n\nbody\n\nappended\n");
        assert!(engine.export_json("k").unwrap().contains("source: /data/a.md"));
    }

    #[test]
    fn test_conversion_failure_registers_nothing() {
        let engine = FolioEngine::with_converter(
            &Config::with_root(Path::new("/tmp")),
            Box::new(FailingConverter),
        );
        let source = DocumentSource::new("a.md", b"# A".to_vec());
        assert!(matches!(
            engine.convert_into("k", &source, "a.md"),
            Err(FolioError::ConversionFailed(_))
        ));
        assert!(!engine.contains("k"));
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.add_title("missing", "x"),
            Err(FolioError::NotFound { .. })
        ));
    }

    #[test]
    fn test_clear_evicts_documents() {
        let engine = engine();
        engine.create_document("a").unwrap();
        engine.create_document("b").unwrap();
        assert_eq!(engine.clear(), 2);
        assert!(engine.registry().is_empty());
    }
}
