//! Conversion of source files into document trees
//!
//! The `Converter` trait is the seam to a conversion engine. `NativeConverter`
//! handles the text formats Folio can read on its own: HTML, Markdown and
//! Folio's own JSON dumps.

pub mod html;
pub mod markdown;

use crate::export;
use crate::tree::DocTree;
use folio_common::{FolioError, Result};
use std::path::Path;

/// Raw input handed to a converter
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// File name or URL, used for format detection and the document name
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DocumentSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads a local file
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            FolioError::ConversionFailed(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(Self::new(path.to_string_lossy(), bytes))
    }

    /// File stem of the source name, without query string or directories
    pub fn stem(&self) -> String {
        let name = self.name.split(['?', '#']).next().unwrap_or(&self.name);
        let file = name.rsplit(['/', '\\']).find(|s| !s.is_empty()).unwrap_or(name);
        match file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Html,
    Markdown,
    Json,
    Pdf,
}

impl InputFormat {
    /// Detects the format from the extension of the source name, then from
    /// the first bytes of the payload
    pub fn detect(source: &DocumentSource) -> Option<Self> {
        let name = source.name.split(['?', '#']).next().unwrap_or(&source.name);
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.contains('/'));

        match extension.as_deref() {
            Some("html" | "htm" | "xhtml") => return Some(InputFormat::Html),
            Some("md" | "markdown") => return Some(InputFormat::Markdown),
            Some("json") => return Some(InputFormat::Json),
            Some("pdf") => return Some(InputFormat::Pdf),
            _ => {}
        }

        if source.bytes.starts_with(b"%PDF") {
            return Some(InputFormat::Pdf);
        }
        let head = String::from_utf8_lossy(&source.bytes[..source.bytes.len().min(512)]);
        match head.trim_start().chars().next() {
            Some('<') => Some(InputFormat::Html),
            Some('{') => Some(InputFormat::Json),
            Some(_) => Some(InputFormat::Markdown),
            None => None,
        }
    }
}

/// Turns a source into a document tree
pub trait Converter: Send + Sync {
    fn convert(&self, source: &DocumentSource) -> Result<DocTree>;
}

fn utf8(source: &DocumentSource) -> Result<&str> {
    std::str::from_utf8(&source.bytes)
        .map_err(|e| FolioError::ConversionFailed(format!("source is not UTF-8: {}", e)))
}

/// Built-in converter for HTML, Markdown and JSON dumps
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeConverter;

impl Converter for NativeConverter {
    #[tracing::instrument(skip_all, fields(bytes = source.bytes.len()))]
    fn convert(&self, source: &DocumentSource) -> Result<DocTree> {
        let format = InputFormat::detect(source)
            .ok_or_else(|| FolioError::ConversionFailed("source is empty".to_string()))?;
        tracing::debug!(?format, "Converting source");

        let tree = match format {
            InputFormat::Pdf => {
                return Err(FolioError::ConversionFailed(
                    "PDF input needs an external conversion engine".to_string(),
                ))
            }
            InputFormat::Json => export::from_json(utf8(source)?).map_err(|e| {
                FolioError::ConversionFailed(format!("invalid document JSON: {}", e))
            })?,
            InputFormat::Html => {
                let mut tree = DocTree::new(source.stem());
                html::build_tree(&mut tree, &html::parse_fragment(utf8(source)?))?;
                tree
            }
            InputFormat::Markdown => {
                let mut tree = DocTree::new(source.stem());
                markdown::build_tree(&mut tree, utf8(source)?)?;
                tree
            }
        };

        if tree.is_empty() {
            return Err(FolioError::ConversionFailed(format!(
                "no content found in {}",
                source.name
            )));
        }
        Ok(tree)
    }
}
