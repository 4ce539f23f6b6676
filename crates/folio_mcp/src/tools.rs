//! Tool definitions and handlers
//!
//! Each tool takes a typed argument struct; its JSON schema for `tools/list`
//! is generated from the same struct.

use crate::sources;
use crate::McpServer;
use folio_common::sanitizer::LogSanitizer;
use folio_common::{FolioError, Result};
use folio_core::{document_key, DocumentSource, ListItemSpec, SearchHit};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tools that need `[rag] enabled = true`
const RAG_TOOLS: [&str; 2] = ["export_document_to_vector_db", "search_documents"];

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateDocumentArgs {
    /// Prompt the document is generated for; its hash becomes the document key
    pub prompt: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CacheKeyArgs {
    pub cache_key: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertSourceArgs {
    /// Local path or http(s) URL
    pub source: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Attachment {
    /// File name, used to detect the format
    #[serde(default)]
    pub name: Option<String>,
    pub data_base64: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AttachmentsArgs {
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DocumentKeyArgs {
    pub document_key: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SaveArgs {
    pub document_key: String,
    /// Target directory; the configured cache directory when omitted
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TitleArgs {
    pub document_key: String,
    pub title: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SectionHeadingArgs {
    pub document_key: String,
    pub section_heading: String,
    /// 1 for a top-level section, up to 6
    pub section_level: u8,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ParagraphArgs {
    pub document_key: String,
    pub paragraph: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OpenListArgs {
    pub document_key: String,
    /// Numbered list instead of bullets
    #[serde(default)]
    pub ordered: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListItemArg {
    pub list_item_text: String,
    /// Marker such as `-` or `1.`
    pub list_marker_text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListItemsArgs {
    pub document_key: String,
    pub list_items: Vec<ListItemArg>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TableArgs {
    pub document_key: String,
    /// HTML markup holding a `<table>`; only the first table is used
    pub html_table: String,
    #[serde(default)]
    pub table_captions: Option<Vec<String>>,
    #[serde(default)]
    pub table_footnotes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnchorArgs {
    pub document_key: String,
    /// Anchor such as `#/texts/2`
    pub document_anchor: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTextArgs {
    pub document_key: String,
    pub document_anchor: String,
    pub updated_text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteArgs {
    pub document_key: String,
    pub document_anchors: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchArgs {
    pub query: String,
}

/// Entry of the `tools/list` result
#[derive(Debug, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
}

fn tool<T: JsonSchema>(name: &'static str, description: &'static str) -> ToolDefinition {
    ToolDefinition {
        name,
        description,
        input_schema: schema::<T>(),
    }
}

pub fn definitions(rag_enabled: bool) -> Vec<ToolDefinition> {
    let mut tools = vec![
        tool::<CreateDocumentArgs>(
            "create_new_document",
            "Create an empty document for a prompt and return its document key",
        ),
        tool::<CacheKeyArgs>(
            "is_document_in_local_cache",
            "Check whether a document key is in the local cache",
        ),
        tool::<ConvertSourceArgs>(
            "convert_document_from_source",
            "Convert a document from a local path or URL into the local cache",
        ),
        tool::<AttachmentsArgs>(
            "convert_attachments_into_document",
            "Convert base64 attachments into cached documents",
        ),
        tool::<DocumentKeyArgs>(
            "export_document_to_markdown",
            "Export a cached document to markdown",
        ),
        tool::<SaveArgs>(
            "save_document",
            "Save a cached document as markdown and JSON files",
        ),
        tool::<TitleArgs>("add_title_to_document", "Add a title to a document"),
        tool::<SectionHeadingArgs>(
            "add_section_heading_to_document",
            "Add a section heading of level 1 to 6 to a document",
        ),
        tool::<ParagraphArgs>("add_paragraph_to_document", "Add a paragraph to a document"),
        tool::<OpenListArgs>("open_list_in_document", "Open a new list in a document"),
        tool::<DocumentKeyArgs>(
            "close_list_in_document",
            "Close the innermost open list of a document",
        ),
        tool::<ListItemsArgs>(
            "add_list_items_to_list_in_document",
            "Add items to the open list of a document",
        ),
        tool::<TableArgs>(
            "add_table_in_html_format_to_document",
            "Add a table given as HTML, with optional captions and footnotes",
        ),
        tool::<DocumentKeyArgs>(
            "get_overview_of_document_anchors",
            "List the items of a document with their anchors",
        ),
        tool::<AnchorArgs>(
            "get_text_of_document_item_at_anchor",
            "Read the text of the item at an anchor",
        ),
        tool::<UpdateTextArgs>(
            "update_text_of_document_item_at_anchor",
            "Replace the text of the item at an anchor",
        ),
        tool::<DeleteArgs>(
            "delete_document_items_at_anchors",
            "Delete the items at the given anchors, all or none",
        ),
    ];

    if rag_enabled {
        tools.push(tool::<DocumentKeyArgs>(
            "export_document_to_vector_db",
            "Add a cached document to the passage index",
        ));
        tools.push(tool::<SearchArgs>(
            "search_documents",
            "Search indexed documents for passages matching a query",
        ));
    }
    tools
}

pub fn is_available(name: &str, rag_enabled: bool) -> bool {
    if RAG_TOOLS.contains(&name) {
        return rag_enabled;
    }
    definitions(false).iter().any(|t| t.name == name)
}

fn parse<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| FolioError::ValidationError(format!("Invalid params: {}", e)))
}

/// Runs tool `name`. Callers check [`is_available`] first.
#[tracing::instrument(skip(server, arguments))]
pub async fn call(server: &McpServer, name: &str, arguments: Value) -> Result<String> {
    let engine = server.engine();

    match name {
        "create_new_document" => {
            let args: CreateDocumentArgs = parse(arguments)?;
            let (key, created) = engine.create_document(&args.prompt)?;
            let mut text = format!("document-key: {} for prompt:`{}`", key, args.prompt);
            if !created {
                text.push_str(" (already in the cache, left unchanged)");
            }
            Ok(text)
        }
        "is_document_in_local_cache" => {
            let args: CacheKeyArgs = parse(arguments)?;
            Ok(engine.contains(&args.cache_key).to_string())
        }
        "convert_document_from_source" => {
            let args: ConvertSourceArgs = parse(arguments)?;
            convert_source(server, &args.source).await
        }
        "convert_attachments_into_document" => {
            let args: AttachmentsArgs = parse(arguments)?;
            let results: Vec<Value> = args
                .attachments
                .iter()
                .map(|attachment| convert_attachment(server, attachment))
                .collect();
            Ok(serde_json::to_string_pretty(&results)?)
        }
        "export_document_to_markdown" => {
            let args: DocumentKeyArgs = parse(arguments)?;
            let markdown = engine.export_markdown(&args.document_key)?;
            Ok(format!(
                "Markdown export for document with key: {}\n\n{}\n\n",
                args.document_key, markdown
            ))
        }
        "save_document" => {
            let args: SaveArgs = parse(arguments)?;
            let directory = args.directory.map(|d| server.config().root.join(d));
            let paths = engine.save(&args.document_key, directory.as_deref())?;
            Ok(format!(
                "document saved at {} and {}",
                paths.markdown.display(),
                paths.json.display()
            ))
        }
        "add_title_to_document" => {
            let args: TitleArgs = parse(arguments)?;
            let anchor = engine.add_title(&args.document_key, &args.title)?;
            Ok(format!(
                "added title at {} for document with key: {}",
                anchor, args.document_key
            ))
        }
        "add_section_heading_to_document" => {
            let args: SectionHeadingArgs = parse(arguments)?;
            let anchor = engine.add_section_heading(
                &args.document_key,
                &args.section_heading,
                args.section_level,
            )?;
            Ok(format!(
                "added section-heading of level {} at {} for document with key: {}",
                args.section_level, anchor, args.document_key
            ))
        }
        "add_paragraph_to_document" => {
            let args: ParagraphArgs = parse(arguments)?;
            let anchor = engine.add_paragraph(&args.document_key, &args.paragraph)?;
            Ok(format!(
                "added paragraph at {} for document with key: {}",
                anchor, args.document_key
            ))
        }
        "open_list_in_document" => {
            let args: OpenListArgs = parse(arguments)?;
            let anchor = engine.open_list(&args.document_key, args.ordered)?;
            Ok(format!(
                "opened a new list at {} for document with key: {}",
                anchor, args.document_key
            ))
        }
        "close_list_in_document" => {
            let args: DocumentKeyArgs = parse(arguments)?;
            engine.close_list(&args.document_key)?;
            Ok(format!("closed list for document with key: {}", args.document_key))
        }
        "add_list_items_to_list_in_document" => {
            let args: ListItemsArgs = parse(arguments)?;
            let items: Vec<ListItemSpec> = args
                .list_items
                .into_iter()
                .map(|item| ListItemSpec::new(item.list_item_text, item.list_marker_text))
                .collect();
            let anchors = engine.add_list_items(&args.document_key, &items)?;
            Ok(format!(
                "added {} list_items to list in document with key: {}",
                anchors.len(),
                args.document_key
            ))
        }
        "add_table_in_html_format_to_document" => {
            let args: TableArgs = parse(arguments)?;
            let anchor = engine.add_table(
                &args.document_key,
                &args.html_table,
                &args.table_captions.unwrap_or_default(),
                &args.table_footnotes.unwrap_or_default(),
            )?;
            Ok(format!(
                "Added table at {} to a document with key: {}",
                anchor, args.document_key
            ))
        }
        "get_overview_of_document_anchors" => {
            let args: DocumentKeyArgs = parse(arguments)?;
            engine.overview(&args.document_key)
        }
        "get_text_of_document_item_at_anchor" => {
            let args: AnchorArgs = parse(arguments)?;
            let text = engine.read_text(&args.document_key, &args.document_anchor)?;
            Ok(format!(
                "The text of {} for document-key with {} is:\n\n```{}```\n\n",
                args.document_anchor, args.document_key, text
            ))
        }
        "update_text_of_document_item_at_anchor" => {
            let args: UpdateTextArgs = parse(arguments)?;
            engine.update_text(&args.document_key, &args.document_anchor, &args.updated_text)?;
            Ok(format!(
                "Updated the text at {} for document with key {}",
                args.document_anchor, args.document_key
            ))
        }
        "delete_document_items_at_anchors" => {
            let args: DeleteArgs = parse(arguments)?;
            let removed = engine.delete_items(&args.document_key, &args.document_anchors)?;
            Ok(format!(
                "Deleted the {:?} ({} items) for document with key {}",
                args.document_anchors, removed, args.document_key
            ))
        }
        "export_document_to_vector_db" => {
            let args: DocumentKeyArgs = parse(arguments)?;
            let passages = engine.index_document(&args.document_key)?;
            Ok(format!(
                "Indexed {} passages of document with key {}",
                passages, args.document_key
            ))
        }
        "search_documents" => {
            let args: SearchArgs = parse(arguments)?;
            Ok(format_hits(&engine.search(&args.query)?))
        }
        other => Err(FolioError::ValidationError(format!("Unknown tool: {}", other))),
    }
}

async fn convert_source(server: &McpServer, raw_source: &str) -> Result<String> {
    let source = sources::clean_source(raw_source);
    let logged = LogSanitizer::new().sanitize(source);
    tracing::info!("Processing document from source: {}", logged);

    let key = document_key(source.as_bytes());
    if server.engine().contains(&key) {
        tracing::info!("{} has previously been added", logged);
        return Ok(json!([false, "Document already exists in the system cache."]).to_string());
    }

    let loaded = sources::load(server.http(), &server.config().root, source).await?;
    match server.engine().convert_into(&key, &loaded, source) {
        Ok(()) => {
            tracing::info!("Converted {} into document {}", logged, key);
            Ok(json!([true, key]).to_string())
        }
        Err(FolioError::AlreadyExists(message)) => Ok(json!([false, message]).to_string()),
        Err(e) => Err(e),
    }
}

fn convert_attachment(server: &McpServer, attachment: &Attachment) -> Value {
    let name = attachment.name.clone().unwrap_or_else(|| "attachment".to_string());
    let processed_at = chrono::Utc::now().to_rfc3339();

    let bytes = match sources::decode_attachment(&attachment.data_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            return json!({
                "name": name,
                "status": "failed",
                "error": e.to_string(),
                "processed_at": processed_at,
            })
        }
    };

    let key = document_key(&bytes);
    let (status, error) = if server.engine().contains(&key) {
        ("exists", None)
    } else {
        let source = DocumentSource::new(name.clone(), bytes.clone());
        match server.engine().convert_into(&key, &source, &name) {
            Ok(()) => ("converted", None),
            Err(e) => ("failed", Some(e.to_string())),
        }
    };

    let mut result = json!({
        "name": name,
        "file_size_bytes": bytes.len(),
        "header_hex": sources::header_hex(&bytes),
        "document_key": key,
        "status": status,
        "processed_at": processed_at,
    });
    if let Some(error) = error {
        result["error"] = Value::String(error);
    }
    result
}

fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No matching passages found.".to_string();
    }
    hits.iter()
        .map(|hit| format!("[{} | score {:.3}]\n{}", hit.document_key, hit.score, hit.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
