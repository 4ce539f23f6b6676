//! Loading conversion sources: local paths, http(s) URLs and base64
//! attachments

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use folio_common::{FolioError, Result};
use folio_core::DocumentSource;
use std::path::Path;

/// Strips surrounding whitespace and quotes from a user-supplied source
pub fn clean_source(source: &str) -> &str {
    source.trim().trim_matches(|c| c == '"' || c == '\'')
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetches `source` over HTTP or reads it from disk. Relative paths resolve
/// against `root`.
#[tracing::instrument(skip_all)]
pub async fn load(client: &reqwest::Client, root: &Path, source: &str) -> Result<DocumentSource> {
    if is_url(source) {
        let network = |e: reqwest::Error| FolioError::NetworkError(format!("{}: {}", source, e));
        let response = client
            .get(source)
            .send()
            .await
            .map_err(network)?
            .error_for_status()
            .map_err(network)?;
        let bytes = response.bytes().await.map_err(network)?;
        tracing::debug!("Fetched {} bytes", bytes.len());
        return Ok(DocumentSource::new(source, bytes.to_vec()));
    }

    let path = root.join(source);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        FolioError::ConversionFailed(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(DocumentSource::new(source, bytes))
}

pub fn decode_attachment(data_base64: &str) -> Result<Vec<u8>> {
    let compact: String = data_base64.split_whitespace().collect();
    BASE64
        .decode(compact)
        .map_err(|e| FolioError::InvalidInput(format!("attachment is not valid base64: {}", e)))
}

/// Hex of the first ten bytes of a payload
pub fn header_hex(bytes: &[u8]) -> String {
    bytes.iter().take(10).map(|b| format!("{:02x}", b)).collect()
}
