// src/tree/decode.rs
// =============================================================================
// Turns a Contents API file payload into FileContent.
//
// GitHub sends file bodies as base64 wrapped at 60 columns, so whitespace is
// stripped first. Decoded bytes are read as UTF-8; invalid sequences become
// U+FFFD instead of failing the file.
// =============================================================================

use base64ct::{Base64, Encoding};

use super::node::FileContent;
use crate::error::FetchError;
use crate::github::FileMetadata;

/// Decodes a base64 payload into text.
pub fn decode_base64_text(path: &str, payload: &str) -> Result<String, FetchError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = Base64::decode_vec(&compact).map_err(|e| FetchError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Content of `file`, or `missing` when GitHub did not inline a payload.
pub fn file_content(file: &FileMetadata, missing: FileContent) -> Result<FileContent, FetchError> {
    match file.payload() {
        Some(payload) => decode_base64_text(&file.path, payload).map(FileContent::Text),
        None => Ok(missing),
    }
}
