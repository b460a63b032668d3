//! Plain text and Markdown loaders. Both are a direct UTF-8 decode; the
//! shared `normalize` pass in `document_loader::mod` is what actually does
//! the work for these two formats.

use crate::errors::CoreError;

pub fn extract(bytes: Vec<u8>) -> Result<String, CoreError> {
    String::from_utf8(bytes).map_err(|e| CoreError::LoaderFailure(format!("invalid utf-8: {e}")))
}
