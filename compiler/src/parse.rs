//! The parser seam.
//!
//! The `.proto` lexer and parser are external collaborators: anything that
//! can produce a [`RawItem`] list can feed the pipeline through the
//! [`SchemaParser`] trait. The built-in [`JsonDefsParser`] reads the raw
//! shape serialized as JSON, which is what the CLI and the hermetic tests
//! use.

use std::path::Path;

use crate::types::RawItem;

/// How a parse attempt failed. `Scan` covers tokenization-level trouble
/// (e.g. the file is not text), `Parse` covers structural trouble.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    Scan(String),
    Parse(String),
}

pub trait SchemaParser {
    /// Parses one file's contents into its raw definition list. `path` is
    /// provided for diagnostics only.
    fn parse(&self, path: &Path, contents: &[u8]) -> Result<Vec<RawItem>, ParseFailure>;
}

/// Parses the raw definition shape from JSON: a top-level array of items.
pub struct JsonDefsParser;

impl SchemaParser for JsonDefsParser {
    fn parse(&self, _path: &Path, contents: &[u8]) -> Result<Vec<RawItem>, ParseFailure> {
        let text = std::str::from_utf8(contents)
            .map_err(|e| ParseFailure::Scan(format!("not valid UTF-8: {}", e)))?;
        serde_json::from_str(text).map_err(|e| ParseFailure::Parse(e.to_string()))
    }
}
