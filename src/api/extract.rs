//! Embedded-JSON extraction.
//!
//! The account endpoints return raw JSON, which the browser renders inside
//! a `<pre>` block. The extractor pulls that block out of the page markup
//! and parses it.

use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no embedded JSON block in page content")]
    MissingBlock,
    #[error("embedded JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct JsonExtractor {
    pre_block: Regex,
}

impl JsonExtractor {
    pub fn new() -> Self {
        Self {
            pre_block: Regex::new("<pre.*?>(.*?)</pre>").expect("valid pre-block pattern"),
        }
    }

    /// Extract the embedded JSON block as an untyped value.
    pub fn value(&self, content: &str) -> Result<serde_json::Value, ParseError> {
        let block = self.block(content)?;
        Ok(serde_json::from_str(block)?)
    }

    /// Extract the embedded JSON block and deserialize it.
    pub fn typed<T: DeserializeOwned>(&self, content: &str) -> Result<T, ParseError> {
        let block = self.block(content)?;
        Ok(serde_json::from_str(block)?)
    }

    fn block<'a>(&self, content: &'a str) -> Result<&'a str, ParseError> {
        self.pre_block
            .captures(content)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str())
            .ok_or(ParseError::MissingBlock)
    }
}

impl Default for JsonExtractor {
    fn default() -> Self {
        Self::new()
    }
}
