//! Embedded record extraction
//!
//! Status pages carry the status as JSON embedded in the HTML, either as the
//! text of a `<script type="application/json">` element or as the `value` of a
//! hidden `<input class="json-data">`. This module pulls that JSON out of the
//! page body.

use scraper::{Html, Selector};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while extracting an embedded record
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("No embedded record found")]
    Missing,

    #[error("Unable to parse embedded JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Unexpected format for embedded JSON: expected an object, got {0}")]
    UnexpectedShape(&'static str),
}

/// Turns a fetched page body into a structured record
pub trait Extractor: Send + Sync {
    fn extract(&self, body: &str) -> Result<Map<String, Value>, ExtractError>;
}

/// Extracts the JSON object carried by the first element matching a selector
#[derive(Debug, Clone)]
pub struct EmbeddedJsonExtractor {
    selector: Selector,
}

impl EmbeddedJsonExtractor {
    /// Creates an extractor for the given CSS selector
    ///
    /// # Example
    ///
    /// ```
    /// use status_crawler::crawler::{EmbeddedJsonExtractor, Extractor};
    ///
    /// let extractor = EmbeddedJsonExtractor::new(r#"script[type="application/json"]"#).unwrap();
    /// let html = r#"<html><script type="application/json">{"text":"hello"}</script></html>"#;
    /// let record = extractor.extract(html).unwrap();
    /// assert_eq!(record["text"], "hello");
    /// ```
    pub fn new(selector: &str) -> Result<Self, ExtractError> {
        let selector =
            Selector::parse(selector).map_err(|_| ExtractError::Selector(selector.to_string()))?;
        Ok(Self { selector })
    }
}

impl Extractor for EmbeddedJsonExtractor {
    fn extract(&self, body: &str) -> Result<Map<String, Value>, ExtractError> {
        let document = Html::parse_document(body);

        let element = document
            .select(&self.selector)
            .next()
            .ok_or(ExtractError::Missing)?;

        // Attribute values are already entity-decoded by the HTML parser
        let raw = match element.value().attr("value") {
            Some(value) => value.to_string(),
            None => element.text().collect::<String>(),
        };

        match serde_json::from_str::<Value>(raw.trim())? {
            Value::Object(record) => Ok(record),
            other => Err(ExtractError::UnexpectedShape(json_kind(&other))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
