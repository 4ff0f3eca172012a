//! # Output Formatting
//!
//! Renders [`SearchResult`]s as text. A format is a whitespace separated
//! list of tokens: `.field` tokens are looked up in the result (dotted paths
//! reach into nested objects) and anything else is printed as-is.

use lg_core::SearchResult;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Format used when none is given.
pub const DEFAULT_FORMAT: &str = ".message";
/// Common line format for log records.
pub const STDLINE_FORMAT: &str = ".host .service .message";

const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Field(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    pub fn parse(format: &str) -> Self {
        let tokens = format
            .split_whitespace()
            .map(|tok| match tok.strip_prefix('.') {
                Some(field) if !field.is_empty() => Token::Field(field.to_string()),
                _ => Token::Literal(tok.to_string()),
            })
            .collect();
        Self { tokens }
    }

    pub fn render(&self, result: &SearchResult) -> String {
        self.row(result).join(" ")
    }

    /// Column headers: field names, or the literal text itself.
    pub fn columns(&self) -> Vec<String> {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Field(f) | Token::Literal(f) => f.clone(),
            })
            .collect()
    }

    fn row(&self, result: &SearchResult) -> Vec<String> {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Field(f) => result
                    .get(f)
                    .map(|v| display_value(&v))
                    .unwrap_or_else(|| MISSING.to_string()),
                Token::Literal(l) => l.clone(),
            })
            .collect()
    }
}

/// Aligned columns with a header row.
pub fn tabulate(template: &Template, results: &[SearchResult]) -> String {
    let mut builder = Builder::default();
    builder.push_record(template.columns());
    for result in results {
        builder.push_record(template.row(result));
    }
    let mut table = builder.build();
    table.with(Style::blank());
    table.to_string()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
