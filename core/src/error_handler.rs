//! Extraction of validation messages from an invalid response.

use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::transporter::Transporter;

/// Only meaningful for responses the interpreter classified as invalid.
pub trait ErrorHandler {
    fn parse_errors(
        &self,
        response: &HttpResponse,
        transporter: &dyn Transporter,
    ) -> Result<Vec<String>, ApiError>;
}

/// The whole decoded body is the error list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayResponseErrorHandler;

impl ErrorHandler for ArrayResponseErrorHandler {
    fn parse_errors(
        &self,
        response: &HttpResponse,
        transporter: &dyn Transporter,
    ) -> Result<Vec<String>, ApiError> {
        let body = transporter.parse_response_to_data(response)?;
        Ok(messages(&body))
    }
}

/// The error list lives under a configured key of the decoded body.
#[derive(Debug, Clone)]
pub struct ParameterKeyErrorHandler {
    errors_key: String,
}

impl ParameterKeyErrorHandler {
    pub fn new(errors_key: impl Into<String>) -> Self {
        Self {
            errors_key: errors_key.into(),
        }
    }
}

impl ErrorHandler for ParameterKeyErrorHandler {
    fn parse_errors(
        &self,
        response: &HttpResponse,
        transporter: &dyn Transporter,
    ) -> Result<Vec<String>, ApiError> {
        let body = transporter.parse_response_to_data(response)?;
        body.get(&self.errors_key)
            .map(messages)
            .ok_or_else(|| ApiError::MissingErrorKey(self.errors_key.clone()))
    }
}

/// Flatten a decoded error payload into messages. Nested objects such as
/// `{"name": ["is required"]}` contribute their leaf values in order.
fn messages(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages).collect(),
        Value::Object(map) => map.values().flat_map(messages).collect(),
        other => vec![other.to_string()],
    }
}
