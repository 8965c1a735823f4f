//! Outcome of a raw request.

use serde_json::Value;

use crate::http::HttpResponse;
use crate::transporter::Transporter;

/// What a raw request produced: whether the interpreter called it a success,
/// the response itself and any validation messages.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub success: bool,
    response: HttpResponse,
    data: Option<Value>,
    errors: Vec<String>,
}

impl RawResponse {
    /// The body is decoded once up front; a body the transporter cannot
    /// decode leaves `response()` empty.
    pub fn new(
        success: bool,
        response: HttpResponse,
        errors: Vec<String>,
        transporter: &dyn Transporter,
    ) -> Self {
        let data = transporter.parse_response_to_data(&response).ok();
        Self {
            success,
            response,
            data,
            errors,
        }
    }

    /// Only populated when the response was classified as invalid.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn response(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn http_response(&self) -> &HttpResponse {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transporter::JsonTransporter;
    use serde_json::json;

    #[test]
    fn decodes_body_once() {
        let raw = RawResponse::new(
            true,
            HttpResponse::new(200, r#"[{"id":1}]"#),
            Vec::new(),
            &JsonTransporter,
        );
        assert_eq!(raw.response(), Some(&json!([{"id": 1}])));
        assert_eq!(raw.http_response().body, r#"[{"id":1}]"#);
    }

    #[test]
    fn undecodable_body_has_no_data() {
        let raw = RawResponse::new(false, HttpResponse::new(502, "<html>"), Vec::new(), &JsonTransporter);
        assert!(raw.response().is_none());
        assert!(!raw.success);
    }
}
