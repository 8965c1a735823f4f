//! Wire-format drivers.
//!
//! A transporter owns the content negotiation headers, turns form fields
//! into a request body and decodes response bodies. Only JSON ships.

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

pub trait Transporter {
    /// Content negotiation headers, applied as the last step of request creation.
    fn set_headers_on_request(&self, request: &mut HttpRequest);

    /// Encode the request's form fields as the body. Requests with file
    /// parts are left untouched so they go out as multipart.
    fn set_request_body(&self, request: &mut HttpRequest) -> Result<(), ApiError>;

    /// Decode a response body into structured data. An empty body is `Null`.
    fn parse_response_to_data(&self, response: &HttpResponse) -> Result<Value, ApiError>;
}

/// JSON in, JSON out.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransporter;

impl Transporter for JsonTransporter {
    fn set_headers_on_request(&self, request: &mut HttpRequest) {
        request.set_header("Accept", "application/json");
    }

    fn set_request_body(&self, request: &mut HttpRequest) -> Result<(), ApiError> {
        if !request.files.is_empty() || request.form_fields.is_empty() {
            return Ok(());
        }
        let object: Map<String, Value> = request.form_fields.iter().cloned().collect();
        let body = serde_json::to_string(&object)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        request.set_header("Content-Type", "application/json");
        request.body = Some(body);
        Ok(())
    }

    fn parse_response_to_data(&self, response: &HttpResponse) -> Result<Value, ApiError> {
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use serde_json::json;

    #[test]
    fn sets_accept_header() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        JsonTransporter.set_headers_on_request(&mut req);
        assert_eq!(req.header("Accept"), Some("application/json"));
        assert!(req.header("Content-Type").is_none());
    }

    #[test]
    fn form_fields_become_json_body() {
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost/users");
        req.set_form_field("name", json!("John Doe"));
        req.set_form_field("age", json!(42));
        req.set_form_field("admin", json!(false));
        JsonTransporter.set_request_body(&mut req).unwrap();

        assert_eq!(req.header("Content-Type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "John Doe", "age": 42, "admin": false}));
    }

    #[test]
    fn file_parts_leave_body_alone() {
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost/users");
        req.set_form_field("name", json!("John"));
        req.add_file("avatar", "/tmp/avatar.png");
        JsonTransporter.set_request_body(&mut req).unwrap();
        assert!(req.body.is_none());
        assert!(req.header("Content-Type").is_none());
    }

    #[test]
    fn no_fields_means_no_body() {
        let mut req = HttpRequest::new(HttpMethod::Delete, "http://localhost/users/1");
        JsonTransporter.set_request_body(&mut req).unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn parses_json_bodies() {
        let resp = HttpResponse::new(200, r#"{"id":1234,"name":"John Doe"}"#);
        let data = JsonTransporter.parse_response_to_data(&resp).unwrap();
        assert_eq!(data["name"], "John Doe");
    }

    #[test]
    fn empty_body_is_null() {
        let resp = HttpResponse::new(204, "  ");
        assert_eq!(JsonTransporter.parse_response_to_data(&resp).unwrap(), Value::Null);
    }

    #[test]
    fn bad_json_is_a_deserialization_error() {
        let resp = HttpResponse::new(200, "not json");
        let err = JsonTransporter.parse_response_to_data(&resp).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
