//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! request builder assembles an `HttpRequest`, a `Transport` moves it over
//! the wire, and the response comes back as an `HttpResponse` for the
//! interpreter to classify. Nothing here touches the network.
//!
//! Form fields keep their JSON values so a JSON transporter can send numbers
//! and booleans unchanged; they are only flattened to text when the body is
//! encoded as a form or multipart payload.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::Value;
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// GET and HEAD are never tunnelled through POST and never carry a body.
    pub fn is_read_only(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }

    /// Whether the blocking transport sends a payload for this verb.
    /// DELETE is sent without one; use the method override to tunnel
    /// fields on a delete.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "patch" => Ok(HttpMethod::Patch),
            "delete" => Ok(HttpMethod::Delete),
            "head" => Ok(HttpMethod::Head),
            _ => Err(ApiError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RestRequest`. A `Transport` executes it and returns the
/// corresponding `HttpResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL without the query string.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub form_fields: Vec<(String, Value)>,
    /// File parts as (field name, path on disk).
    pub files: Vec<(String, PathBuf)>,
    /// Pre-encoded body; set by the transporter.
    pub body: Option<String>,
}

/// A request body ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            form_fields: Vec::new(),
            files: Vec::new(),
            body: None,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing value under the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn add_query(&mut self, key: &str, value: &str) {
        self.query.push((key.to_string(), value.to_string()));
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a form field, replacing any existing value under the same name.
    pub fn set_form_field(&mut self, key: &str, value: Value) {
        match self.form_fields.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.form_fields.push((key.to_string(), value)),
        }
    }

    pub fn form_field(&self, key: &str) -> Option<&Value> {
        self.form_fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn add_file(&mut self, key: &str, path: impl Into<PathBuf>) {
        self.files.push((key.to_string(), path.into()));
    }

    /// The URL with the query pairs appended, in insertion order.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.url)
    }

    /// Encode the payload for the wire.
    ///
    /// File parts force a multipart body (files are read from disk here).
    /// Otherwise an explicit `body` wins, then url-encoded form fields.
    /// Returns `None` when the request carries no payload at all.
    pub fn encoded_body(&self) -> std::io::Result<Option<EncodedBody>> {
        if !self.files.is_empty() {
            return self.multipart_body().map(Some);
        }
        if let Some(body) = &self.body {
            let content_type = self.header("Content-Type").unwrap_or("application/json");
            return Ok(Some(EncodedBody {
                content_type: content_type.to_string(),
                bytes: body.as_bytes().to_vec(),
            }));
        }
        if self.form_fields.is_empty() {
            return Ok(None);
        }
        let form = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.form_fields.iter().map(|(k, v)| (k, field_text(v))))
            .finish();
        Ok(Some(EncodedBody {
            content_type: "application/x-www-form-urlencoded".to_string(),
            bytes: form.into_bytes(),
        }))
    }

    fn multipart_body(&self) -> std::io::Result<EncodedBody> {
        let boundary = format!("----resource-core-{}", Uuid::new_v4().simple());
        let mut bytes = Vec::new();

        for (name, value) in &self.form_fields {
            bytes.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    quoted(name),
                    field_text(value)
                )
                .as_bytes(),
            );
        }

        for (name, path) in &self.files {
            let data = std::fs::read(path)?;
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            bytes.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    quoted(name),
                    quoted(&filename)
                )
                .as_bytes(),
            );
            bytes.extend_from_slice(&data);
            bytes.extend_from_slice(b"\r\n");
        }

        bytes.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Ok(EncodedBody {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            bytes,
        })
    }
}

/// Escape a Content-Disposition parameter value the way browsers do:
/// `"`, CR and LF are percent-encoded so the header stays on one line.
fn quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Flatten a JSON value into form text.
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport` after executing an `HttpRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_write_verbs_send_a_body() {
        assert!(HttpMethod::Post.sends_body());
        assert!(HttpMethod::Put.sends_body());
        assert!(HttpMethod::Patch.sends_body());
        assert!(!HttpMethod::Delete.sends_body());
        assert!(!HttpMethod::Get.sends_body());
        assert!(!HttpMethod::Head.sends_body());
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PaTcH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!("HEAD".parse::<HttpMethod>().unwrap(), HttpMethod::Head);
    }

    #[test]
    fn method_rejects_unknown_verbs() {
        let err = "TRACE".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, ApiError::InvalidMethod(m) if m == "TRACE"));
    }

    #[test]
    fn set_header_replaces_regardless_of_case() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        req.set_header("accept", "text/html");
        req.set_header("Accept", "application/json");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn full_url_keeps_query_order_and_encodes_brackets() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        req.add_query("search[0][property]", "name");
        req.add_query("order_by", "id");
        assert_eq!(
            req.full_url(),
            "http://localhost/users?search%5B0%5D%5Bproperty%5D=name&order_by=id"
        );
    }

    #[test]
    fn full_url_without_query_is_unchanged() {
        let req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        assert_eq!(req.full_url(), "http://localhost/users");
    }

    #[test]
    fn form_fields_encode_as_urlencoded_when_no_body() {
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost/users");
        req.set_form_field("name", json!("John Doe"));
        req.set_form_field("age", json!(42));
        let body = req.encoded_body().unwrap().unwrap();
        assert_eq!(body.content_type, "application/x-www-form-urlencoded");
        assert_eq!(String::from_utf8(body.bytes).unwrap(), "name=John+Doe&age=42");
    }

    #[test]
    fn set_form_field_replaces_existing_value() {
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost/users");
        req.set_form_field("_method", json!("PUT"));
        req.set_form_field("_method", json!("DELETE"));
        assert_eq!(req.form_fields.len(), 1);
        assert_eq!(req.form_field("_method"), Some(&json!("DELETE")));
    }

    #[test]
    fn explicit_body_uses_content_type_header() {
        let mut req = HttpRequest::new(HttpMethod::Put, "http://localhost/users/1");
        req.set_header("Content-Type", "application/json");
        req.body = Some(r#"{"name":"x"}"#.to_string());
        let body = req.encoded_body().unwrap().unwrap();
        assert_eq!(body.content_type, "application/json");
        assert_eq!(body.bytes, br#"{"name":"x"}"#.to_vec());
    }

    #[test]
    fn files_force_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        std::fs::write(&path, b"PNGDATA").unwrap();

        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost/users");
        req.set_form_field("name", json!("John"));
        req.add_file("avatar", &path);
        req.body = Some("ignored".to_string());

        let body = req.encoded_body().unwrap().unwrap();
        assert!(body.content_type.starts_with("multipart/form-data; boundary="));
        let text = String::from_utf8_lossy(&body.bytes);
        assert!(text.contains("name=\"name\"\r\n\r\nJohn\r\n"));
        assert!(text.contains("name=\"avatar\"; filename=\"avatar.png\""));
        assert!(text.contains("PNGDATA"));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn multipart_names_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my \"best\".png");
        std::fs::write(&path, b"x").unwrap();

        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost/users");
        req.set_form_field("bad\"\r\nX-Injected: 1", json!("v"));
        req.add_file("avatar", &path);

        let body = req.encoded_body().unwrap().unwrap();
        let text = String::from_utf8_lossy(&body.bytes);
        assert!(text.contains("name=\"bad%22%0D%0AX-Injected: 1\"\r\n"));
        assert!(text.contains("filename=\"my %22best%22.png\""));
        assert!(!text.contains("\r\nX-Injected"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut req = HttpRequest::new(HttpMethod::Post, "http://localhost/users");
        req.add_file("avatar", "/definitely/not/here.png");
        assert!(req.encoded_body().is_err());
    }

    #[test]
    fn empty_request_has_no_body() {
        let req = HttpRequest::new(HttpMethod::Delete, "http://localhost/users/1");
        assert!(req.encoded_body().unwrap().is_none());
    }
}
