//! Outbound request assembly.
//!
//! # Design
//! `RestRequest` walks one logical operation through a fixed sequence:
//! `create_request` fixes the URL, verb and negotiation headers, optional
//! steps add credentials, query conditions, ordering and the record's
//! attributes, and `send_request` hands the finished `HttpRequest` to the
//! client's transport. The builder holds at most one pending request; every
//! step after creation fails with `RequestNotCreated` until one exists.
//!
//! The `raw_*` methods run the whole sequence for calls that are not bound
//! to a record and report the outcome as a `RawResponse`.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::auth::Authenticator;
use crate::client::ApiClient;
use crate::conditions::{QueryCondition, QueryResultOrder};
use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::model::Model;
use crate::response::RawResponse;
use crate::transporter::Transporter;

pub struct RestRequest {
    client: ApiClient,
    transporter: Option<Box<dyn Transporter>>,
    request: Option<HttpRequest>,
}

impl RestRequest {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            transporter: None,
            request: None,
        }
    }

    /// Start a new request, discarding any previous one.
    ///
    /// PATCH goes out as PUT. With `method_param` set, every verb other than
    /// GET and HEAD is tunnelled through POST and the original verb travels
    /// in the form field named by `method_param`.
    pub fn create_request(
        &mut self,
        base_uri: &str,
        path: &str,
        http_method: &str,
        headers: &[(&str, &str)],
        method_param: Option<&str>,
    ) -> Result<&mut HttpRequest, ApiError> {
        let method: HttpMethod = http_method.parse()?;
        let transporter = self.client.transporter()?;

        let mut request = match method_param {
            Some(param) if !method.is_read_only() => {
                let mut request = HttpRequest::new(HttpMethod::Post, join_url(base_uri, path));
                request.set_form_field(param, Value::String(method.as_str().to_string()));
                request
            }
            _ if method == HttpMethod::Patch => {
                HttpRequest::new(HttpMethod::Put, join_url(base_uri, path))
            }
            _ => HttpRequest::new(method, join_url(base_uri, path)),
        };

        for (name, value) in headers {
            request.set_header(name, value);
        }
        transporter.set_headers_on_request(&mut request);

        debug!(method = %request.method, url = %request.url, "created request");
        self.transporter = Some(transporter);
        Ok(self.request.insert(request))
    }

    /// The pending request, if one was created.
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    /// The transporter chosen when the pending request was created.
    pub fn transporter(&self) -> Result<&dyn Transporter, ApiError> {
        self.transporter
            .as_deref()
            .ok_or(ApiError::RequestNotCreated)
    }

    pub fn set_headers(&mut self, headers: &[(&str, &str)]) -> Result<(), ApiError> {
        let request = self.pending()?;
        for (name, value) in headers {
            request.set_header(name, value);
        }
        Ok(())
    }

    pub fn set_post_parameters(&mut self, params: &[(&str, Value)]) -> Result<(), ApiError> {
        let request = self.pending()?;
        for (key, value) in params {
            request.set_form_field(key, value.clone());
        }
        Ok(())
    }

    pub fn set_get_parameters(&mut self, params: &[(&str, &str)]) -> Result<(), ApiError> {
        let request = self.pending()?;
        for (key, value) in params {
            request.add_query(key, value);
        }
        Ok(())
    }

    pub fn set_file_parameters(&mut self, files: &[(&str, &Path)]) -> Result<(), ApiError> {
        let request = self.pending()?;
        for (key, path) in files {
            request.add_file(key, path);
        }
        Ok(())
    }

    pub fn authenticate(&mut self, authenticator: &dyn Authenticator) -> Result<(), ApiError> {
        authenticator.authenticate_request(self.pending()?);
        Ok(())
    }

    pub fn add_query_condition(&mut self, condition: &dyn QueryCondition) -> Result<(), ApiError> {
        condition.add_to_request(self.pending()?);
        Ok(())
    }

    pub fn add_query_result_order(&mut self, order: &dyn QueryResultOrder) -> Result<(), ApiError> {
        order.add_to_request(self.pending()?);
        Ok(())
    }

    /// Copy the record's mutable attributes onto the request.
    ///
    /// File fields become file parts (their value is a path on disk).
    /// Guarded attributes are never sent; the identity travels in the URL.
    pub fn set_model_properties(&mut self, model: &Model) -> Result<(), ApiError> {
        let guarded = model.guarded_attributes();
        let request = self.pending()?;

        for (key, value) in model.mutable_fields() {
            if model.file_fields().iter().any(|f| *f == key) {
                if let Some(path) = value.as_str() {
                    request.add_file(&key, path);
                }
            } else if !guarded.contains(&key.as_str()) {
                request.set_form_field(&key, value);
            }
        }
        Ok(())
    }

    /// Execute the pending request.
    ///
    /// A transport that reports an HTTP status as an error still produced a
    /// response; it is returned like any other. Only failures without a
    /// response surface as `Err`. A file part that cannot be read is an
    /// `ApiError::Io`, checked before the transport is called.
    pub fn send_request(&mut self) -> Result<HttpResponse, ApiError> {
        let transporter = self.transporter.as_deref().ok_or(ApiError::RequestNotCreated)?;
        let request = self.request.as_mut().ok_or(ApiError::RequestNotCreated)?;
        transporter.set_request_body(request)?;
        for (_, path) in &request.files {
            std::fs::metadata(path)?;
        }

        debug!(method = %request.method, url = %request.full_url(), "sending request");
        let response = match self.client.transport().send(request) {
            Ok(response) => response,
            Err(TransportError::Status(response)) => response,
            Err(TransportError::Body(err)) => return Err(ApiError::Io(err)),
            Err(err) => return Err(err.into()),
        };
        debug!(status = response.status, "received response");
        Ok(response)
    }

    pub fn raw_get(
        &mut self,
        uri: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<RawResponse, ApiError> {
        self.raw_request(uri, "GET", &[], params, &[], headers)
    }

    pub fn raw_post(
        &mut self,
        uri: &str,
        params: &[(&str, Value)],
        get_params: &[(&str, &str)],
        files: &[(&str, &Path)],
        headers: &[(&str, &str)],
    ) -> Result<RawResponse, ApiError> {
        self.raw_request(uri, "POST", params, get_params, files, headers)
    }

    pub fn raw_put(
        &mut self,
        uri: &str,
        params: &[(&str, Value)],
        get_params: &[(&str, &str)],
        files: &[(&str, &Path)],
        headers: &[(&str, &str)],
    ) -> Result<RawResponse, ApiError> {
        self.raw_request(uri, "PUT", params, get_params, files, headers)
    }

    pub fn raw_patch(
        &mut self,
        uri: &str,
        params: &[(&str, Value)],
        get_params: &[(&str, &str)],
        files: &[(&str, &Path)],
        headers: &[(&str, &str)],
    ) -> Result<RawResponse, ApiError> {
        self.raw_request(uri, "PATCH", params, get_params, files, headers)
    }

    pub fn raw_delete(
        &mut self,
        uri: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<RawResponse, ApiError> {
        self.raw_request(uri, "DELETE", &[], params, &[], headers)
    }

    /// One request not bound to a record, relative to the configured base URI.
    ///
    /// An invalid response runs the error handler; its messages end up on
    /// the returned `RawResponse`.
    pub fn raw_request(
        &mut self,
        uri: &str,
        method: &str,
        params: &[(&str, Value)],
        get_params: &[(&str, &str)],
        files: &[(&str, &Path)],
        headers: &[(&str, &str)],
    ) -> Result<RawResponse, ApiError> {
        let client = self.client.clone();
        let settings = &client.settings().request;

        self.create_request(
            &settings.base_uri,
            uri,
            method,
            headers,
            settings.http_method_param.as_deref(),
        )?;
        self.set_post_parameters(params)?;
        self.set_get_parameters(get_params)?;
        self.set_file_parameters(files)?;
        if let Some(authenticator) = client.authenticator()? {
            self.authenticate(authenticator.as_ref())?;
        }

        let response = self.send_request()?;
        let interpreter = client.interpreter()?;
        let transporter = self.transporter()?;

        if interpreter.invalid(&response) {
            let errors = client.error_handler()?.parse_errors(&response, transporter)?;
            return Ok(RawResponse::new(false, response, errors, transporter));
        }
        let success = interpreter.success(&response);
        Ok(RawResponse::new(success, response, Vec::new(), transporter))
    }

    fn pending(&mut self) -> Result<&mut HttpRequest, ApiError> {
        self.request.as_mut().ok_or(ApiError::RequestNotCreated)
    }
}

/// Join a base URI and a path with exactly one slash. An absolute `path`
/// is used as is.
fn join_url(base_uri: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_uri.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
