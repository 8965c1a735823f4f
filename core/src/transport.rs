//! The wire boundary.
//!
//! # Design
//! The core never opens a socket itself. A `Transport` receives a fully
//! assembled `HttpRequest` and returns whatever the server answered,
//! including 4xx/5xx responses. Any closure with the right signature is a
//! transport, which is how the unit tests script responses. `UreqTransport`
//! (default `ureq` feature) is the blocking implementation for real use.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one blocking HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use tracing::{debug, warn};
    use ureq::{Agent, RequestBuilder};

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Blocking transport backed by a ureq agent.
    ///
    /// The agent is built with `http_status_as_error(false)` so 4xx/5xx
    /// responses come back as data rather than `Err`, letting the response
    /// interpreter handle status classification.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        /// Use a preconfigured agent (timeouts, proxies, TLS).
        pub fn with_agent(agent: Agent) -> Self {
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            let url = request.full_url();
            let body = request.encoded_body().map_err(TransportError::Body)?;
            debug!(method = %request.method, url = %url, "sending request");
            if body.is_some() && !request.method.sends_body() {
                warn!(
                    method = %request.method,
                    url = %url,
                    "request payload dropped, {} is sent without a body",
                    request.method
                );
            }

            let result = match request.method {
                HttpMethod::Get => with_headers(self.agent.get(&url), request).call(),
                HttpMethod::Head => with_headers(self.agent.head(&url), request).call(),
                HttpMethod::Delete => with_headers(self.agent.delete(&url), request).call(),
                HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                    let builder = match request.method {
                        HttpMethod::Post => self.agent.post(&url),
                        HttpMethod::Put => self.agent.put(&url),
                        _ => self.agent.patch(&url),
                    };
                    let builder = with_headers(builder, request);
                    match body {
                        Some(body) => builder
                            .content_type(body.content_type.as_str())
                            .send(body.bytes.as_slice()),
                        None => builder.send_empty(),
                    }
                }
            };

            match result {
                Ok(mut response) => {
                    let status = response.status().as_u16();
                    let headers = response
                        .headers()
                        .iter()
                        .filter_map(|(name, value)| {
                            value
                                .to_str()
                                .ok()
                                .map(|v| (name.as_str().to_string(), v.to_string()))
                        })
                        .collect();
                    let body = if request.method == HttpMethod::Head {
                        String::new()
                    } else {
                        response
                            .body_mut()
                            .read_to_string()
                            .map_err(|e| TransportError::Connection(e.to_string()))?
                    };
                    Ok(HttpResponse {
                        status,
                        headers,
                        body,
                    })
                }
                Err(ureq::Error::StatusCode(status)) => {
                    Err(TransportError::Status(HttpResponse::new(status, String::new())))
                }
                Err(e) => Err(TransportError::Connection(e.to_string())),
            }
        }
    }

    /// Copy request headers onto the builder. Content-Type is left to the
    /// encoded body.
    fn with_headers<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
        for (name, value) in &request.headers {
            if !name.eq_ignore_ascii_case("content-type") {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        builder
    }
}
