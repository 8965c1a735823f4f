//! Request authentication drivers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::BasicAuthSettings;
use crate::http::HttpRequest;

/// Applies credentials to an outgoing request in place.
pub trait Authenticator {
    fn authenticate_request(&self, request: &mut HttpRequest);
}

/// HTTP Basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn from_settings(settings: &BasicAuthSettings) -> Self {
        Self::new(&settings.username, &settings.password)
    }
}

impl Authenticator for BasicAuthenticator {
    fn authenticate_request(&self, request: &mut HttpRequest) {
        let credentials = STANDARD.encode(format!("{}:{}", self.username, self.password));
        request.set_header("Authorization", &format!("Basic {credentials}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    #[test]
    fn sets_basic_authorization_header() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        BasicAuthenticator::new("Aladdin", "open sesame").authenticate_request(&mut req);
        assert_eq!(req.header("authorization"), Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="));
    }

    #[test]
    fn replaces_existing_credentials() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        req.set_header("Authorization", "Bearer stale");
        let settings = BasicAuthSettings {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        BasicAuthenticator::from_settings(&settings).authenticate_request(&mut req);
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("Authorization"), Some("Basic dXNlcjpwYXNz"));
    }
}
