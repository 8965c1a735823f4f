//! The shared context every operation is built from.
//!
//! # Design
//! `ApiClient` bundles the settings, the driver registry and the transport
//! behind `Arc`s, so cloning it is cheap and every request builder, finder
//! and record operation receives its collaborators explicitly. Drivers are
//! built fresh on every call from the configured driver names; nothing is
//! cached between operations, so the only shared state is read-only.

use std::fmt;
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::conditions::{QueryCondition, QueryResultOrder};
use crate::config::Settings;
use crate::driver::{DriverRegistry, DriverKind};
use crate::error::ApiError;
use crate::error_handler::ErrorHandler;
use crate::interpreter::ResponseInterpreter;
use crate::model::{Model, ResourceDefinition};
use crate::request::RestRequest;
use crate::transport::Transport;
use crate::transporter::Transporter;
use crate::url_generator::UrlGenerator;

/// Entry point for talking to one remote API.
#[derive(Clone)]
pub struct ApiClient {
    settings: Arc<Settings>,
    registry: Arc<DriverRegistry>,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// A client using the built-in drivers.
    pub fn new(settings: Settings, transport: impl Transport + 'static) -> Self {
        Self::with_registry(settings, DriverRegistry::with_defaults(), transport)
    }

    pub fn with_registry(
        settings: Settings,
        registry: DriverRegistry,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(registry),
            transport: Arc::new(transport),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn url_generator(&self) -> UrlGenerator {
        UrlGenerator::new(&self.settings.request.path_prefix)
    }

    /// An empty record of the given resource, using this client's
    /// resource defaults.
    pub fn model(&self, definition: &Arc<ResourceDefinition>) -> Model {
        Model::new(Arc::clone(definition), &self.settings.resource)
    }

    pub fn request(&self) -> Result<RestRequest, ApiError> {
        self.required::<RestRequest>(&DriverKind::REQUEST, &self.settings.request.driver)
            .map(|request| *request)
    }

    pub fn transporter(&self) -> Result<Box<dyn Transporter>, ApiError> {
        self.required(&DriverKind::TRANSPORTER, &self.settings.transporter.driver)
    }

    /// `None` when no auth driver is configured.
    pub fn authenticator(&self) -> Result<Option<Box<dyn Authenticator>>, ApiError> {
        self.registry
            .build(&DriverKind::AUTH, self.settings.auth.driver.as_deref(), self)
    }

    pub fn interpreter(&self) -> Result<Box<dyn ResponseInterpreter>, ApiError> {
        self.required(&DriverKind::RESPONSE_INTERPRETER, &self.settings.response.driver)
    }

    pub fn error_handler(&self) -> Result<Box<dyn ErrorHandler>, ApiError> {
        self.required(&DriverKind::ERROR_HANDLER, &self.settings.error_handler.driver)
    }

    /// A fresh, empty condition accumulator.
    pub fn query_condition(&self) -> Result<Box<dyn QueryCondition>, ApiError> {
        self.required(&DriverKind::QUERY_CONDITION, &self.settings.query_condition.driver)
    }

    /// A fresh, empty ordering accumulator.
    pub fn result_order(&self) -> Result<Box<dyn QueryResultOrder>, ApiError> {
        self.required(&DriverKind::RESULT_ORDER, &self.settings.result_order.driver)
    }

    fn required<T>(&self, kind: &DriverKind, driver: &str) -> Result<Box<T>, ApiError>
    where
        T: ?Sized + 'static,
    {
        self.registry
            .build::<T>(kind, Some(driver), self)?
            .ok_or_else(|| ApiError::UnsupportedDriver {
                driver: driver.to_string(),
                resolved: kind.resolve(driver),
            })
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse};

    fn client(settings: Settings) -> ApiClient {
        ApiClient::new(settings, |_: &HttpRequest| {
            Ok::<_, TransportError>(HttpResponse::new(200, "{}"))
        })
    }

    #[test]
    fn builds_configured_drivers() {
        let client = client(Settings::default());
        assert!(client.request().is_ok());
        assert!(client.transporter().is_ok());
        assert!(client.interpreter().is_ok());
        assert!(client.error_handler().is_ok());
        assert!(client.query_condition().is_ok());
        assert!(client.result_order().is_ok());
        assert!(client.authenticator().unwrap().is_none());
    }

    #[test]
    fn configured_auth_driver_is_built() {
        let mut settings = Settings::default();
        settings.auth.driver = Some("basic".to_string());
        assert!(client(settings).authenticator().unwrap().is_some());
    }

    #[test]
    fn misconfigured_driver_surfaces_immediately() {
        let mut settings = Settings::default();
        settings.error_handler.driver = "xml_body".to_string();
        let err = client(settings).error_handler().err().unwrap();
        assert!(matches!(
            err,
            ApiError::UnsupportedDriver { ref resolved, .. }
                if resolved == "error_handlers::XmlBodyErrorHandler"
        ));
    }

    #[test]
    fn clones_share_settings() {
        let client = client(Settings::default());
        let other = client.clone();
        assert!(Arc::ptr_eq(&client.settings, &other.settings));
        assert!(format!("{client:?}").starts_with("ApiClient"));
    }
}
