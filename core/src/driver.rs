//! Pluggable driver resolution.
//!
//! # Design
//! Every swappable strategy (transporter, authenticator, interpreter, ...) is
//! picked by a driver name from the configuration. The name is turned into a
//! qualified type name by convention (`namespace::{Prefix}{UpperCamelName}{Suffix}`,
//! e.g. `basic` → `auth::BasicAuthenticator`) and looked up in an explicit
//! registry populated up front, instead of reflecting over type names at
//! runtime.
//!
//! A registered type lists the capabilities it provides, one factory per
//! capability trait object. Looking up an unknown type is an unsupported
//! driver; looking up a known type through a capability it does not provide
//! is an unsupported interface.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use heck::ToUpperCamelCase;
use tracing::debug;

use crate::auth::{Authenticator, BasicAuthenticator};
use crate::client::ApiClient;
use crate::conditions::{
    GetArrayParamsQueryCondition, GetParamsResultOrder, QueryCondition, QueryResultOrder,
};
use crate::error::ApiError;
use crate::error_handler::{ArrayResponseErrorHandler, ErrorHandler, ParameterKeyErrorHandler};
use crate::interpreter::{HttpStatusCodeInterpreter, ResponseInterpreter};
use crate::request::RestRequest;
use crate::transporter::{JsonTransporter, Transporter};

/// Naming convention and capability for one family of drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverKind {
    pub namespace: &'static str,
    pub prefix: &'static str,
    pub suffix: &'static str,
    /// Human-readable capability name used in error messages.
    pub capability: &'static str,
}

impl DriverKind {
    pub const REQUEST: DriverKind = DriverKind {
        namespace: "requests",
        prefix: "",
        suffix: "Request",
        capability: "RestRequest",
    };
    pub const TRANSPORTER: DriverKind = DriverKind {
        namespace: "transporters",
        prefix: "",
        suffix: "Transporter",
        capability: "Transporter",
    };
    pub const AUTH: DriverKind = DriverKind {
        namespace: "auth",
        prefix: "",
        suffix: "Authenticator",
        capability: "Authenticator",
    };
    pub const QUERY_CONDITION: DriverKind = DriverKind {
        namespace: "conditions",
        prefix: "",
        suffix: "QueryCondition",
        capability: "QueryCondition",
    };
    pub const RESULT_ORDER: DriverKind = DriverKind {
        namespace: "conditions",
        prefix: "",
        suffix: "ResultOrder",
        capability: "QueryResultOrder",
    };
    pub const RESPONSE_INTERPRETER: DriverKind = DriverKind {
        namespace: "interpreters",
        prefix: "",
        suffix: "Interpreter",
        capability: "ResponseInterpreter",
    };
    pub const ERROR_HANDLER: DriverKind = DriverKind {
        namespace: "error_handlers",
        prefix: "",
        suffix: "ErrorHandler",
        capability: "ErrorHandler",
    };

    /// Qualified type name for a configured driver name.
    pub fn resolve(&self, driver: &str) -> String {
        format!(
            "{}::{}{}{}",
            self.namespace,
            self.prefix,
            driver.to_upper_camel_case(),
            self.suffix
        )
    }
}

type Factory<T> = Arc<dyn Fn(&ApiClient) -> Box<T> + Send + Sync>;

#[derive(Default)]
struct RegisteredType {
    /// Keyed by the `TypeId` of the capability (usually a `dyn Trait`).
    factories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

/// Registry of driver types and the capabilities they provide.
#[derive(Default)]
pub struct DriverRegistry {
    types: HashMap<String, RegisteredType>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in driver.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register::<RestRequest, _>("requests::RestRequest", |client| {
            Box::new(RestRequest::new(client.clone()))
        });
        registry.register::<dyn Transporter, _>("transporters::JsonTransporter", |_| {
            Box::new(JsonTransporter)
        });
        registry.register::<dyn Authenticator, _>("auth::BasicAuthenticator", |client| {
            Box::new(BasicAuthenticator::from_settings(&client.settings().auth.basic))
        });
        registry.register::<dyn QueryCondition, _>(
            "conditions::GetArrayParamsQueryCondition",
            |client| {
                Box::new(GetArrayParamsQueryCondition::new(
                    client.settings().query_condition.get_array_params.clone(),
                ))
            },
        );
        registry.register::<dyn QueryResultOrder, _>("conditions::GetParamsResultOrder", |client| {
            Box::new(GetParamsResultOrder::new(
                client.settings().result_order.get_params.clone(),
            ))
        });
        registry.register::<dyn ResponseInterpreter, _>(
            "interpreters::HttpStatusCodeInterpreter",
            |client| {
                Box::new(HttpStatusCodeInterpreter::new(
                    client.settings().response.http_status.clone(),
                ))
            },
        );
        registry.register::<dyn ErrorHandler, _>(
            "error_handlers::ArrayResponseErrorHandler",
            |_| Box::new(ArrayResponseErrorHandler),
        );
        registry.register::<dyn ErrorHandler, _>(
            "error_handlers::ParameterKeyErrorHandler",
            |client| {
                Box::new(ParameterKeyErrorHandler::new(
                    client.settings().error_handler.errors_key.clone().unwrap_or_default(),
                ))
            },
        );

        registry
    }

    /// Register `type_name` as providing capability `T`.
    ///
    /// A type may be registered several times with different capabilities;
    /// registering the same capability twice replaces the factory.
    pub fn register<T, F>(&mut self, type_name: &str, factory: F)
    where
        T: ?Sized + 'static,
        F: Fn(&ApiClient) -> Box<T> + Send + Sync + 'static,
    {
        let factory: Factory<T> = Arc::new(factory);
        self.types
            .entry(type_name.to_string())
            .or_default()
            .factories
            .insert(TypeId::of::<T>(), Box::new(factory));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Build the driver named `driver` as capability `T`.
    ///
    /// `None` means no driver was selected and is not an error.
    pub fn build<T>(
        &self,
        kind: &DriverKind,
        driver: Option<&str>,
        client: &ApiClient,
    ) -> Result<Option<Box<T>>, ApiError>
    where
        T: ?Sized + 'static,
    {
        let Some(driver) = driver else {
            return Ok(None);
        };

        let resolved = kind.resolve(driver);
        let entry = self
            .types
            .get(&resolved)
            .ok_or_else(|| ApiError::UnsupportedDriver {
                driver: driver.to_string(),
                resolved: resolved.clone(),
            })?;

        let factory = entry
            .factories
            .get(&TypeId::of::<T>())
            .and_then(|f| f.downcast_ref::<Factory<T>>())
            .ok_or_else(|| ApiError::UnsupportedInterface {
                driver: driver.to_string(),
                capability: kind.capability.to_string(),
            })?;

        debug!(driver, resolved = %resolved, "building driver");
        Ok(Some((**factory)(client)))
    }
}
