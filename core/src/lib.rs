//! Map local records onto resources of a remote JSON API.
//!
//! # Overview
//! A `Model` stands for one remote record. Finding, listing, saving and
//! destroying it each become one HTTP round-trip assembled by `RestRequest`
//! and carried by a `Transport` the host supplies. The core itself never
//! opens a socket unless the default `ureq` feature's `UreqTransport` is
//! used.
//!
//! # Design
//! - Every swappable strategy (wire format, authentication, query encoding,
//!   ordering, response classification, error extraction) is a driver
//!   picked by name from `Settings` and built through the `DriverRegistry`.
//! - `ApiClient` carries settings, registry and transport explicitly; there
//!   is no global state.
//! - Expected remote outcomes are values: a missing record is `Ok(None)`, a
//!   rejected save is `Ok(false)` with messages on the record. `Err` is kept
//!   for configuration mistakes and transport failures.

pub mod auth;
pub mod client;
pub mod collection;
pub mod conditions;
pub mod config;
pub mod driver;
pub mod error;
pub mod error_handler;
pub mod finders;
pub mod http;
pub mod interpreter;
pub mod model;
pub mod request;
pub mod response;
pub mod scratch;
pub mod transport;
pub mod transporter;
pub mod url_generator;

pub use client::ApiClient;
pub use collection::Collection;
pub use self::config::{Settings, StatusRule};
pub use driver::{DriverRegistry, DriverKind};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use model::{Model, ResourceDefinition};
pub use request::RestRequest;
pub use response::RawResponse;
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
