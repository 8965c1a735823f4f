//! Lookups of existing records.
//!
//! A prototype record supplies the resource definition; results are new
//! records of the same resource.

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::ApiClient;
use crate::collection::Collection;
use crate::conditions::{QueryCondition, QueryResultOrder};
use crate::error::ApiError;
use crate::model::Model;

/// Fetches one record by identity.
#[derive(Debug, Clone, Copy)]
pub struct InstanceFinder<'a> {
    client: &'a ApiClient,
}

impl<'a> InstanceFinder<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// `Ok(None)` when the response is classified as not found or as an
    /// error. Any status outside the configured rules is `UnexpectedStatus`.
    pub fn find(
        &self,
        prototype: &Model,
        id: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<Model>, ApiError> {
        let settings = &self.client.settings().request;
        let placeholder = format!(":{}", prototype.identity_property());
        let uri = self
            .client
            .url_generator()
            .instance_uri(prototype, &[(placeholder.as_str(), id)]);

        let mut request = self.client.request()?;
        request.create_request(&settings.base_uri, &uri, "GET", &[], None)?;
        if let Some(authenticator) = self.client.authenticator()? {
            request.authenticate(authenticator.as_ref())?;
        }
        request.set_get_parameters(params)?;

        let response = request.send_request()?;
        let interpreter = self.client.interpreter()?;

        if interpreter.success(&response) {
            let data = request.transporter()?.parse_response_to_data(&response)?;
            return hydrate(prototype, &data).map(Some);
        }
        if interpreter.not_found(&response) || interpreter.error(&response) {
            debug!(uri = %uri, status = response.status, "record not found");
            return Ok(None);
        }
        Err(ApiError::UnexpectedStatus {
            status: response.status,
            body: response.body,
        })
    }
}

/// Fetches the collection of a resource.
#[derive(Debug, Clone, Copy)]
pub struct CollectionFinder<'a> {
    client: &'a ApiClient,
}

impl<'a> CollectionFinder<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// With a collection key configured the records are read from that key
    /// and every other top-level key becomes metadata; otherwise the body
    /// must be the array of records.
    pub fn find(
        &self,
        prototype: &Model,
        condition: Option<&dyn QueryCondition>,
        order: Option<&dyn QueryResultOrder>,
        params: &[(&str, &str)],
    ) -> Result<Collection, ApiError> {
        let settings = self.client.settings();
        let uri = self.client.url_generator().collection_uri(prototype, &[]);

        let mut request = self.client.request()?;
        request.create_request(&settings.request.base_uri, &uri, "GET", &[], None)?;
        if let Some(authenticator) = self.client.authenticator()? {
            request.authenticate(authenticator.as_ref())?;
        }
        if let Some(condition) = condition {
            request.add_query_condition(condition)?;
        }
        if let Some(order) = order {
            request.add_query_result_order(order)?;
        }
        request.set_get_parameters(params)?;

        let response = request.send_request()?;
        if !self.client.interpreter()?.success(&response) {
            return Err(ApiError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }

        let data = request.transporter()?.parse_response_to_data(&response)?;
        let (items, meta_data) = match settings.resource.collection_key.as_deref() {
            Some(key) => unwrap_collection(data, key)?,
            None => (data, Map::new()),
        };

        let records = match items {
            Value::Array(items) => items
                .iter()
                .map(|item| hydrate(prototype, item))
                .collect::<Result<Vec<_>, _>>()?,
            Value::Null => Vec::new(),
            other => {
                return Err(ApiError::Deserialization(format!(
                    "expected an array of records, got {other}"
                )))
            }
        };
        debug!(uri = %uri, records = records.len(), "fetched collection");
        Ok(Collection::new(records).with_meta_data(meta_data))
    }
}

fn unwrap_collection(data: Value, key: &str) -> Result<(Value, Map<String, Value>), ApiError> {
    let Value::Object(mut body) = data else {
        return Err(ApiError::MissingCollectionKey(key.to_string()));
    };
    let items = body
        .remove(key)
        .ok_or_else(|| ApiError::MissingCollectionKey(key.to_string()))?;
    Ok((items, body))
}

/// A new record from decoded data, identity applied past the guard.
fn hydrate(prototype: &Model, data: &Value) -> Result<Model, ApiError> {
    let Value::Object(attributes) = data else {
        return Err(ApiError::Deserialization(format!(
            "expected a record object, got {data}"
        )));
    };
    let mut record = prototype.new_instance(attributes)?;
    record.apply_identity(attributes);
    Ok(record)
}
