//! Local records of remote resources.
//!
//! # Design
//! A `Model` is an attribute map plus the `ResourceDefinition` that says how
//! to treat each attribute:
//! - the identity attribute (and any other guarded attribute) is skipped by
//!   `fill` and only changes through `set`;
//! - file fields hold a path on disk and go out as file parts;
//! - read-only fields are kept locally but never sent.
//!
//! Any attribute whose name contains the base64 marker (`avatar_base64`)
//! and names a file field once the marker is removed is decoded into a
//! temporary file. The file field then holds that file's path. Temporary
//! files live until the next `save` or `destroy` finishes, whatever its
//! outcome.
//!
//! Records do not own a client; every remote operation takes one.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::collection::Collection;
use crate::conditions::{QueryCondition, QueryResultOrder};
use crate::config::ResourceSettings;
use crate::error::ApiError;
use crate::finders::{CollectionFinder, InstanceFinder};
use crate::scratch;

/// Schema of one remote resource, shared by all its records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDefinition {
    /// Type-style name, e.g. `BlogPost`. Drives the default path.
    pub resource_name: String,
    /// Collection path overriding the one derived from the name.
    pub uri: Option<String>,
    pub identity_property: Option<String>,
    pub guarded: Vec<String>,
    pub file_fields: Vec<String>,
    pub read_only_fields: Vec<String>,
    pub scratch_disk_location: Option<PathBuf>,
    pub base64_indicator: Option<String>,
    /// Parent resources, e.g. `Company:company_id,Employee:10`.
    pub nested_under: Option<String>,
}

impl ResourceDefinition {
    pub fn new(resource_name: &str) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    pub fn with_identity_property(mut self, property: &str) -> Self {
        self.identity_property = Some(property.to_string());
        self
    }

    /// Comma separated attribute names.
    pub fn guarded(mut self, fields: &str) -> Self {
        self.guarded = split_fields(fields);
        self
    }

    pub fn file_fields(mut self, fields: &str) -> Self {
        self.file_fields = split_fields(fields);
        self
    }

    pub fn read_only_fields(mut self, fields: &str) -> Self {
        self.read_only_fields = split_fields(fields);
        self
    }

    pub fn with_scratch_disk_location(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_disk_location = Some(dir.into());
        self
    }

    pub fn with_base64_indicator(mut self, marker: &str) -> Self {
        self.base64_indicator = Some(marker.to_string());
        self
    }

    pub fn nested_under(mut self, parents: &str) -> Self {
        self.nested_under = Some(parents.to_string());
        self
    }
}

fn split_fields(fields: &str) -> Vec<String> {
    fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// One record of a remote resource.
#[derive(Debug, Clone)]
pub struct Model {
    definition: Arc<ResourceDefinition>,
    identity_property: String,
    base64_indicator: String,
    scratch_disk_location: PathBuf,
    nested_under: Option<String>,
    attributes: Map<String, Value>,
    errors: Vec<String>,
    temp_files: Vec<PathBuf>,
}

impl Model {
    /// An empty record. Definition overrides win over `settings`.
    pub fn new(definition: Arc<ResourceDefinition>, settings: &ResourceSettings) -> Self {
        let identity_property = definition
            .identity_property
            .clone()
            .unwrap_or_else(|| settings.identity_property.clone());
        let base64_indicator = definition
            .base64_indicator
            .clone()
            .unwrap_or_else(|| settings.base64_indicator.clone());
        let scratch_disk_location = definition
            .scratch_disk_location
            .clone()
            .unwrap_or_else(|| settings.scratch_disk_location.clone());
        let nested_under = definition.nested_under.clone();

        Self {
            definition,
            identity_property,
            base64_indicator,
            scratch_disk_location,
            nested_under,
            attributes: Map::new(),
            errors: Vec::new(),
            temp_files: Vec::new(),
        }
    }

    /// A record of the same resource filled from `attributes`.
    pub fn new_instance(&self, attributes: &Map<String, Value>) -> Result<Model, ApiError> {
        let mut model = Model {
            attributes: Map::new(),
            errors: Vec::new(),
            temp_files: Vec::new(),
            ..self.clone()
        };
        model.fill(attributes)?;
        Ok(model)
    }

    /// Fetch one record by identity. `None` when the server reports it
    /// missing or fails.
    pub fn find(
        client: &ApiClient,
        definition: &Arc<ResourceDefinition>,
        id: impl fmt::Display,
        params: &[(&str, &str)],
    ) -> Result<Option<Model>, ApiError> {
        InstanceFinder::new(client).find(&client.model(definition), &id.to_string(), params)
    }

    /// Fetch the collection, optionally filtered and ordered.
    pub fn all(
        client: &ApiClient,
        definition: &Arc<ResourceDefinition>,
        condition: Option<&dyn QueryCondition>,
        order: Option<&dyn QueryResultOrder>,
        params: &[(&str, &str)],
    ) -> Result<Collection, ApiError> {
        CollectionFinder::new(client).find(&client.model(definition), condition, order, params)
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    pub fn identity_property(&self) -> &str {
        &self.identity_property
    }

    pub fn nested_under(&self) -> Option<&str> {
        self.nested_under.as_deref()
    }

    /// Override the parent resources for this record only.
    pub fn set_nested_under(&mut self, parents: Option<&str>) {
        self.nested_under = parents.map(String::from);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Assign one attribute. Guarded attributes may be set this way.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ApiError> {
        let value = value.into();
        if !self.materialize_base64(name, &value)? {
            self.attributes.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Bulk assignment. Guarded attributes are skipped, as are file fields
    /// given directly rather than through their base64 form.
    pub fn fill(&mut self, attributes: &Map<String, Value>) -> Result<(), ApiError> {
        for (name, value) in attributes {
            if self.is_guarded(name) || self.materialize_base64(name, value)? {
                continue;
            }
            if self.is_file_field(name) {
                debug!(attribute = %name, "skipping file field in bulk fill");
                continue;
            }
            self.attributes.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Messages from the last rejected `save` or `destroy`.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The identity value; `Null` counts as absent.
    pub fn id(&self) -> Option<&Value> {
        self.attributes
            .get(&self.identity_property)
            .filter(|value| !value.is_null())
    }

    /// Attributes that may be sent, i.e. everything not read-only.
    pub fn mutable_fields(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .filter(|(name, _)| !self.definition.read_only_fields.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// The identity attribute followed by the declared guarded attributes.
    pub fn guarded_attributes(&self) -> Vec<&str> {
        let mut guarded = vec![self.identity_property.as_str()];
        for name in &self.definition.guarded {
            if !guarded.contains(&name.as_str()) {
                guarded.push(name);
            }
        }
        guarded
    }

    pub fn file_fields(&self) -> &[String] {
        &self.definition.file_fields
    }

    pub fn read_only_fields(&self) -> &[String] {
        &self.definition.read_only_fields
    }

    /// Temporary files waiting for the next cleanup.
    pub fn temp_files(&self) -> &[PathBuf] {
        &self.temp_files
    }

    /// Create or update the remote record.
    ///
    /// `Ok(false)` means the server refused; `errors()` holds its messages
    /// when the response was classified as invalid.
    pub fn save(&mut self, client: &ApiClient) -> Result<bool, ApiError> {
        let outcome = self.persist(client);
        self.post_request_cleanup();
        outcome
    }

    /// Delete the remote record.
    pub fn destroy(&mut self, client: &ApiClient) -> Result<bool, ApiError> {
        let outcome = self.delete_remote(client);
        self.post_request_cleanup();
        outcome
    }

    /// Remove every temporary file this record created.
    pub fn post_request_cleanup(&mut self) {
        scratch::remove_all(&mut self.temp_files);
    }

    /// Set the identity from decoded response data, bypassing the guard.
    pub(crate) fn apply_identity(&mut self, data: &Map<String, Value>) {
        if let Some(id) = data.get(&self.identity_property) {
            self.attributes
                .insert(self.identity_property.clone(), id.clone());
        }
    }

    fn persist(&mut self, client: &ApiClient) -> Result<bool, ApiError> {
        self.errors.clear();
        let settings = &client.settings().request;
        let urls = client.url_generator();
        let method_param = settings.http_method_param.as_deref();

        let mut request = client.request()?;
        if self.id().is_some() {
            let uri = urls.update_uri(self, &[]);
            request.create_request(&settings.base_uri, &uri, "PUT", &[], method_param)?;
        } else {
            let uri = urls.create_uri(self, &[]);
            request.create_request(&settings.base_uri, &uri, "POST", &[], method_param)?;
        }
        if let Some(authenticator) = client.authenticator()? {
            request.authenticate(authenticator.as_ref())?;
        }
        request.set_model_properties(self)?;

        let response = request.send_request()?;
        let interpreter = client.interpreter()?;

        if interpreter.success(&response) {
            if let Value::Object(data) = request.transporter()?.parse_response_to_data(&response)? {
                self.fill(&data)?;
                self.apply_identity(&data);
            }
            return Ok(true);
        }
        if interpreter.invalid(&response) {
            self.errors = client
                .error_handler()?
                .parse_errors(&response, request.transporter()?)?;
            return Ok(false);
        }

        warn!(
            resource = %self.definition.resource_name,
            status = response.status,
            "save failed"
        );
        Ok(false)
    }

    fn delete_remote(&mut self, client: &ApiClient) -> Result<bool, ApiError> {
        self.errors.clear();
        if self.id().is_none() {
            return Err(ApiError::MissingIdentity(self.identity_property.clone()));
        }
        let settings = &client.settings().request;
        let uri = client.url_generator().delete_uri(self, &[]);

        let mut request = client.request()?;
        request.create_request(
            &settings.base_uri,
            &uri,
            "DELETE",
            &[],
            settings.http_method_param.as_deref(),
        )?;
        if let Some(authenticator) = client.authenticator()? {
            request.authenticate(authenticator.as_ref())?;
        }

        let response = request.send_request()?;
        let interpreter = client.interpreter()?;

        if interpreter.success(&response) {
            return Ok(true);
        }
        if interpreter.invalid(&response) {
            self.errors = client
                .error_handler()?
                .parse_errors(&response, request.transporter()?)?;
            return Ok(false);
        }

        warn!(
            resource = %self.definition.resource_name,
            status = response.status,
            "destroy failed"
        );
        Ok(false)
    }

    fn is_guarded(&self, name: &str) -> bool {
        name == self.identity_property || self.definition.guarded.iter().any(|g| g == name)
    }

    fn is_file_field(&self, name: &str) -> bool {
        self.definition.file_fields.iter().any(|f| f == name)
    }

    /// Handle `name` as a base64 attribute if it carries the marker.
    /// Returns whether it did.
    fn materialize_base64(&mut self, name: &str, value: &Value) -> Result<bool, ApiError> {
        let Some(property) = self.strip_base64_marker(name) else {
            return Ok(false);
        };
        if !self.is_file_field(&property) {
            debug!(attribute = %name, "base64 attribute does not name a file field");
            return Ok(true);
        }
        let Some(encoded) = value.as_str() else {
            debug!(attribute = %name, "base64 attribute is not a string");
            return Ok(true);
        };

        let path = scratch::write_base64_file(&self.scratch_disk_location, &property, encoded)?;
        self.attributes
            .insert(property, Value::String(path.to_string_lossy().into_owned()));
        self.temp_files.push(path);
        Ok(true)
    }

    /// `avatar_BASE64` → `avatar`. The marker match ignores ASCII case.
    fn strip_base64_marker(&self, name: &str) -> Option<String> {
        if self.base64_indicator.is_empty() {
            return None;
        }
        let start = name
            .to_ascii_lowercase()
            .find(&self.base64_indicator.to_ascii_lowercase())?;
        let end = start + self.base64_indicator.len();
        Some(format!("{}{}", &name[..start], &name[end..]))
    }
}
