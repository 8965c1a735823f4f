//! Client configuration.
//!
//! Every key has a default, so an empty file (or no file at all) yields a
//! usable `Settings`. Values are layered: an optional file first, then
//! environment variables prefixed with `RESOURCE` using `__` as the section
//! separator (`RESOURCE_REQUEST__BASE_URI=http://api.local`).

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const ENV_PREFIX: &str = "RESOURCE";

/// Root configuration, one section per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub request: RequestSettings,
    pub auth: AuthSettings,
    pub transporter: TransporterSettings,
    pub response: ResponseSettings,
    pub error_handler: ErrorHandlerSettings,
    pub query_condition: QueryConditionSettings,
    pub result_order: ResultOrderSettings,
    pub resource: ResourceSettings,
}

impl Settings {
    /// Load from an optional file plus the environment.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from an inline TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ApiError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    /// Protocol and host every request is made against.
    pub base_uri: String,
    /// Prepended to generated resource paths.
    pub path_prefix: String,
    pub driver: String,
    /// Form field used to tunnel PUT/PATCH/DELETE through POST.
    pub http_method_param: Option<String>,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            base_uri: "http://example.com".to_string(),
            path_prefix: "/".to_string(),
            driver: "rest".to_string(),
            http_method_param: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// `None` means requests go out unauthenticated.
    pub driver: Option<String>,
    pub basic: BasicAuthSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicAuthSettings {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransporterSettings {
    pub driver: String,
}

impl Default for TransporterSettings {
    fn default() -> Self {
        Self {
            driver: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSettings {
    pub driver: String,
    pub http_status: HttpStatusRules,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            driver: "http_status_code".to_string(),
            http_status: HttpStatusRules::default(),
        }
    }
}

/// Status-code rule per outcome category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStatusRules {
    pub success: StatusRule,
    pub not_found: StatusRule,
    pub invalid: StatusRule,
    pub error: StatusRule,
}

impl Default for HttpStatusRules {
    fn default() -> Self {
        Self {
            success: StatusRule::List(vec![200, 201]),
            not_found: StatusRule::Code(404),
            invalid: StatusRule::Code(422),
            error: StatusRule::Code(500),
        }
    }
}

/// A configured status-code rule: one code, a set of codes, or a glob
/// such as `"2*"` or `"40?"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusRule {
    Code(u16),
    List(Vec<u16>),
    Pattern(String),
}

impl StatusRule {
    /// Exact and list membership first; strings fall back to glob matching
    /// against the decimal status code.
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusRule::Code(code) => *code == status,
            StatusRule::List(codes) => codes.contains(&status),
            StatusRule::Pattern(pattern) => glob::Pattern::new(pattern)
                .map(|p| p.matches(&status.to_string()))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlerSettings {
    pub driver: String,
    /// Key holding the error list for the `parameter_key` driver.
    pub errors_key: Option<String>,
}

impl Default for ErrorHandlerSettings {
    fn default() -> Self {
        Self {
            driver: "array_response".to_string(),
            errors_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConditionSettings {
    pub driver: String,
    pub get_array_params: GetArrayParamsSettings,
}

impl Default for QueryConditionSettings {
    fn default() -> Self {
        Self {
            driver: "get_array_params".to_string(),
            get_array_params: GetArrayParamsSettings::default(),
        }
    }
}

/// Parameter names for `search[i][property]=...` style conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetArrayParamsSettings {
    pub container_parameter: String,
    pub property: String,
    pub operator: String,
    pub value: String,
    pub logical_operator: String,
    pub and_operator: String,
    pub or_operator: String,
}

impl Default for GetArrayParamsSettings {
    fn default() -> Self {
        Self {
            container_parameter: "search".to_string(),
            property: "property".to_string(),
            operator: "operator".to_string(),
            value: "value".to_string(),
            logical_operator: "logical_operator".to_string(),
            and_operator: "AND".to_string(),
            or_operator: "OR".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultOrderSettings {
    pub driver: String,
    pub get_params: GetParamsSettings,
}

impl Default for ResultOrderSettings {
    fn default() -> Self {
        Self {
            driver: "get_params".to_string(),
            get_params: GetParamsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetParamsSettings {
    pub order_by: String,
    pub order_dir: String,
    pub order_dir_ascending: String,
    pub order_dir_descending: String,
}

impl Default for GetParamsSettings {
    fn default() -> Self {
        Self {
            order_by: "order_by".to_string(),
            order_dir: "order_dir".to_string(),
            order_dir_ascending: "ASC".to_string(),
            order_dir_descending: "DESC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    pub identity_property: String,
    /// Response key wrapping collection payloads, if the API wraps them.
    pub collection_key: Option<String>,
    #[serde(rename = "base_64_property_indication")]
    pub base64_indicator: String,
    pub scratch_disk_location: PathBuf,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            identity_property: "id".to_string(),
            collection_key: None,
            base64_indicator: "_base64".to_string(),
            scratch_disk_location: PathBuf::from("/tmp"),
        }
    }
}
