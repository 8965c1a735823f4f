//! Query conditions and result ordering for collection lookups.
//!
//! # Design
//! Both are pure accumulators: callers add predicates or ordering, and the
//! driver writes them into a request's query string. `to_params` exposes
//! the same parameter set without a live request, for raw requests and for
//! inspection.

use url::form_urlencoded;

use crate::config::{GetArrayParamsSettings, GetParamsSettings};
use crate::error::ApiError;
use crate::http::HttpRequest;

/// Filter predicates for a collection request.
pub trait QueryCondition {
    /// Operators are passed through verbatim; the remote API defines them.
    fn add_condition(&mut self, property: &str, operator: &str, value: &str);

    /// Accepts exactly the configured AND or OR token.
    fn set_logical_operator(&mut self, operator: &str) -> Result<(), ApiError>;

    fn logical_operator_and(&self) -> &str;

    fn logical_operator_or(&self) -> &str;

    fn add_to_request(&self, request: &mut HttpRequest) {
        for (key, value) in self.to_params() {
            request.add_query(&key, &value);
        }
    }

    fn to_params(&self) -> Vec<(String, String)>;

    fn to_query_string(&self) -> String {
        encode(&self.to_params())
    }
}

/// Sort directives for a collection request.
pub trait QueryResultOrder {
    fn set_order_by_field(&mut self, field: &str);

    /// Accepts exactly the configured ascending or descending token.
    fn set_order_direction(&mut self, direction: &str) -> Result<(), ApiError>;

    fn order_direction_ascending(&self) -> &str;

    fn order_direction_descending(&self) -> &str;

    fn add_to_request(&self, request: &mut HttpRequest) {
        for (key, value) in self.to_params() {
            request.add_query(&key, &value);
        }
    }

    fn to_params(&self) -> Vec<(String, String)>;

    fn to_query_string(&self) -> String {
        encode(&self.to_params())
    }
}

fn encode(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Condition {
    property: String,
    operator: String,
    value: String,
}

/// Encodes conditions as indexed array parameters:
/// `search[0][property]=name&search[0][operator]==&search[0][value]=John`.
#[derive(Debug, Clone)]
pub struct GetArrayParamsQueryCondition {
    settings: GetArrayParamsSettings,
    conditions: Vec<Condition>,
    logical_operator: Option<String>,
}

impl GetArrayParamsQueryCondition {
    pub fn new(settings: GetArrayParamsSettings) -> Self {
        Self {
            settings,
            conditions: Vec::new(),
            logical_operator: None,
        }
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl QueryCondition for GetArrayParamsQueryCondition {
    fn add_condition(&mut self, property: &str, operator: &str, value: &str) {
        self.conditions.push(Condition {
            property: property.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        });
    }

    fn set_logical_operator(&mut self, operator: &str) -> Result<(), ApiError> {
        if operator != self.settings.and_operator && operator != self.settings.or_operator {
            return Err(ApiError::InvalidOperator(operator.to_string()));
        }
        self.logical_operator = Some(operator.to_string());
        Ok(())
    }

    fn logical_operator_and(&self) -> &str {
        &self.settings.and_operator
    }

    fn logical_operator_or(&self) -> &str {
        &self.settings.or_operator
    }

    fn to_params(&self) -> Vec<(String, String)> {
        let s = &self.settings;
        let container = &s.container_parameter;
        let mut params = Vec::with_capacity(self.conditions.len() * 3 + 1);

        for (i, condition) in self.conditions.iter().enumerate() {
            params.push((format!("{container}[{i}][{}]", s.property), condition.property.clone()));
            params.push((format!("{container}[{i}][{}]", s.operator), condition.operator.clone()));
            params.push((format!("{container}[{i}][{}]", s.value), condition.value.clone()));
        }

        if let Some(op) = &self.logical_operator {
            params.push((s.logical_operator.clone(), op.clone()));
        }

        params
    }
}

/// Encodes ordering as two plain parameters: `order_by=name&order_dir=ASC`.
#[derive(Debug, Clone)]
pub struct GetParamsResultOrder {
    settings: GetParamsSettings,
    order_by: Option<String>,
    direction: Option<String>,
}

impl GetParamsResultOrder {
    pub fn new(settings: GetParamsSettings) -> Self {
        Self {
            settings,
            order_by: None,
            direction: None,
        }
    }
}

impl QueryResultOrder for GetParamsResultOrder {
    fn set_order_by_field(&mut self, field: &str) {
        self.order_by = Some(field.to_string());
    }

    fn set_order_direction(&mut self, direction: &str) -> Result<(), ApiError> {
        if direction != self.settings.order_dir_ascending
            && direction != self.settings.order_dir_descending
        {
            return Err(ApiError::InvalidDirection(direction.to_string()));
        }
        self.direction = Some(direction.to_string());
        Ok(())
    }

    fn order_direction_ascending(&self) -> &str {
        &self.settings.order_dir_ascending
    }

    fn order_direction_descending(&self) -> &str {
        &self.settings.order_dir_descending
    }

    /// Setters that were never called contribute nothing.
    fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(field) = &self.order_by {
            params.push((self.settings.order_by.clone(), field.clone()));
        }
        if let Some(direction) = &self.direction {
            params.push((self.settings.order_dir.clone(), direction.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use proptest::prelude::*;

    fn condition() -> GetArrayParamsQueryCondition {
        GetArrayParamsQueryCondition::new(GetArrayParamsSettings::default())
    }

    fn order() -> GetParamsResultOrder {
        GetParamsResultOrder::new(GetParamsSettings::default())
    }

    #[test]
    fn conditions_keep_insertion_order() {
        let mut c = condition();
        c.add_condition("name", "=", "John");
        c.add_condition("age", ">=", "21");
        c.set_logical_operator("OR").unwrap();

        assert_eq!(
            c.to_params(),
            vec![
                ("search[0][property]".to_string(), "name".to_string()),
                ("search[0][operator]".to_string(), "=".to_string()),
                ("search[0][value]".to_string(), "John".to_string()),
                ("search[1][property]".to_string(), "age".to_string()),
                ("search[1][operator]".to_string(), ">=".to_string()),
                ("search[1][value]".to_string(), "21".to_string()),
                ("logical_operator".to_string(), "OR".to_string()),
            ]
        );
    }

    #[test]
    fn conditions_use_configured_names() {
        let settings = GetArrayParamsSettings {
            container_parameter: "q".to_string(),
            property: "p".to_string(),
            operator: "o".to_string(),
            value: "v".to_string(),
            logical_operator: "combine".to_string(),
            and_operator: "all".to_string(),
            or_operator: "any".to_string(),
        };
        let mut c = GetArrayParamsQueryCondition::new(settings);
        c.add_condition("name", "LIKE", "Jo%");
        c.set_logical_operator("all").unwrap();
        assert_eq!(
            c.to_query_string(),
            "q%5B0%5D%5Bp%5D=name&q%5B0%5D%5Bo%5D=LIKE&q%5B0%5D%5Bv%5D=Jo%25&combine=all"
        );
    }

    #[test]
    fn rejects_unknown_logical_operator() {
        let mut c = condition();
        let err = c.set_logical_operator("XOR").unwrap_err();
        assert!(matches!(err, ApiError::InvalidOperator(op) if op == "XOR"));
        assert!(c.to_params().is_empty());
    }

    #[test]
    fn logical_operator_is_case_sensitive() {
        let mut c = condition();
        assert!(c.set_logical_operator("and").is_err());
        let and = c.logical_operator_and().to_string();
        assert!(c.set_logical_operator(&and).is_ok());
    }

    #[test]
    fn add_to_request_appends_query() {
        let mut c = condition();
        c.add_condition("name", "=", "John");
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        c.add_to_request(&mut req);
        assert_eq!(req.query_value("search[0][value]"), Some("John"));
        assert_eq!(req.query.len(), 3);
    }

    #[test]
    fn order_omits_unset_parameters() {
        let mut o = order();
        assert!(o.to_params().is_empty());

        o.set_order_by_field("name");
        assert_eq!(o.to_query_string(), "order_by=name");

        o.set_order_direction("DESC").unwrap();
        assert_eq!(o.to_query_string(), "order_by=name&order_dir=DESC");
    }

    #[test]
    fn order_direction_only() {
        let mut o = order();
        o.set_order_direction("ASC").unwrap();
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/users");
        o.add_to_request(&mut req);
        assert_eq!(req.query, vec![("order_dir".to_string(), "ASC".to_string())]);
    }

    #[test]
    fn rejects_unknown_direction() {
        let mut o = order();
        let err = o.set_order_direction("UP").unwrap_err();
        assert!(matches!(err, ApiError::InvalidDirection(d) if d == "UP"));
    }

    proptest! {
        #[test]
        fn only_configured_tokens_are_accepted(
            and_token in "[A-Za-z]{1,8}",
            or_token in "[A-Za-z]{1,8}",
            candidate in "[A-Za-z]{0,8}",
        ) {
            let settings = GetArrayParamsSettings {
                and_operator: and_token.clone(),
                or_operator: or_token.clone(),
                ..GetArrayParamsSettings::default()
            };
            let mut c = GetArrayParamsQueryCondition::new(settings);
            prop_assert_eq!(c.logical_operator_and(), and_token.as_str());
            prop_assert_eq!(c.logical_operator_or(), or_token.as_str());

            let accepted = c.set_logical_operator(&candidate).is_ok();
            prop_assert_eq!(accepted, candidate == and_token || candidate == or_token);
        }

        #[test]
        fn condition_keys_are_index_contiguous(
            triples in proptest::collection::vec(("[a-z]{1,6}", "[=<>!]{1,2}", "[a-z0-9]{0,6}"), 0..12)
        ) {
            let mut c = condition();
            for (p, o, v) in &triples {
                c.add_condition(p, o, v);
            }
            let params = c.to_params();
            prop_assert_eq!(params.len(), triples.len() * 3);
            for (i, (p, o, v)) in triples.iter().enumerate() {
                prop_assert_eq!(&params[i * 3], &(format!("search[{i}][property]"), p.clone()));
                prop_assert_eq!(&params[i * 3 + 1], &(format!("search[{i}][operator]"), o.clone()));
                prop_assert_eq!(&params[i * 3 + 2], &(format!("search[{i}][value]"), v.clone()));
            }
        }
    }
}
