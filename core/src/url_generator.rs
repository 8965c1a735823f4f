//! Resource paths.
//!
//! A resource named `BlogPost` lives at `{path_prefix}blog_posts` and one
//! record at `{path_prefix}blog_posts/:id`. Segments starting with `:` are
//! placeholders, filled from caller options first and then from the
//! record's own attributes. Filled values are percent-encoded as a single
//! path segment.

use heck::ToSnakeCase;
use serde_json::Value;
use url::form_urlencoded;

use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlGenerator {
    path_prefix: String,
}

impl UrlGenerator {
    pub fn new(path_prefix: &str) -> Self {
        Self {
            path_prefix: path_prefix.to_string(),
        }
    }

    /// Collection path, without placeholder substitution.
    pub fn uri(&self, model: &Model) -> String {
        let definition = model.definition();
        let uri = match &definition.uri {
            Some(uri) => uri.trim_start_matches('/').to_string(),
            None => resource_segment(&definition.resource_name),
        };

        let mut segments: Vec<String> = Vec::new();
        if let Some(nested) = model.nested_under() {
            for parent in nested.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (name, key) = parent.split_once(':').unwrap_or((parent, ""));
                segments.push(resource_segment(name.trim()));
                let key = key.trim();
                if !key.is_empty() {
                    if key.chars().all(|c| c.is_ascii_digit()) {
                        segments.push(key.to_string());
                    } else {
                        segments.push(format!(":{key}"));
                    }
                }
            }
        }
        segments.push(uri);

        format!("{}{}", self.path_prefix, segments.join("/"))
    }

    pub fn collection_uri(&self, model: &Model, options: &[(&str, &str)]) -> String {
        fill_placeholders(&self.uri(model), model, options)
    }

    pub fn instance_uri(&self, model: &Model, options: &[(&str, &str)]) -> String {
        let uri = format!("{}/:{}", self.uri(model), model.identity_property());
        fill_placeholders(&uri, model, options)
    }

    pub fn create_uri(&self, model: &Model, options: &[(&str, &str)]) -> String {
        self.collection_uri(model, options)
    }

    pub fn update_uri(&self, model: &Model, options: &[(&str, &str)]) -> String {
        self.instance_uri(model, options)
    }

    pub fn delete_uri(&self, model: &Model, options: &[(&str, &str)]) -> String {
        self.instance_uri(model, options)
    }
}

/// `BlogPost` → `blog_posts`.
fn resource_segment(name: &str) -> String {
    let snake = name.to_snake_case();
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralize(last)),
        None => pluralize(&snake),
    }
}

fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.is_empty() && !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{word}es");
    }
    format!("{word}s")
}

fn fill_placeholders(uri: &str, model: &Model, options: &[(&str, &str)]) -> String {
    uri.split('/')
        .map(|segment| {
            let Some(name) = segment.strip_prefix(':') else {
                return segment.to_string();
            };
            if let Some((_, value)) = options.iter().find(|(key, _)| *key == segment) {
                return encode_segment(value);
            }
            match model.get(name) {
                Some(Value::String(s)) => encode_segment(s),
                Some(Value::Null) | None => segment.to_string(),
                Some(other) => encode_segment(&other.to_string()),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Form encoding escapes everything but `[A-Za-z0-9*-._]`; its `+` for a
/// space is swapped for `%20`, which is what a path expects. A literal `+`
/// is already `%2B` at this point.
fn encode_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceSettings;
    use crate::model::ResourceDefinition;
    use std::sync::Arc;

    fn model(definition: ResourceDefinition) -> Model {
        Model::new(Arc::new(definition), &ResourceSettings::default())
    }

    #[test]
    fn pluralizes_snake_case_names() {
        assert_eq!(resource_segment("User"), "users");
        assert_eq!(resource_segment("BlogPost"), "blog_posts");
        assert_eq!(resource_segment("Company"), "companies");
        assert_eq!(resource_segment("Address"), "addresses");
        assert_eq!(resource_segment("Day"), "days");
        assert_eq!(resource_segment("Box"), "boxes");
    }

    #[test]
    fn collection_and_instance_paths() {
        let urls = UrlGenerator::new("/");
        let user = model(ResourceDefinition::new("User"));
        assert_eq!(urls.collection_uri(&user, &[]), "/users");
        assert_eq!(urls.instance_uri(&user, &[(":id", "1234")]), "/users/1234");
    }

    #[test]
    fn instance_path_uses_record_identity() {
        let urls = UrlGenerator::new("/api/");
        let mut user = model(ResourceDefinition::new("User"));
        user.set("id", 7).unwrap();
        assert_eq!(urls.update_uri(&user, &[]), "/api/users/7");
    }

    #[test]
    fn custom_identity_property() {
        let urls = UrlGenerator::new("/");
        let mut user = model(ResourceDefinition::new("User").with_identity_property("uuid"));
        user.set("uuid", "abc-123").unwrap();
        assert_eq!(urls.delete_uri(&user, &[]), "/users/abc-123");
    }

    #[test]
    fn uri_override_wins() {
        let urls = UrlGenerator::new("/");
        let person = model(ResourceDefinition::new("Person").with_uri("/people"));
        assert_eq!(urls.collection_uri(&person, &[]), "/people");
    }

    #[test]
    fn nesting_fills_from_attributes_and_literals() {
        let urls = UrlGenerator::new("/");
        let mut user = model(
            ResourceDefinition::new("User").nested_under("Company:company_id,Employee:10"),
        );
        assert_eq!(urls.uri(&user), "/companies/:company_id/employees/10/users");

        user.set("company_id", 3).unwrap();
        assert_eq!(urls.create_uri(&user, &[]), "/companies/3/employees/10/users");
    }

    #[test]
    fn unfilled_placeholders_stay() {
        let urls = UrlGenerator::new("/");
        let user = model(ResourceDefinition::new("User"));
        assert_eq!(urls.instance_uri(&user, &[]), "/users/:id");
    }

    #[test]
    fn filled_values_are_escaped_as_one_segment() {
        let urls = UrlGenerator::new("/");
        let user = model(ResourceDefinition::new("User"));
        assert_eq!(
            urls.instance_uri(&user, &[(":id", "john doe/../admin?x=1#top")]),
            "/users/john%20doe%2F..%2Fadmin%3Fx%3D1%23top"
        );
        assert_eq!(urls.instance_uri(&user, &[(":id", "a+b")]), "/users/a%2Bb");
    }

    #[test]
    fn attribute_values_are_escaped_too() {
        let urls = UrlGenerator::new("/");
        let mut user = model(ResourceDefinition::new("User").nested_under("Company:company_id"));
        user.set("company_id", "acme/east").unwrap();
        user.set("id", "x y").unwrap();
        assert_eq!(urls.update_uri(&user, &[]), "/companies/acme%2Feast/users/x%20y");
    }
}
