//! Resolution of an action identifier to its HTTP shape.

use std::collections::BTreeSet;

use http::Method;

use crate::document::{OperationEntry, SchemaDocument};
use crate::error::{SchemaError, SchemaResult};

/// Where a declared parameter is transmitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    /// Substituted into a `{name}` placeholder of the path.
    Path,
    /// Appended to the query string.
    Query,
}

impl ParameterLocation {
    fn from_openapi(location: &str) -> Option<Self> {
        match location {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            _ => None,
        }
    }
}

/// Declared parameters of an action, split by location.
///
/// Header and cookie parameters are not classified and therefore never
/// substituted automatically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterClassification {
    path: BTreeSet<String>,
    query: BTreeSet<String>,
}

impl ParameterClassification {
    /// Creates an empty classification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` as transmitted in `location`.
    pub fn insert(&mut self, name: impl Into<String>, location: ParameterLocation) {
        let name = name.into();
        match location {
            ParameterLocation::Path => self.path.insert(name),
            ParameterLocation::Query => self.query.insert(name),
        };
    }

    /// Returns `true` when `name` is a path parameter.
    #[must_use]
    pub fn is_path(&self, name: &str) -> bool {
        self.path.contains(name)
    }

    /// Returns `true` when `name` is a query parameter.
    #[must_use]
    pub fn is_query(&self, name: &str) -> bool {
        self.query.contains(name)
    }

    /// Path parameter names.
    pub fn path_parameters(&self) -> impl Iterator<Item = &str> {
        self.path.iter().map(String::as_str)
    }

    /// Query parameter names.
    pub fn query_parameters(&self) -> impl Iterator<Item = &str> {
        self.query.iter().map(String::as_str)
    }
}

/// Whether an action declares a request body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestBodyRequirement {
    /// The body may be omitted.
    Optional,
    /// The body must be sent.
    Required,
}

/// An action resolved against a schema document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAction {
    id: String,
    method: Method,
    path: String,
    parameters: ParameterClassification,
    description: Option<String>,
    request_body: Option<RequestBodyRequirement>,
}

impl ResolvedAction {
    /// Action identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template with `{param}` placeholders.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parameter classification.
    #[must_use]
    pub fn parameters(&self) -> &ParameterClassification {
        &self.parameters
    }

    /// Summary or description of the operation.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared request body, if any.
    #[must_use]
    pub fn request_body(&self) -> Option<RequestBodyRequirement> {
        self.request_body
    }
}

impl SchemaDocument {
    /// Resolves `action` to its method, path, and parameter classification.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ActionNotFound`] when no operation carries the
    /// identifier.
    pub fn resolve(&self, action: &str) -> SchemaResult<ResolvedAction> {
        let entry = self
            .find_operation(action)
            .ok_or_else(|| SchemaError::ActionNotFound {
                action: action.to_owned(),
            })?;

        Ok(ResolvedAction {
            id: action.to_owned(),
            method: entry.method().clone(),
            path: entry.path().to_owned(),
            parameters: self.classify(&entry),
            description: entry.description().map(str::to_owned),
            request_body: self.request_body_requirement(&entry),
        })
    }

    fn classify(&self, entry: &OperationEntry<'_>) -> ParameterClassification {
        let mut classification = ParameterClassification::new();
        for parameter in &entry.operation.parameters {
            let Some(parameter) = self.resolve_parameter(parameter) else {
                continue;
            };
            if let Some(location) = ParameterLocation::from_openapi(&parameter.location) {
                classification.insert(parameter.name.clone(), location);
            }
        }
        classification
    }

    fn request_body_requirement(
        &self,
        entry: &OperationEntry<'_>,
    ) -> Option<RequestBodyRequirement> {
        let body = entry.operation.request_body.as_ref()?;
        // An unresolvable body reference is treated as required.
        let required = self.resolve_request_body(body).is_none_or(|body| body.required);
        Some(if required {
            RequestBodyRequirement::Required
        } else {
            RequestBodyRequirement::Optional
        })
    }
}

/// Parses `schema` and resolves `action` in one step.
///
/// # Errors
///
/// Returns [`SchemaError::Parse`] for malformed documents and
/// [`SchemaError::ActionNotFound`] when the action is absent.
pub fn resolve_action(schema: &str, action: &str) -> SchemaResult<ResolvedAction> {
    SchemaDocument::parse(schema)?.resolve(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECTS: &str = r##"{
        "openapi": "3.0.0",
        "info": { "title": "Projects", "version": "1.0.0" },
        "paths": {
            "/projects/{projectId}": {
                "get": {
                    "operationId": "getProject",
                    "summary": "Get a project",
                    "parameters": [
                        { "name": "projectId", "in": "path", "required": true },
                        { "name": "X-Request-Id", "in": "header" },
                        { "$ref": "#/components/parameters/Verbose" }
                    ]
                },
                "put": {
                    "operationId": "updateProject",
                    "requestBody": { "required": true, "content": {} }
                }
            },
            "/users/findByStatus": {
                "get": {
                    "operationId": "findUsers",
                    "parameters": [ { "name": "status", "in": "query" } ],
                    "requestBody": { "content": {} }
                }
            },
            "/z": { "get": { "operationId": "getProject" } }
        },
        "components": {
            "parameters": {
                "Verbose": { "name": "verbose", "in": "query" }
            }
        }
    }"##;

    #[test]
    fn resolves_path_parameters() {
        let action = resolve_action(PROJECTS, "getProject").expect("resolve");
        assert_eq!(action.method(), &Method::GET);
        assert_eq!(action.path(), "/projects/{projectId}");
        assert!(action.parameters().is_path("projectId"));
        assert!(!action.parameters().is_query("projectId"));
        assert_eq!(action.description(), Some("Get a project"));
        assert_eq!(action.request_body(), None);
    }

    #[test]
    fn header_parameters_are_not_classified() {
        let action = resolve_action(PROJECTS, "getProject").unwrap();
        assert!(!action.parameters().is_path("X-Request-Id"));
        assert!(!action.parameters().is_query("X-Request-Id"));
    }

    #[test]
    fn referenced_parameters_are_classified() {
        let action = resolve_action(PROJECTS, "getProject").unwrap();
        assert!(action.parameters().is_query("verbose"));
    }

    #[test]
    fn first_match_wins_for_duplicate_ids() {
        let action = resolve_action(PROJECTS, "getProject").unwrap();
        assert_eq!(action.path(), "/projects/{projectId}");
    }

    #[test]
    fn reports_request_body_requirement() {
        let doc = SchemaDocument::parse(PROJECTS).unwrap();
        assert_eq!(
            doc.resolve("updateProject").unwrap().request_body(),
            Some(RequestBodyRequirement::Required)
        );
        assert_eq!(
            doc.resolve("findUsers").unwrap().request_body(),
            Some(RequestBodyRequirement::Optional)
        );
    }

    #[test]
    fn unknown_action_is_named_in_error() {
        let err = resolve_action(PROJECTS, "deleteEverything").expect_err("absent");
        assert!(matches!(err, SchemaError::ActionNotFound { action } if action == "deleteEverything"));
    }
}
