//! Enumeration of the actions a schema exposes.

use std::collections::HashSet;

use http::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::SchemaDocument;
use crate::error::{SchemaError, SchemaResult};

/// Addressable operation of an API tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAction {
    /// Operation identifier.
    pub name: String,
    /// Summary, falling back to the description.
    pub description: String,
    /// Path template.
    pub path: String,
    /// HTTP method name, e.g. `GET`.
    pub method: String,
}

impl ApiAction {
    /// Parses the method name.
    ///
    /// # Errors
    ///
    /// Returns the [`http::method::InvalidMethod`] error for names that are not
    /// valid HTTP tokens.
    pub fn http_method(&self) -> Result<Method, http::method::InvalidMethod> {
        Method::from_bytes(self.method.as_bytes())
    }
}

impl SchemaDocument {
    /// Lists every action in enumeration order.
    ///
    /// When several operations share an identifier only the first is listed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingIdentifier`] naming the first operation
    /// without an `operationId`.
    pub fn actions(&self) -> SchemaResult<Vec<ApiAction>> {
        let mut seen = HashSet::new();
        let mut actions = Vec::new();

        for entry in self.operations() {
            let Some(name) = entry.operation_id() else {
                return Err(SchemaError::MissingIdentifier {
                    path: entry.path().to_owned(),
                    method: entry.method().clone(),
                });
            };

            if !seen.insert(name) {
                debug!(
                    action = name,
                    path = entry.path(),
                    method = %entry.method(),
                    "skipping duplicate operationId"
                );
                continue;
            }

            actions.push(ApiAction {
                name: name.to_owned(),
                description: entry.description().unwrap_or_default().to_owned(),
                path: entry.path().to_owned(),
                method: entry.method().to_string(),
            });
        }

        Ok(actions)
    }
}

/// Parses `schema` and lists its actions.
///
/// # Errors
///
/// Returns [`SchemaError::Parse`] for malformed documents and
/// [`SchemaError::MissingIdentifier`] when an operation lacks an identifier.
pub fn list_actions(schema: &str) -> SchemaResult<Vec<ApiAction>> {
    SchemaDocument::parse(schema)?.actions()
}
