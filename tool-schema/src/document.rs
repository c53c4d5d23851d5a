//! Typed view over a raw OpenAPI document.

use std::collections::BTreeMap;

use http::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};

/// Method keys of a path item, in enumeration order.
static METHODS: [(&str, Method); 8] = [
    ("delete", Method::DELETE),
    ("get", Method::GET),
    ("head", Method::HEAD),
    ("options", Method::OPTIONS),
    ("patch", Method::PATCH),
    ("post", Method::POST),
    ("put", Method::PUT),
    ("trace", Method::TRACE),
];

/// Parsed API description.
///
/// Keeps the raw JSON value next to the typed model so that filtered
/// documents can copy operations and component schemas verbatim.
#[derive(Clone, Debug)]
pub struct SchemaDocument {
    raw: Value,
    openapi: OpenApi,
}

impl SchemaDocument {
    /// Parses a JSON or YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] when the text is not valid JSON/YAML or
    /// does not have the shape of an OpenAPI document.
    pub fn parse(text: &str) -> SchemaResult<Self> {
        let raw: Value = if text.trim_start().starts_with('{') {
            serde_json::from_str(text).map_err(|err| SchemaError::parse(err.to_string()))?
        } else {
            serde_yaml::from_str(text).map_err(|err| SchemaError::parse(err.to_string()))?
        };

        let openapi: OpenApi = serde_json::from_value(raw.clone())
            .map_err(|err| SchemaError::parse(err.to_string()))?;

        let document = Self { raw, openapi };
        document.check_references()?;
        Ok(document)
    }

    /// Returns the raw document value.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Iterates over every operation in enumeration order.
    pub fn operations(&self) -> impl Iterator<Item = OperationEntry<'_>> {
        self.openapi.paths.iter().flat_map(|(path, item)| {
            METHODS.iter().filter_map(move |(key, method)| {
                item.operation(key).map(|operation| OperationEntry {
                    path,
                    method: method.clone(),
                    method_key: *key,
                    operation,
                })
            })
        })
    }

    /// Finds the first operation whose identifier equals `action`.
    #[must_use]
    pub fn find_operation(&self, action: &str) -> Option<OperationEntry<'_>> {
        self.operations()
            .find(|entry| entry.operation.operation_id.as_deref() == Some(action))
    }

    pub(crate) fn resolve_parameter<'a>(
        &'a self,
        parameter: &'a ParameterOrRef,
    ) -> Option<&'a Parameter> {
        match parameter {
            ParameterOrRef::Item(parameter) => Some(parameter),
            ParameterOrRef::Ref { reference } => {
                self.openapi.components.parameters.get(ref_name(reference))
            }
        }
    }

    pub(crate) fn resolve_response<'a>(&'a self, response: &'a ResponseOrRef) -> Option<&'a Response> {
        match response {
            ResponseOrRef::Item(response) => Some(response),
            ResponseOrRef::Ref { reference } => {
                self.openapi.components.responses.get(ref_name(reference))
            }
        }
    }

    pub(crate) fn resolve_request_body<'a>(
        &'a self,
        body: &'a RequestBodyOrRef,
    ) -> Option<&'a RequestBody> {
        match body {
            RequestBodyOrRef::Item(body) => Some(body),
            RequestBodyOrRef::Ref { reference } => {
                self.openapi.components.request_bodies.get(ref_name(reference))
            }
        }
    }

    /// Raw entry of a components table, e.g. `("schemas", "Widget")`.
    pub(crate) fn raw_component(&self, table: &str, name: &str) -> Option<&Value> {
        self.raw.get("components")?.get(table)?.get(name)
    }

    /// Parameter references must resolve, otherwise the action cannot be
    /// classified.
    fn check_references(&self) -> SchemaResult<()> {
        for entry in self.operations() {
            for parameter in &entry.operation.parameters {
                if let ParameterOrRef::Ref { reference } = parameter {
                    if self.resolve_parameter(parameter).is_none() {
                        return Err(SchemaError::parse(format!(
                            "unresolved parameter reference `{reference}` in {} {}",
                            entry.method, entry.path
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// One operation located by path and method.
#[derive(Clone, Debug)]
pub struct OperationEntry<'a> {
    path: &'a str,
    method: Method,
    method_key: &'static str,
    pub(crate) operation: &'a Operation,
}

impl<'a> OperationEntry<'a> {
    /// Path template, e.g. `/projects/{projectId}`.
    #[must_use]
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Operation identifier, if declared.
    #[must_use]
    pub fn operation_id(&self) -> Option<&'a str> {
        self.operation.operation_id.as_deref()
    }

    /// Summary, falling back to the description.
    #[must_use]
    pub fn description(&self) -> Option<&'a str> {
        self.operation
            .summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.operation.description.as_deref())
    }

    pub(crate) fn method_key(&self) -> &'static str {
        self.method_key
    }
}

/// Last segment of a local reference such as `#/components/schemas/Widget`.
pub(crate) fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

#[derive(Clone, Debug, Default, Deserialize)]
struct OpenApi {
    #[serde(default)]
    paths: BTreeMap<String, PathItem>,
    #[serde(default)]
    components: Components,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Components {
    #[serde(default)]
    parameters: BTreeMap<String, Parameter>,
    #[serde(default)]
    responses: BTreeMap<String, Response>,
    #[serde(default, rename = "requestBodies")]
    request_bodies: BTreeMap<String, RequestBody>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct PathItem {
    delete: Option<Operation>,
    get: Option<Operation>,
    head: Option<Operation>,
    options: Option<Operation>,
    patch: Option<Operation>,
    post: Option<Operation>,
    put: Option<Operation>,
    trace: Option<Operation>,
}

impl PathItem {
    fn operation(&self, key: &str) -> Option<&Operation> {
        match key {
            "delete" => self.delete.as_ref(),
            "get" => self.get.as_ref(),
            "head" => self.head.as_ref(),
            "options" => self.options.as_ref(),
            "patch" => self.patch.as_ref(),
            "post" => self.post.as_ref(),
            "put" => self.put.as_ref(),
            "trace" => self.trace.as_ref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct Operation {
    #[serde(default, rename = "operationId")]
    pub(crate) operation_id: Option<String>,
    #[serde(default)]
    pub(crate) summary: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) parameters: Vec<ParameterOrRef>,
    #[serde(default, rename = "requestBody")]
    pub(crate) request_body: Option<RequestBodyOrRef>,
    #[serde(default)]
    pub(crate) responses: BTreeMap<String, ResponseOrRef>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ParameterOrRef {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(Parameter),
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Parameter {
    pub(crate) name: String,
    #[serde(rename = "in")]
    pub(crate) location: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ResponseOrRef {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(Response),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub(crate) content: BTreeMap<String, MediaType>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct MediaType {
    #[serde(default)]
    pub(crate) schema: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RequestBodyOrRef {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(RequestBody),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct RequestBody {
    #[serde(default)]
    pub(crate) required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r"
openapi: 3.0.0
info:
  title: Pets
  version: '1'
paths:
  /pets:
    post:
      operationId: createPet
    get:
      operationId: listPets
      responses:
        200:
          description: ok
  /a:
    put:
      operationId: first
";

    #[test]
    fn parses_yaml_with_numeric_response_codes() {
        let doc = SchemaDocument::parse(YAML).expect("yaml parses");
        let entry = doc.find_operation("listPets").expect("listPets");
        assert_eq!(entry.method(), &Method::GET);
        assert!(entry.operation.responses.contains_key("200"));
    }

    #[test]
    fn enumerates_paths_then_methods() {
        let doc = SchemaDocument::parse(YAML).unwrap();
        let order: Vec<_> = doc
            .operations()
            .map(|e| (e.path().to_owned(), e.method().clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("/a".to_owned(), Method::PUT),
                ("/pets".to_owned(), Method::GET),
                ("/pets".to_owned(), Method::POST),
            ]
        );
    }

    #[test]
    fn malformed_documents_fail_to_parse() {
        assert!(matches!(
            SchemaDocument::parse("{ not json"),
            Err(SchemaError::Parse { .. })
        ));
        assert!(matches!(
            SchemaDocument::parse("just a sentence"),
            Err(SchemaError::Parse { .. })
        ));
        assert!(matches!(
            SchemaDocument::parse(r#"{"paths": []}"#),
            Err(SchemaError::Parse { .. })
        ));
    }

    #[test]
    fn unresolved_parameter_reference_is_a_parse_error() {
        let doc = r##"{"paths": {"/x": {"get": {"operationId": "x",
            "parameters": [{"$ref": "#/components/parameters/Missing"}]}}}}"##;
        let err = SchemaDocument::parse(doc).expect_err("dangling ref");
        assert!(matches!(err, SchemaError::Parse { reason } if reason.contains("Missing")));
    }

    #[test]
    fn ref_name_takes_last_segment() {
        assert_eq!(ref_name("#/components/schemas/Widget"), "Widget");
        assert_eq!(ref_name("Widget"), "Widget");
    }
}
