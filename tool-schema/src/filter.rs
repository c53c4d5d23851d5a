//! Minimal single-action documents used as prompt context.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tool_primitives::Tool;
use tracing::warn;

use crate::document::{OperationEntry, SchemaDocument, ref_name};
use crate::error::{SchemaError, SchemaResult};

const JSON_MEDIA_TYPE: &str = "application/json";

impl SchemaDocument {
    /// Builds a document containing only `action` and the component schemas
    /// referenced directly by its JSON responses.
    ///
    /// References inside the copied schemas are left as they are. Parameter,
    /// request body and response references of the operation itself are
    /// inlined so the result stays resolvable on its own.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ActionNotFound`] when no operation carries the
    /// identifier.
    pub fn filter(&self, action: &str) -> SchemaResult<Value> {
        let entry = self
            .find_operation(action)
            .ok_or_else(|| SchemaError::ActionNotFound {
                action: action.to_owned(),
            })?;

        let mut filtered = Map::new();
        for key in ["openapi", "info"] {
            if let Some(value) = self.raw().get(key) {
                filtered.insert(key.to_owned(), value.clone());
            }
        }

        let mut item = Map::new();
        item.insert(entry.method_key().to_owned(), self.copy_operation(&entry));
        let mut paths = Map::new();
        paths.insert(entry.path().to_owned(), Value::Object(item));
        filtered.insert("paths".to_owned(), Value::Object(paths));

        let schemas = self.referenced_schemas(&entry);
        if !schemas.is_empty() {
            let mut components = Map::new();
            components.insert("schemas".to_owned(), Value::Object(schemas));
            filtered.insert("components".to_owned(), Value::Object(components));
        }

        Ok(Value::Object(filtered))
    }

    fn copy_operation(&self, entry: &OperationEntry<'_>) -> Value {
        let mut operation = self
            .raw()
            .get("paths")
            .and_then(|paths| paths.get(entry.path()))
            .and_then(|item| item.get(entry.method_key()))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        if let Some(Value::Array(parameters)) = operation.get_mut("parameters") {
            for parameter in parameters.iter_mut() {
                self.inline_reference(parameter, "parameters");
            }
        }

        if let Some(body) = operation.get_mut("requestBody") {
            self.inline_reference(body, "requestBodies");
        }

        if let Some(Value::Object(responses)) = operation.get_mut("responses") {
            for response in responses.values_mut() {
                self.inline_reference(response, "responses");
            }
        }

        operation
    }

    fn inline_reference(&self, value: &mut Value, table: &str) {
        let Some(reference) = value.get("$ref").and_then(Value::as_str) else {
            return;
        };
        if let Some(resolved) = self.raw_component(table, ref_name(reference)) {
            *value = resolved.clone();
        }
    }

    fn referenced_schemas(&self, entry: &OperationEntry<'_>) -> Map<String, Value> {
        let names: BTreeSet<&str> = entry
            .operation
            .responses
            .values()
            .filter_map(|response| self.resolve_response(response))
            .filter_map(|response| response.content.get(JSON_MEDIA_TYPE))
            .filter_map(|media| media.schema.as_ref())
            .filter_map(|schema| schema.get("$ref").and_then(Value::as_str))
            .map(ref_name)
            .collect();

        let mut schemas = Map::new();
        for name in names {
            match self.raw_component("schemas", name) {
                Some(schema) => {
                    schemas.insert(name.to_owned(), schema.clone());
                }
                None => warn!(schema = name, "referenced component schema not found"),
            }
        }
        schemas
    }
}

/// Filters raw schema text for `action`, rendering the result as indented
/// JSON.
///
/// # Errors
///
/// Returns [`SchemaError::Parse`] for malformed documents and
/// [`SchemaError::ActionNotFound`] when the action is absent.
pub fn filter_schema(schema: &str, action: &str) -> SchemaResult<String> {
    let filtered = SchemaDocument::parse(schema)?.filter(action)?;
    Ok(serde_json::to_string_pretty(&filtered)?)
}

/// Filters the schema configured on `tool` for `action`.
///
/// # Errors
///
/// Returns [`SchemaError::MissingSchema`] when the tool has no API schema,
/// otherwise the errors of [`filter_schema`].
pub fn filter_tool_schema(tool: &Tool, action: &str) -> SchemaResult<String> {
    let schema = tool
        .api()
        .and_then(|api| api.schema())
        .ok_or(SchemaError::MissingSchema)?;
    filter_schema(schema, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestBodyRequirement;
    use tool_primitives::{ApiConfig, ToolConfig, ToolId};

    const WIDGETS: &str = r##"{
        "openapi": "3.0.3",
        "info": { "title": "Widgets", "version": "2.0.0" },
        "paths": {
            "/widgets/{widgetId}": {
                "get": {
                    "operationId": "getWidget",
                    "parameters": [
                        { "$ref": "#/components/parameters/WidgetId" },
                        { "name": "expand", "in": "query" }
                    ],
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Widget" }
                                }
                            }
                        },
                        "404": { "$ref": "#/components/responses/NotFound" }
                    }
                },
                "delete": { "operationId": "deleteWidget" },
                "patch": {
                    "operationId": "patchWidget",
                    "requestBody": { "$ref": "#/components/requestBodies/WidgetPatch" }
                }
            },
            "/gadgets": {
                "get": {
                    "operationId": "listGadgets",
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Gadget" }
                                }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "parameters": {
                "WidgetId": { "name": "widgetId", "in": "path", "required": true }
            },
            "requestBodies": {
                "WidgetPatch": {
                    "required": false,
                    "content": { "application/json": { "schema": { "type": "object" } } }
                }
            },
            "responses": {
                "NotFound": {
                    "description": "missing",
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/Error" }
                        }
                    }
                }
            },
            "schemas": {
                "Widget": {
                    "type": "object",
                    "properties": { "part": { "$ref": "#/components/schemas/Part" } }
                },
                "Part": { "type": "object" },
                "Gadget": { "type": "object" },
                "Error": { "type": "object" }
            }
        }
    }"##;

    #[test]
    fn keeps_only_the_action_and_its_schemas() {
        let doc = SchemaDocument::parse(WIDGETS).unwrap();
        let filtered = doc.filter("getWidget").unwrap();

        assert_eq!(filtered["openapi"], "3.0.3");
        assert_eq!(filtered["info"]["title"], "Widgets");

        let paths = filtered["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 1);
        let item = paths["/widgets/{widgetId}"].as_object().unwrap();
        assert_eq!(item.len(), 1);
        assert_eq!(item["get"]["operationId"], "getWidget");

        let schemas = filtered["components"]["schemas"].as_object().unwrap();
        let names: Vec<_> = schemas.keys().map(String::as_str).collect();
        assert_eq!(names, ["Error", "Widget"]);
    }

    #[test]
    fn nested_references_are_not_followed() {
        let doc = SchemaDocument::parse(WIDGETS).unwrap();
        let filtered = doc.filter("getWidget").unwrap();
        let schemas = filtered["components"]["schemas"].as_object().unwrap();
        assert!(!schemas.contains_key("Part"));
        assert_eq!(
            schemas["Widget"]["properties"]["part"]["$ref"],
            "#/components/schemas/Part"
        );
    }

    #[test]
    fn operation_references_are_inlined() {
        let doc = SchemaDocument::parse(WIDGETS).unwrap();
        let filtered = doc.filter("getWidget").unwrap();
        let operation = &filtered["paths"]["/widgets/{widgetId}"]["get"];
        assert_eq!(operation["parameters"][0]["name"], "widgetId");
        assert_eq!(operation["responses"]["404"]["description"], "missing");
    }

    #[test]
    fn actions_without_json_responses_have_no_components() {
        let doc = SchemaDocument::parse(WIDGETS).unwrap();
        let filtered = doc.filter("deleteWidget").unwrap();
        assert!(filtered.get("components").is_none());
    }

    #[test]
    fn filtering_preserves_resolution() {
        let original = SchemaDocument::parse(WIDGETS).unwrap();
        let rendered = filter_schema(WIDGETS, "getWidget").unwrap();
        let filtered = SchemaDocument::parse(&rendered).unwrap();
        assert_eq!(
            original.resolve("getWidget").unwrap(),
            filtered.resolve("getWidget").unwrap()
        );
    }

    #[test]
    fn request_body_references_are_inlined() {
        let original = SchemaDocument::parse(WIDGETS).unwrap();
        let filtered = original.filter("patchWidget").unwrap();
        let body = &filtered["paths"]["/widgets/{widgetId}"]["patch"]["requestBody"];
        assert_eq!(body["required"], false);
        assert!(body.get("$ref").is_none());

        let reparsed =
            SchemaDocument::parse(&serde_json::to_string(&filtered).unwrap()).unwrap();
        let resolved = reparsed.resolve("patchWidget").unwrap();
        assert_eq!(resolved, original.resolve("patchWidget").unwrap());
        assert_eq!(resolved.request_body(), Some(RequestBodyRequirement::Optional));
    }

    #[test]
    fn missing_schema_is_reported() {
        let id = ToolId::new("widgets").unwrap();
        let no_api = Tool::new(id.clone(), ToolConfig::default());
        assert!(matches!(
            filter_tool_schema(&no_api, "getWidget"),
            Err(SchemaError::MissingSchema)
        ));

        let empty = Tool::with_api(id, ApiConfig::new("https://w.example", "").unwrap());
        assert!(matches!(
            filter_tool_schema(&empty, "getWidget"),
            Err(SchemaError::MissingSchema)
        ));
    }

    #[test]
    fn absent_action_is_reported() {
        assert!(matches!(
            filter_schema(WIDGETS, "nope"),
            Err(SchemaError::ActionNotFound { .. })
        ));
    }
}
