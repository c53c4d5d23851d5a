//! Assembly of the HTTP request for a resolved action.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request};
use tool_primitives::{ApiConfig, ParameterSet, Tool};
use tool_schema::{RequestBodyRequirement, ResolvedAction};
use tracing::{debug, warn};
use url::Url;

use crate::error::{EngineError, EngineResult};

/// Header carrying the identifier of the tool that produced the request.
pub const TOOL_ID_HEADER: &str = "x-tool-id";
/// Header carrying the action identifier the request was built for.
pub const TOOL_ACTION_ID_HEADER: &str = "x-tool-action-id";

/// A fully assembled request, ready for an external executor. Never has a body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl BuiltRequest {
    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL with path substituted and query merged.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Path component of the URL.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Decoded query pairs in order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect()
    }

    /// Converts into an [`http::Request`] with an empty body.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidUrl`] if the URL is not a valid request
    /// target.
    pub fn to_http_request(&self) -> EngineResult<Request<()>> {
        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str())
            .body(())
            .map_err(|err| EngineError::invalid_url(self.url.as_str(), err))?;
        request.headers_mut().extend(self.headers.clone());
        Ok(request)
    }
}

/// Builds the request for `action` from inferred `params`.
///
/// Path parameters replace every `{name}` placeholder, percent-encoded so each
/// value stays within its segment; query parameters are
/// appended in name order, followed by the tool's static query values.
/// Parameters the action does not declare as path or query are dropped.
/// Static headers are copied verbatim and the trace headers are set last.
///
/// # Errors
///
/// Returns [`EngineError::MissingSchema`] when the tool has no API
/// configuration, [`EngineError::UnsupportedRequestBody`] when the action
/// requires a body, [`EngineError::InvalidUrl`] for an unusable base URL or a
/// path value made only of dots, and [`EngineError::InvalidHeader`] for
/// headers that cannot be sent.
pub fn build_request(
    tool: &Tool,
    action: &ResolvedAction,
    params: &ParameterSet,
) -> EngineResult<BuiltRequest> {
    let api = tool.api().ok_or(EngineError::MissingSchema)?;

    ensure_body_supported(action)?;
    if action.request_body() == Some(RequestBodyRequirement::Optional) {
        warn!(
            tool_id = %tool.id(),
            action = action.id(),
            "optional request body omitted; request bodies are not built"
        );
    }

    let classification = action.parameters();
    let mut path = action.path().to_owned();
    let mut query = Vec::new();

    for (name, value) in params.iter() {
        let mut placed = false;
        if classification.is_path(name) {
            path = path.replace(&format!("{{{name}}}"), &encode_path_value(name, value)?);
            placed = true;
        }
        if classification.is_query(name) {
            query.push((name, value));
            placed = true;
        }
        if !placed {
            debug!(action = action.id(), parameter = name, "dropping undeclared parameter");
        }
    }

    for (name, value) in api.query() {
        debug!(action = action.id(), key = %name, value = %value, "adding static query parameter");
        query.push((name.as_str(), value.as_str()));
    }

    let url = assemble_url(api, &path, &query)?;
    let headers = assemble_headers(api, tool, action)?;

    debug!(
        tool_id = %tool.id(),
        action = action.id(),
        method = %action.method(),
        url = %url,
        "built API request"
    );

    Ok(BuiltRequest {
        method: action.method().clone(),
        url,
        headers,
    })
}

/// Rejects actions whose request body is required.
pub(crate) fn ensure_body_supported(action: &ResolvedAction) -> EngineResult<()> {
    if action.request_body() == Some(RequestBodyRequirement::Required) {
        return Err(EngineError::UnsupportedRequestBody {
            action: action.id().to_owned(),
        });
    }
    Ok(())
}

/// Percent-encodes a substituted value so it stays inside its own segment.
///
/// Values made only of dots are rejected: URL parsing folds `.` and `..`
/// segments even when percent-encoded.
fn encode_path_value(name: &str, value: &str) -> EngineResult<String> {
    if !value.is_empty() && value.chars().all(|c| c == '.') {
        return Err(EngineError::invalid_url(
            value,
            format!("path parameter `{name}` cannot be a dot segment"),
        ));
    }
    let mut encoded = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '/' => encoded.push_str("%2F"),
            '\\' => encoded.push_str("%5C"),
            '?' => encoded.push_str("%3F"),
            '#' => encoded.push_str("%23"),
            '%' => encoded.push_str("%25"),
            other => encoded.push(other),
        }
    }
    Ok(encoded)
}

fn assemble_url(api: &ApiConfig, path: &str, query: &[(&str, &str)]) -> EngineResult<Url> {
    let mut url = Url::parse(api.url()).map_err(|err| EngineError::invalid_url(api.url(), err))?;
    if url.cannot_be_a_base() {
        return Err(EngineError::invalid_url(api.url(), "URL cannot carry a path"));
    }

    let base_path = url.path().trim_end_matches('/');
    let separator = if path.starts_with('/') { "" } else { "/" };
    let full_path = format!("{base_path}{separator}{path}");
    url.set_path(&full_path);

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter().copied());
    }

    Ok(url)
}

fn assemble_headers(
    api: &ApiConfig,
    tool: &Tool,
    action: &ResolvedAction,
) -> EngineResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in api.headers() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| EngineError::invalid_header(name, err))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|err| EngineError::invalid_header(name, err))?;
        headers.insert(header_name, header_value);
    }

    let tool_id = HeaderValue::from_str(tool.id().as_str())
        .map_err(|err| EngineError::invalid_header(TOOL_ID_HEADER, err))?;
    let action_id = HeaderValue::from_str(action.id())
        .map_err(|err| EngineError::invalid_header(TOOL_ACTION_ID_HEADER, err))?;
    headers.insert(HeaderName::from_static(TOOL_ID_HEADER), tool_id);
    headers.insert(HeaderName::from_static(TOOL_ACTION_ID_HEADER), action_id);

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use tool_primitives::ToolId;
    use tool_schema::resolve_action;

    use super::*;

    const SCHEMA: &str = r"
openapi: 3.0.0
info: { title: Projects, version: '1' }
paths:
  /projects/{projectId}:
    get:
      operationId: getProject
      parameters:
        - { name: projectId, in: path, required: true }
        - { name: expand, in: query }
  /projects/{projectId}/copies/{projectId}:
    post:
      operationId: copyProject
      parameters:
        - { name: projectId, in: path, required: true }
      requestBody:
        required: true
        content:
          application/json: { schema: { type: object } }
  /projects:
    get:
      operationId: listProjects
      parameters:
        - { name: status, in: query }
        - { name: X-Trace, in: header }
    put:
      operationId: touchProjects
      requestBody:
        content:
          application/json: { schema: { type: object } }
";

    fn tool(url: &str) -> Tool {
        let api = ApiConfig::new(url, SCHEMA).unwrap();
        Tool::with_api(ToolId::new("projects-tool").unwrap(), api)
    }

    fn params(pairs: &[(&str, &str)]) -> ParameterSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn substitutes_path_parameters() {
        let action = resolve_action(SCHEMA, "getProject").unwrap();
        let request = build_request(
            &tool("https://api.example.com"),
            &action,
            &params(&[("projectId", "prj_1234")]),
        )
        .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/projects/prj_1234");
        assert!(!request.url().as_str().contains("{projectId}"));
        assert!(request.query_pairs().is_empty());
        assert_eq!(request.url().query(), None);
    }

    #[test]
    fn replaces_every_placeholder_occurrence() {
        let tool = tool("https://api.example.com");
        let action = resolve_action(SCHEMA, "copyProject").unwrap();
        assert!(matches!(
            build_request(&tool, &action, &params(&[("projectId", "p1")])),
            Err(EngineError::UnsupportedRequestBody { ref action }) if action == "copyProject"
        ));

        let schema = SCHEMA.replace("required: true\n        content", "content");
        let action = resolve_action(&schema, "copyProject").unwrap();
        let request = build_request(&tool, &action, &params(&[("projectId", "p1")])).unwrap();
        assert_eq!(request.path(), "/projects/p1/copies/p1");
    }

    #[test]
    fn path_values_cannot_escape_their_segment() {
        let tool = tool("https://api.example.com/v1");
        let action = resolve_action(SCHEMA, "getProject").unwrap();

        let request =
            build_request(&tool, &action, &params(&[("projectId", "../../admin")])).unwrap();
        assert_eq!(request.path(), "/v1/projects/..%2F..%2Fadmin");
        assert_eq!(request.url().query(), None);

        let request =
            build_request(&tool, &action, &params(&[("projectId", "a?b#c%d")])).unwrap();
        assert_eq!(request.path(), "/v1/projects/a%3Fb%23c%25d");
        assert_eq!(request.url().fragment(), None);

        for dots in [".", ".."] {
            let err = build_request(&tool, &action, &params(&[("projectId", dots)]))
                .expect_err("dot segment");
            assert!(matches!(err, EngineError::InvalidUrl { .. }));
        }
    }

    #[test]
    fn appends_inferred_then_static_query() {
        let api = ApiConfig::new("https://api.example.com/v1/?tenant=acme", SCHEMA)
            .unwrap()
            .with_query("api_version", "2024-01")
            .with_query("format", "json");
        let tool = Tool::with_api(ToolId::new("projects-tool").unwrap(), api);
        let action = resolve_action(SCHEMA, "listProjects").unwrap();

        let request = build_request(
            &tool,
            &action,
            &params(&[("status", "active"), ("X-Trace", "abc"), ("unknown", "x")]),
        )
        .unwrap();

        assert_eq!(request.path(), "/v1/projects");
        assert_eq!(
            request.query_pairs(),
            vec![
                ("tenant".to_owned(), "acme".to_owned()),
                ("status".to_owned(), "active".to_owned()),
                ("api_version".to_owned(), "2024-01".to_owned()),
                ("format".to_owned(), "json".to_owned()),
            ]
        );
        assert!(request.url().as_str().contains("status=active"));
    }

    #[test]
    fn copies_static_headers_and_sets_trace_headers_last() {
        let api = ApiConfig::new("https://api.example.com", SCHEMA)
            .unwrap()
            .with_header("Authorization", "Bearer token")
            .with_header("X-Tool-Id", "spoofed");
        let tool = Tool::with_api(ToolId::new("projects-tool").unwrap(), api);
        let action = resolve_action(SCHEMA, "getProject").unwrap();

        let request =
            build_request(&tool, &action, &params(&[("projectId", "prj_1234")])).unwrap();
        let headers = request.headers();

        assert_eq!(headers["authorization"], "Bearer token");
        assert_eq!(headers[TOOL_ID_HEADER], "projects-tool");
        assert_eq!(headers[TOOL_ACTION_ID_HEADER], "getProject");
        assert_eq!(headers.get_all(TOOL_ID_HEADER).iter().count(), 1);
    }

    #[test]
    fn optional_body_is_omitted() {
        let action = resolve_action(SCHEMA, "touchProjects").unwrap();
        let request =
            build_request(&tool("https://api.example.com"), &action, &ParameterSet::new())
                .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.path(), "/projects");
    }

    #[test]
    fn rejects_unusable_configuration() {
        let action = resolve_action(SCHEMA, "getProject").unwrap();

        let err = build_request(&tool("not a url"), &action, &ParameterSet::new())
            .expect_err("bad url");
        assert!(matches!(err, EngineError::InvalidUrl { .. }));

        let api = ApiConfig::new("https://api.example.com", SCHEMA)
            .unwrap()
            .with_header("Bad Header", "x");
        let tool = Tool::with_api(ToolId::new("projects-tool").unwrap(), api);
        let err = build_request(&tool, &action, &ParameterSet::new()).expect_err("bad header");
        assert!(matches!(err, EngineError::InvalidHeader { ref name, .. } if name == "Bad Header"));
    }

    #[test]
    fn converts_to_http_request() {
        let action = resolve_action(SCHEMA, "getProject").unwrap();
        let built = build_request(
            &tool("https://api.example.com"),
            &action,
            &params(&[("projectId", "prj_1234"), ("expand", "owner")]),
        )
        .unwrap();

        let request = built.to_http_request().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.uri().to_string(),
            "https://api.example.com/projects/prj_1234?expand=owner"
        );
        assert_eq!(request.headers()[TOOL_ACTION_ID_HEADER], "getProject");
    }
}
