//! Prompt templates with variable substitution and list iteration.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template text is malformed.
    #[error("template syntax error at byte {position}: {reason}")]
    Syntax {
        /// Byte offset of the offending tag.
        position: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A referenced variable was not provided.
    #[error("missing required variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A referenced list was not provided.
    #[error("missing list: {name}")]
    MissingList {
        /// Name of the missing list.
        name: String,
    },
}

impl TemplateError {
    fn syntax(position: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            reason: reason.into(),
        }
    }
}

/// A parsed prompt template.
///
/// Supported syntax:
/// - `{{name}}` substitutes a variable.
/// - `{{#each items}} ... {{/each}}` repeats the body once per item of the
///   list `items`; inside the body, item fields shadow outer variables.
///
/// Every referenced variable must be supplied, either as a default on the
/// template or in the [`TemplateContext`] passed at render time.
///
/// # Examples
///
/// ```
/// use tool_prompts::template::{PromptTemplate, TemplateContext, TemplateItem};
///
/// let template = PromptTemplate::parse(
///     "{{title}}:{{#each people}} {{name}}{{/each}}",
/// )
/// .unwrap();
///
/// let context = TemplateContext::new()
///     .with_value("title", "Team")
///     .with_list(
///         "people",
///         vec![
///             TemplateItem::new().with_field("name", "Ada"),
///             TemplateItem::new().with_field("name", "Linus"),
///         ],
///     );
///
/// assert_eq!(template.render_with(&context).unwrap(), "Team: Ada Linus");
/// ```
#[derive(Clone, Debug)]
pub struct PromptTemplate {
    source: String,
    nodes: Vec<Node>,
    variables: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Text(String),
    Variable(String),
    Each { list: String, body: Vec<Node> },
}

impl PromptTemplate {
    /// Parses template text.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Syntax`] for unterminated tags, empty or
    /// invalid names, unknown block kinds, and unbalanced blocks.
    pub fn parse(source: impl Into<String>) -> TemplateResult<Self> {
        let source = source.into();
        let nodes = parse_nodes(&source)?;
        Ok(Self {
            source,
            nodes,
            variables: HashMap::new(),
        })
    }

    /// Returns a builder for constructing templates with default variables.
    #[must_use]
    pub fn builder(template: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(template)
    }

    /// Sets a default variable value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Returns the default value of a variable if set.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Renders the template with its default variables only.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] or
    /// [`TemplateError::MissingList`] when a reference cannot be satisfied.
    pub fn render(&self) -> TemplateResult<String> {
        self.render_with(&TemplateContext::new())
    }

    /// Renders the template with runtime values.
    ///
    /// Runtime values override template defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] or
    /// [`TemplateError::MissingList`] when a reference cannot be satisfied.
    pub fn render_with(&self, context: &TemplateContext) -> TemplateResult<String> {
        let mut out = String::with_capacity(self.source.len());
        self.render_nodes(&self.nodes, context, None, &mut out)?;
        Ok(out)
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        context: &TemplateContext,
        item: Option<&TemplateItem>,
        out: &mut String,
    ) -> TemplateResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable(name) => {
                    let value = item
                        .and_then(|item| item.get(name))
                        .or_else(|| context.value(name))
                        .or_else(|| self.get_variable(name))
                        .ok_or_else(|| TemplateError::MissingVariable { name: name.clone() })?;
                    out.push_str(value);
                }
                Node::Each { list, body } => {
                    let items = context
                        .list(list)
                        .ok_or_else(|| TemplateError::MissingList { name: list.clone() })?;
                    for entry in items {
                        self.render_nodes(body, context, Some(entry), out)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.source
    }

    /// Returns the configured default variables.
    #[must_use]
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Builder for constructing prompt templates.
pub struct TemplateBuilder {
    template: String,
    variables: HashMap<String, String>,
}

impl TemplateBuilder {
    /// Creates a new builder with the supplied template text.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: HashMap::new(),
        }
    }

    /// Sets a variable with a default value.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Parses the template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Syntax`] if the template is malformed.
    pub fn build(self) -> TemplateResult<PromptTemplate> {
        let mut template = PromptTemplate::parse(self.template)?;
        template.variables = self.variables;
        Ok(template)
    }
}

/// Runtime values supplied to [`PromptTemplate::render_with`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TemplateContext {
    values: HashMap<String, String>,
    lists: HashMap<String, Vec<TemplateItem>>,
}

impl TemplateContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scalar value.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Adds a list for `{{#each}}` blocks.
    #[must_use]
    pub fn with_list(mut self, name: impl Into<String>, items: Vec<TemplateItem>) -> Self {
        self.lists.insert(name.into(), items);
        self
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn list(&self, name: &str) -> Option<&[TemplateItem]> {
        self.lists.get(name).map(Vec::as_slice)
    }
}

/// One element of a list iterated by `{{#each}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateItem {
    fields: HashMap<String, String>,
}

impl TemplateItem {
    /// Creates an item without fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field visible inside the block body.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

enum Tag<'a> {
    Variable(&'a str),
    Open(&'a str),
    Close,
}

fn parse_tag(position: usize, raw: &str) -> TemplateResult<Tag<'_>> {
    let tag = raw.trim();
    if tag.is_empty() {
        return Err(TemplateError::syntax(position, "empty tag"));
    }

    if let Some(rest) = tag.strip_prefix('#') {
        let mut parts = rest.split_whitespace();
        return match (parts.next(), parts.next(), parts.next()) {
            (Some("each"), Some(list), None) => {
                validate_name(position, list)?;
                Ok(Tag::Open(list))
            }
            (Some("each"), None, _) => Err(TemplateError::syntax(position, "`#each` needs a list name")),
            (Some("each"), Some(_), Some(_)) => Err(TemplateError::syntax(
                position,
                "`#each` takes exactly one list name",
            )),
            (kind, _, _) => Err(TemplateError::syntax(
                position,
                format!("unknown block `#{}`", kind.unwrap_or_default()),
            )),
        };
    }

    if let Some(rest) = tag.strip_prefix('/') {
        return if rest.trim() == "each" {
            Ok(Tag::Close)
        } else {
            Err(TemplateError::syntax(
                position,
                format!("unknown closing tag `/{}`", rest.trim()),
            ))
        };
    }

    validate_name(position, tag)?;
    Ok(Tag::Variable(tag))
}

fn validate_name(position: usize, name: &str) -> TemplateResult<()> {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(TemplateError::syntax(
            position,
            format!("invalid name `{name}`"),
        ))
    }
}

fn parse_nodes(source: &str) -> TemplateResult<Vec<Node>> {
    // Each open block keeps its list name, start offset, and parent nodes.
    let mut stack: Vec<(String, usize, Vec<Node>)> = Vec::new();
    let mut nodes = Vec::new();
    let mut offset = 0;

    while let Some(start) = source[offset..].find("{{") {
        let start = offset + start;
        if start > offset {
            nodes.push(Node::Text(source[offset..start].to_owned()));
        }

        let inner_start = start + 2;
        let end = source[inner_start..]
            .find("}}")
            .map(|end| inner_start + end)
            .ok_or_else(|| TemplateError::syntax(start, "unterminated tag"))?;

        match parse_tag(start, &source[inner_start..end])? {
            Tag::Variable(name) => nodes.push(Node::Variable(name.to_owned())),
            Tag::Open(list) => {
                let parent = std::mem::take(&mut nodes);
                stack.push((list.to_owned(), start, parent));
            }
            Tag::Close => {
                let (list, _, parent) = stack
                    .pop()
                    .ok_or_else(|| TemplateError::syntax(start, "`/each` without `#each`"))?;
                let body = std::mem::replace(&mut nodes, parent);
                nodes.push(Node::Each { list, body });
            }
        }

        offset = end + 2;
    }

    if offset < source.len() {
        nodes.push(Node::Text(source[offset..].to_owned()));
    }

    if let Some((list, position, _)) = stack.pop() {
        return Err(TemplateError::syntax(
            position,
            format!("`#each {list}` is never closed"),
        ));
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_simple_template() {
        let template = PromptTemplate::builder("Hello {{name}}!")
            .with_variable("name", "World")
            .build()
            .unwrap();

        let rendered = template.render().unwrap();
        assert_eq!(rendered, "Hello World!");
    }

    #[test]
    fn runtime_values_override_defaults() {
        let template = PromptTemplate::builder("Hello {{ name }}!")
            .with_variable("name", "World")
            .build()
            .unwrap();

        let context = TemplateContext::new().with_value("name", "Alice");
        assert_eq!(template.render_with(&context).unwrap(), "Hello Alice!");
    }

    #[test]
    fn missing_variables_error() {
        let template = PromptTemplate::parse("Hello {{name}}!").unwrap();
        let err = template.render().expect_err("should error");
        assert!(matches!(err, TemplateError::MissingVariable { name } if name == "name"));
    }

    #[test]
    fn iterates_lists_with_item_scope() {
        let template = PromptTemplate::parse(
            "{{#each turns}}<{{role}}_message>{{content}}</{{role}}_message>\n{{/each}}end {{role}}",
        )
        .unwrap();

        let context = TemplateContext::new()
            .with_value("role", "outer")
            .with_list(
                "turns",
                vec![
                    TemplateItem::new()
                        .with_field("role", "user")
                        .with_field("content", "hi"),
                    TemplateItem::new()
                        .with_field("role", "assistant")
                        .with_field("content", "hello"),
                ],
            );

        let rendered = template.render_with(&context).unwrap();
        assert_eq!(
            rendered,
            "<user_message>hi</user_message>\n<assistant_message>hello</assistant_message>\nend outer"
        );
    }

    #[test]
    fn body_can_read_outer_values() {
        let template = PromptTemplate::parse("{{#each xs}}{{prefix}}{{v}};{{/each}}").unwrap();
        let context = TemplateContext::new().with_value("prefix", "-").with_list(
            "xs",
            vec![
                TemplateItem::new().with_field("v", "a"),
                TemplateItem::new().with_field("v", "b"),
            ],
        );
        assert_eq!(template.render_with(&context).unwrap(), "-a;-b;");
    }

    #[test]
    fn missing_list_errors() {
        let template = PromptTemplate::parse("{{#each xs}}x{{/each}}").unwrap();
        assert!(matches!(
            template.render(),
            Err(TemplateError::MissingList { name }) if name == "xs"
        ));
    }

    #[test]
    fn rejects_malformed_templates() {
        for source in [
            "Hello {{name",
            "Hello {{}}",
            "{{#each}}x{{/each}}",
            "{{#each a b}}x{{/each}}",
            "{{#if a}}x{{/if}}",
            "x{{/each}}",
            "{{#each xs}}never closed",
            "{{not a name}}",
        ] {
            let err = PromptTemplate::parse(source).expect_err(source);
            assert!(matches!(err, TemplateError::Syntax { .. }), "{source}");
        }
    }

    #[test]
    fn single_braces_are_literal_text() {
        let template = PromptTemplate::parse(r#"{"projectId": "{{id}}"}"#).unwrap();
        let context = TemplateContext::new().with_value("id", "prj_1");
        assert_eq!(
            template.render_with(&context).unwrap(),
            r#"{"projectId": "prj_1"}"#
        );
    }

    #[test]
    fn mutable_template_updates() {
        let mut template = PromptTemplate::parse("Hello {{name}}!").unwrap();
        template.set_variable("name", "Bob");
        assert_eq!(template.render().unwrap(), "Hello Bob!");
    }
}
