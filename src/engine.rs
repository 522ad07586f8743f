use tracing::debug;

use crate::ast::Node;
use crate::context::Context;
use crate::errors::{ParseError, RenderError, Result};
use crate::lexer::{tokenize_with, SyntaxOptions};
use crate::{parser, renderer};

// =========================
// Public API (Template)
// =========================

/// A parsed template. Immutable, and safe to render from many threads at once
/// against independent contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse with the default whitespace handling (block tags on their own
    /// line leave no trace in the output).
    pub fn parse(source: &str) -> std::result::Result<Self, ParseError> {
        Self::parse_with(source, SyntaxOptions::default())
    }

    pub fn parse_with(source: &str, options: SyntaxOptions) -> std::result::Result<Self, ParseError> {
        let tokens = tokenize_with(source, options)?;
        let token_count = tokens.len();
        let nodes = parser::parse(tokens)?;
        debug!(tokens = token_count, nodes = nodes.len(), "parsed template");
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render against `context`. Either the whole output or the first error.
    pub fn render(&self, context: &Context) -> std::result::Result<String, RenderError> {
        let out = renderer::render_nodes(&self.nodes, context)?;
        debug!(bytes = out.len(), params = context.len(), "rendered template");
        Ok(out)
    }
}

/// Parse template text into a reusable [`Template`].
pub fn parse(source: &str) -> std::result::Result<Template, ParseError> {
    Template::parse(source)
}

/// Render a parsed template against a context.
pub fn render(template: &Template, context: &Context) -> std::result::Result<String, RenderError> {
    template.render(context)
}

/// Convenience: parse and render in one step, without keeping the AST.
pub fn render_text(source: &str, context: &Context) -> Result<String> {
    Ok(Template::parse(source)?.render(context)?)
}
