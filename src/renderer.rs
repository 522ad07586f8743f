use tracing::trace;

use crate::ast::{ForLoop, IfChain, LoopTarget, Node};
use crate::context::{Context, Scope};
use crate::errors::RenderError;
use crate::expression::eval;
use crate::value::{Map, Value};

/// Reserved name under which loop metadata is visible inside a `for` body.
pub const LOOP_VAR: &str = "loop";

/// Per-iteration metadata exposed as `loop.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    pub index0: usize,
    pub length: usize,
}

impl LoopState {
    pub fn index(&self) -> usize {
        self.index0 + 1
    }

    pub fn first(&self) -> bool {
        self.index0 == 0
    }

    pub fn last(&self) -> bool {
        self.index0 + 1 == self.length
    }

    fn to_value(self) -> Value {
        let mut map = Map::new();
        map.insert("index".into(), Value::from(self.index()));
        map.insert("index0".into(), Value::from(self.index0));
        map.insert("first".into(), Value::Bool(self.first()));
        map.insert("last".into(), Value::Bool(self.last()));
        map.insert("length".into(), Value::from(self.length));
        map.insert("revindex".into(), Value::from(self.length - self.index0));
        map.insert("revindex0".into(), Value::from(self.length - self.index()));
        Value::Map(map)
    }
}

/// Walk `nodes` against `context`. Output is only returned when every node
/// rendered successfully.
pub(crate) fn render_nodes(nodes: &[Node], context: &Context) -> Result<String, RenderError> {
    let mut renderer = Renderer {
        scope: Scope::new(context),
        out: String::new(),
    };
    renderer.render_block(nodes)?;
    Ok(renderer.out)
}

struct Renderer<'ctx> {
    scope: Scope<'ctx>,
    out: String,
}

impl Renderer<'_> {
    fn render_block(&mut self, nodes: &[Node]) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Output(expr) => {
                    let value = eval(expr, &self.scope)?;
                    self.out.push_str(&value.to_output()?);
                }
                Node::For(for_loop) => self.render_for(for_loop)?,
                Node::If(chain) => self.render_if(chain)?,
            }
        }
        Ok(())
    }

    fn render_for(&mut self, for_loop: &ForLoop) -> Result<(), RenderError> {
        let items = match eval(&for_loop.iterable, &self.scope)? {
            Value::Seq(items) => items,
            // Iterating a mapping directly yields its keys.
            Value::Map(map) => map.into_keys().map(Value::String).collect(),
            other => return Err(RenderError::type_error("iteration", other.kind())),
        };
        trace!(items = items.len(), depth = self.scope.depth(), "entering for loop");

        if items.is_empty() {
            if let Some(empty_body) = &for_loop.empty_body {
                self.render_block(empty_body)?;
            }
            return Ok(());
        }

        let length = items.len();
        for (index0, item) in items.into_iter().enumerate() {
            let mut frame = Map::new();
            bind_target(&for_loop.target, item, &mut frame)?;
            frame.insert(LOOP_VAR.to_string(), LoopState { index0, length }.to_value());
            self.scope.push(frame);
            let result = self.render_block(&for_loop.body);
            self.scope.pop();
            result?;
        }
        Ok(())
    }

    fn render_if(&mut self, chain: &IfChain) -> Result<(), RenderError> {
        for (condition, body) in &chain.branches {
            if eval(condition, &self.scope)?.is_truthy() {
                return self.render_block(body);
            }
        }
        match &chain.else_body {
            Some(else_body) => self.render_block(else_body),
            None => Ok(()),
        }
    }
}

fn bind_target(target: &LoopTarget, item: Value, frame: &mut Map) -> Result<(), RenderError> {
    match target {
        LoopTarget::Single(name) => {
            frame.insert(name.clone(), item);
        }
        LoopTarget::Unpack(names) => {
            let parts = match item {
                Value::Seq(parts) if parts.len() == names.len() => parts,
                Value::Seq(parts) => {
                    return Err(RenderError::type_error(
                        format!("unpacking into {} names", names.len()),
                        format!("sequence of length {}", parts.len()),
                    ));
                }
                other => {
                    return Err(RenderError::type_error(
                        format!("unpacking into {} names", names.len()),
                        other.kind(),
                    ));
                }
            };
            for (name, part) in names.iter().zip(parts) {
                frame.insert(name.clone(), part);
            }
        }
    }
    Ok(())
}
