use crate::value::{Map, Value};

/// Caller-supplied parameters for one render call.
///
/// The context is the base frame of the lookup stack. It is built once per
/// render (usually through [`Context::merged`]) and never mutated by the
/// engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    base: Map,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(base: Map) -> Self {
        Self { base }
    }

    /// Base parameters overlaid by call-time overrides; overrides win.
    pub fn merged(base: &Map, overrides: &Map) -> Self {
        let mut merged = base.clone();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        Self { base: merged }
    }

    /// Builder-style insert, handy for tests and embedding code.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.base.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.base.get(key)
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

impl From<Map> for Context {
    fn from(base: Map) -> Self {
        Self::from_map(base)
    }
}

impl From<serde_json::Value> for Context {
    /// Non-object JSON yields an empty context.
    fn from(json: serde_json::Value) -> Self {
        match Value::from(json) {
            Value::Map(base) => Self { base },
            _ => Self::default(),
        }
    }
}

/// Lookup stack used while rendering: the borrowed base context plus the
/// frames pushed by loop iterations, searched innermost-first.
pub(crate) struct Scope<'ctx> {
    base: &'ctx Context,
    frames: Vec<Map>,
}

impl<'ctx> Scope<'ctx> {
    pub(crate) fn new(base: &'ctx Context) -> Self {
        Self {
            base,
            frames: Vec::new(),
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.base.get(name))
    }

    pub(crate) fn push(&mut self, frame: Map) {
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn overrides_win_on_merge() {
        let base = Context::new().with("name", "Ana").with("role", "dev");
        let overrides = Context::new().with("role", "lead");
        let merged = Context::merged(&base.base, &overrides.base);
        assert_eq!(merged.get("name"), Some(&Value::from("Ana")));
        assert_eq!(merged.get("role"), Some(&Value::from("lead")));
    }

    #[test]
    fn inner_frames_shadow_without_touching_outer() {
        let ctx = Context::new().with("item", "outer");
        let mut scope = Scope::new(&ctx);
        let mut frame = Map::new();
        frame.insert("item".into(), Value::from("inner"));
        scope.push(frame);
        assert_eq!(scope.lookup("item"), Some(&Value::from("inner")));
        scope.pop();
        assert_eq!(scope.lookup("item"), Some(&Value::from("outer")));
        assert_eq!(ctx.get("item"), Some(&Value::from("outer")));
        assert_eq!(scope.depth(), 0);
    }
}
