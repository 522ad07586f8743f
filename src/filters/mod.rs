use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, OnceLock};

use crate::ast::FilterCall;
use crate::errors::RenderError;
use crate::value::Value;

mod builtins;

/// A post-processing step applied with `value|name(args)`.
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> RangeInclusive<usize>;
    fn apply(&self, input: Value, args: &[Value]) -> Result<Value, RenderError>;
}

/// Thread-safe, read-only filter table.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Filter>>>,
}

impl Registry {
    pub fn with_builtins() -> Self {
        let filters: [Arc<dyn Filter>; 12] = [
            Arc::new(builtins::Join),
            Arc::new(builtins::Thousands),
            Arc::new(builtins::Upper),
            Arc::new(builtins::Lower),
            Arc::new(builtins::Title),
            Arc::new(builtins::Capitalize),
            Arc::new(builtins::Trim),
            Arc::new(builtins::Replace),
            Arc::new(builtins::Length),
            Arc::new(builtins::First),
            Arc::new(builtins::Last),
            Arc::new(builtins::Unique),
        ];
        let map = filters.into_iter().map(|f| (f.name(), f)).collect();
        Self {
            inner: Arc::new(map),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.inner.get(name).cloned()
    }

    /// Sorted filter names.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.inner.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// The registry every template is parsed and rendered against.
pub fn builtins() -> &'static Registry {
    static BUILTINS: OnceLock<Registry> = OnceLock::new();
    BUILTINS.get_or_init(Registry::with_builtins)
}

/// Parse-time validation of a filter name and its argument count.
pub(crate) fn check_call(name: &str, argc: usize) -> Result<(), String> {
    let filter = builtins()
        .get(name)
        .ok_or_else(|| format!("unknown filter `{name}`"))?;
    let arity = filter.arity();
    if arity.contains(&argc) {
        Ok(())
    } else if arity.start() == arity.end() {
        Err(format!(
            "filter `{name}` takes {} argument(s), got {argc}",
            arity.start()
        ))
    } else {
        Err(format!(
            "filter `{name}` takes {} to {} arguments, got {argc}",
            arity.start(),
            arity.end()
        ))
    }
}

/// Run a filter call. Parsed templates were already checked by [`check_call`];
/// hand-built ASTs are checked again here.
pub(crate) fn apply(call: &FilterCall, input: Value) -> Result<Value, RenderError> {
    match builtins().get(&call.name) {
        Some(filter) if filter.arity().contains(&call.args.len()) => {
            filter.apply(input, &call.args)
        }
        Some(_) => Err(RenderError::type_error(
            format!("filter `{}` with {} argument(s)", call.name, call.args.len()),
            input.kind(),
        )),
        None => Err(RenderError::type_error(
            format!("unknown filter `{}`", call.name),
            input.kind(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_names() {
        assert_eq!(
            builtins().names(),
            vec![
                "capitalize",
                "first",
                "join",
                "last",
                "length",
                "lower",
                "replace",
                "thousands",
                "title",
                "trim",
                "unique",
                "upper",
            ]
        );
    }

    #[test]
    fn arity_is_checked() {
        assert!(check_call("join", 0).is_ok());
        assert!(check_call("join", 1).is_ok());
        assert_eq!(
            check_call("join", 2).unwrap_err(),
            "filter `join` takes 0 to 1 arguments, got 2"
        );
        assert_eq!(
            check_call("upper", 1).unwrap_err(),
            "filter `upper` takes 0 argument(s), got 1"
        );
        assert_eq!(check_call("nope", 0).unwrap_err(), "unknown filter `nope`");
    }

    #[test]
    fn apply_rechecks_arity_of_hand_built_calls() {
        let call = FilterCall {
            name: "replace".into(),
            args: vec![],
        };
        assert_eq!(
            apply(&call, Value::from("abc")).unwrap_err(),
            RenderError::type_error("filter `replace` with 0 argument(s)", "string")
        );

        let call = FilterCall {
            name: "shout".into(),
            args: vec![],
        };
        assert!(apply(&call, Value::from("abc")).is_err());
    }
}
