//! YAML-backed parameter store.
//!
//! A parameter file is a flat, human-editable YAML mapping. Values may be any
//! [`Value`] shape. The store keeps keys in file order and writes them back in
//! the same order.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::context::Context;
use crate::engine::render_text;
use crate::errors::{Result, StoreError};
use crate::value::{Map, Value};

/// Parameter file used by the CLI when none is given.
pub const DEFAULT_FILE: &str = "params.yaml";

/// An ordered set of named parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    params: Map,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(params: Map) -> Self {
        Self { params }
    }

    /// Load a parameter file. An empty (or comment-only) file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, StoreError> {
        let path = path.as_ref();
        let params = read_map(path)?;
        info!(path = %path.display(), params = params.len(), "loaded parameters");
        Ok(Self { params })
    }

    /// Write a starter file with placeholder values and return its store.
    pub fn create_default(path: impl AsRef<Path>) -> std::result::Result<Self, StoreError> {
        let path = path.as_ref();
        let mut params = Map::new();
        for (key, placeholder) in [
            ("name", "Your Name"),
            ("email", "your.email@example.com"),
            ("role", "Your Role"),
            ("company", "Your Company"),
            ("address", "Your Address"),
        ] {
            params.insert(key.to_string(), Value::from(placeholder));
        }
        let store = Self { params };
        let header = format!(
            "# paramforge parameters\n# Created: {}\n# Edit this file to add your own parameters\n\n",
            path.display()
        );
        store.write(path, Some(header))?;
        Ok(store)
    }

    /// Save as YAML, optionally with a short comment header.
    pub fn save(&self, path: impl AsRef<Path>, include_comments: bool) -> std::result::Result<(), StoreError> {
        let path = path.as_ref();
        let header = include_comments
            .then(|| format!("# paramforge parameters\n# File: {}\n\n", path.display()));
        self.write(path, header)
    }

    fn write(&self, path: &Path, header: Option<String>) -> std::result::Result<(), StoreError> {
        let body = serde_yaml::to_string(&self.params).map_err(|source| StoreError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        let mut text = header.unwrap_or_default();
        if !self.params.is_empty() {
            text.push_str(&body);
        }
        fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), params = self.params.len(), "saved parameters");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Insert or overwrite; an overwritten key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.params.shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &Map {
        &self.params
    }

    /// Merge `other` into the store, later keys overwriting. Returns how many
    /// keys were new.
    pub fn merge(&mut self, other: Map) -> usize {
        let before = self.params.len();
        self.params.extend(other);
        let added = self.params.len() - before;
        debug!(added, total = self.params.len(), "merged parameters");
        added
    }

    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> std::result::Result<usize, StoreError> {
        let other = read_map(path.as_ref())?;
        Ok(self.merge(other))
    }

    /// Render context: stored parameters overlaid by call-time `overrides`.
    pub fn context(&self, overrides: &Map) -> Context {
        Context::merged(&self.params, overrides)
    }

    pub fn render(&self, source: &str, overrides: &Map) -> Result<String> {
        render_text(source, &self.context(overrides))
    }

    pub fn render_file(&self, path: impl AsRef<Path>, overrides: &Map) -> Result<String> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.render(&source, overrides)
    }
}

impl From<Map> for ParameterStore {
    fn from(params: Map) -> Self {
        Self::from_map(params)
    }
}

fn read_map(path: &Path) -> std::result::Result<Map, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let blank = text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(Map::new());
    }
    let doc: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|source| StoreError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    match from_yaml(doc, path)? {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(StoreError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Convert a YAML document into a [`Value`]. Scalar mapping keys such as
/// `2024: year` become strings; tags are dropped.
fn from_yaml(doc: serde_yaml::Value, path: &Path) -> std::result::Result<Value, StoreError> {
    use serde_yaml::Value as Yaml;
    Ok(match doc {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Seq(
            items
                .into_iter()
                .map(|item| from_yaml(item, path))
                .collect::<std::result::Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key, path)?, from_yaml(value, path)?);
            }
            Value::Map(map)
        }
        Yaml::Tagged(tagged) => from_yaml(tagged.value, path)?,
    })
}

fn yaml_key(key: serde_yaml::Value, path: &Path) -> std::result::Result<String, StoreError> {
    match from_yaml(key, path)? {
        Value::String(s) => Ok(s),
        container @ (Value::Seq(_) | Value::Map(_)) => Err(StoreError::UnsupportedKey {
            path: path.to_path_buf(),
            kind: container.kind(),
        }),
        scalar => Ok(scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_overwrites_in_place_and_remove_keeps_order() {
        let mut store = ParameterStore::new();
        store.set("a", 1);
        store.set("b", 2);
        store.set("c", 3);
        store.set("a", 10);
        assert_eq!(store.remove("b"), Some(Value::Int(2)));
        assert_eq!(store.params().keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(store.get("a"), Some(&Value::Int(10)));
        assert_eq!(store.remove("zzz"), None);
    }

    #[test]
    fn merge_counts_new_keys() {
        let mut store = ParameterStore::new();
        store.set("name", "Ana");
        let mut other = Map::new();
        other.insert("name".into(), Value::from("Bea"));
        other.insert("team".into(), Value::from("core"));
        assert_eq!(store.merge(other), 1);
        assert_eq!(store.get("name"), Some(&Value::from("Bea")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn scalar_yaml_keys_become_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("years.yaml");
        fs::write(&path, "name: Ana\n2024: year\ntrue: yes\n3.5: ratio\n").unwrap();
        let store = ParameterStore::load(&path).unwrap();
        assert_eq!(
            store.params().keys().collect::<Vec<_>>(),
            vec!["name", "2024", "True", "3.5"]
        );
        assert_eq!(store.get("2024"), Some(&Value::from("year")));
    }

    #[test]
    fn container_yaml_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "? [a, b]\n: pair\n").unwrap();
        assert!(matches!(
            ParameterStore::load(&path),
            Err(StoreError::UnsupportedKey { kind: "sequence", .. })
        ));
    }

    #[test]
    fn render_with_overrides() {
        let mut store = ParameterStore::new();
        store.set("name", "Ana");
        store.set("tone", "formal");
        let mut overrides = Map::new();
        overrides.insert("tone".into(), Value::from("casual"));
        let out = store.render("{{name}} / {{tone}}", &overrides).unwrap();
        assert_eq!(out, "Ana / casual");
    }
}
