//! Core data types for `infratest`.
//!
//! - `Value` / `VarBag` - typed variable tree handed to a module
//! - `RunOptions` - one module invocation (directory, variables, environment)
//! - `OutputBag` - outputs read back after apply
//! - `ApplySummary` / `DestroySummary` - resource counts reported by the tool

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A module variable value.
///
/// Modules accept heterogeneous nested data. Keeping it as a closed variant
/// tree makes every call site explicit about what it passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a list from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a map from `(key, value)` pairs.
    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Self>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// An empty list (e.g. `enabled_cluster_log_types = []`).
    #[must_use]
    pub const fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// An empty map (e.g. `subnets = {}`).
    #[must_use]
    pub const fn empty_map() -> Self {
        Self::Map(BTreeMap::new())
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Self::Number(serde_json::Number::from(value))
                }
            }
        )*
    };
}

value_from_int!(i32, i64, u16, u32, u64, usize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

impl<T: Into<Self>> From<BTreeMap<String, T>> for Value {
    fn from(entries: BTreeMap<String, T>) -> Self {
        Self::map(entries)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::list(items),
            serde_json::Value::Object(map) => Self::map(map),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

/// Input variables for one module invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarBag(BTreeMap<String, Value>);

impl VarBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Read a boolean flag such as `enable_logs_key`. Missing or non-bool is `false`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(Value::Bool(true)))
    }

    /// Read a string variable.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge `other` on top of this bag (other wins).
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Render as a `.tfvars.json` document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_tfvars_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VarBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl TryFrom<serde_json::Value> for VarBag {
    type Error = HarnessError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(HarnessError::invalid_variables(format!(
                "expected an object of variables, got {}",
                Value::from(other).kind()
            ))),
        }
    }
}

/// One module invocation: where, with what variables, under what environment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunOptions {
    pub module_dir: PathBuf,
    #[serde(default)]
    pub vars: VarBag,
    #[serde(default, rename = "env")]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub no_color: bool,
    /// Private copy of the module the tool runs in, when isolated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name, value);
        self
    }

    #[must_use]
    pub fn vars(mut self, vars: VarBag) -> Self {
        self.vars.extend(vars);
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub const fn no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// Run in `dir` instead of the module directory.
    #[must_use]
    pub fn in_workspace(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace = Some(dir.into());
        self
    }

    #[must_use]
    pub fn module(&self) -> &Path {
        &self.module_dir
    }

    /// Where the tool runs: the workspace copy if any, else the module.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        self.workspace.as_deref().unwrap_or(&self.module_dir)
    }
}

const REDACTED: &str = "(sensitive)";

/// A single output as reported by `terraform output -json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    pub value: serde_json::Value,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<serde_json::Value>,
}

impl OutputValue {
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self {
            value,
            sensitive: false,
            type_hint: None,
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "map",
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => Some(String::new()),
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

/// All outputs of one module, read after apply.
///
/// A name that is absent is a `OutputMissing` error. A name that is present
/// with a `null`/empty value reads back as empty, never as missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputBag {
    #[serde(skip)]
    module: PathBuf,
    #[serde(flatten)]
    outputs: BTreeMap<String, OutputValue>,
}

impl OutputBag {
    pub fn new(module: impl Into<PathBuf>, outputs: BTreeMap<String, OutputValue>) -> Self {
        Self {
            module: module.into(),
            outputs,
        }
    }

    /// Parse the document printed by `terraform output -json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object of outputs.
    pub fn from_json(module: impl Into<PathBuf>, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let outputs = if trimmed.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(trimmed)?
        };
        Ok(Self::new(module, outputs))
    }

    /// Build a bag from a plain `{name: value}` object (no metadata).
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is not an object.
    pub fn from_values(module: impl Into<PathBuf>, values: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = values else {
            return Err(HarnessError::invalid_variables(format!(
                "expected an object of outputs, got {}",
                json_kind(&values)
            )));
        };
        Ok(Self::new(
            module,
            map.into_iter()
                .map(|(k, v)| (k, OutputValue::new(v)))
                .collect(),
        ))
    }

    #[must_use]
    pub fn module(&self) -> &Path {
        &self.module
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Raw JSON value of an output.
    ///
    /// # Errors
    ///
    /// Returns `OutputMissing` if the module has no such output.
    pub fn raw(&self, name: &str) -> Result<&serde_json::Value> {
        self.outputs
            .get(name)
            .map(|o| &o.value)
            .ok_or_else(|| HarnessError::OutputMissing {
                name: name.to_string(),
                module: self.module.clone(),
            })
    }

    /// Read a scalar output. `null` reads as `""`.
    ///
    /// # Errors
    ///
    /// Returns `OutputMissing` for unknown names and `OutputShape` for lists/maps.
    pub fn scalar(&self, name: &str) -> Result<String> {
        let value = self.raw(name)?;
        scalar_to_string(value).ok_or_else(|| HarnessError::OutputShape {
            name: name.to_string(),
            expected: "scalar",
            found: json_kind(value),
        })
    }

    /// Read a list output. `null` reads as an empty list.
    ///
    /// # Errors
    ///
    /// Returns `OutputMissing` for unknown names and `OutputShape` for anything
    /// other than a list of scalars.
    pub fn list(&self, name: &str) -> Result<Vec<String>> {
        let value = self.raw(name)?;
        let shape_err = |found| HarnessError::OutputShape {
            name: name.to_string(),
            expected: "list",
            found,
        };
        match value {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| scalar_to_string(item).ok_or_else(|| shape_err(json_kind(item))))
                .collect(),
            other => Err(shape_err(json_kind(other))),
        }
    }

    /// Read a map output. `null` reads as an empty map.
    ///
    /// # Errors
    ///
    /// Returns `OutputMissing` for unknown names and `OutputShape` for anything
    /// other than a map of scalars.
    pub fn map(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let value = self.raw(name)?;
        let shape_err = |found| HarnessError::OutputShape {
            name: name.to_string(),
            expected: "map",
            found,
        };
        match value {
            serde_json::Value::Null => Ok(BTreeMap::new()),
            serde_json::Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| {
                    scalar_to_string(v)
                        .map(|s| (k.clone(), s))
                        .ok_or_else(|| shape_err(json_kind(v)))
                })
                .collect(),
            other => Err(shape_err(json_kind(other))),
        }
    }

    /// Whether the module marked an output sensitive.
    ///
    /// # Errors
    ///
    /// Returns `OutputMissing` if the module has no such output.
    pub fn is_sensitive(&self, name: &str) -> Result<bool> {
        self.raw(name)?;
        Ok(self.outputs.get(name).is_some_and(|o| o.sensitive))
    }

    /// One output for display, `"(sensitive)"` if the module marked it so.
    ///
    /// # Errors
    ///
    /// Returns `OutputMissing` if the module has no such output.
    pub fn redacted(&self, name: &str) -> Result<serde_json::Value> {
        let value = self.raw(name)?;
        Ok(if self.is_sensitive(name)? {
            serde_json::Value::String(REDACTED.to_string())
        } else {
            value.clone()
        })
    }

    /// Plain `{name: value}` view, sensitive values redacted.
    #[must_use]
    pub fn to_redacted_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.outputs
                .iter()
                .map(|(k, o)| {
                    let v = if o.sensitive {
                        serde_json::Value::String(REDACTED.to_string())
                    } else {
                        o.value.clone()
                    };
                    (k.clone(), v)
                })
                .collect(),
        )
    }
}

/// Resource counts from a completed apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ApplySummary {
    pub added: u32,
    pub changed: u32,
    pub destroyed: u32,
    #[serde(skip)]
    pub duration: Duration,
}

/// Resource counts from a completed destroy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DestroySummary {
    pub destroyed: u32,
    #[serde(skip)]
    pub duration: Duration,
}

impl DestroySummary {
    /// Nothing was left to destroy.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.destroyed == 0
    }
}
