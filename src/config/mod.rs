//! Configuration management for `infratest`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`INFRATEST_*`, plus `AWS_REGION`,
//!    `AZURE_LOCATION`, `GCP_REGION`, `GCP_PROJECT`)
//! 3. Project config (`infratest.yaml`, `INFRATEST_CONFIG`, or `--config`)
//! 4. User config (`~/.config/infratest/config.yaml`)
//! 5. Defaults

use crate::error::{HarnessError, Result};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Project config file looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "infratest.yaml";

/// Env var naming an explicit project config file.
pub const CONFIG_ENV: &str = "INFRATEST_CONFIG";

const ENV_PREFIX: &str = "INFRATEST_";

/// Provider env vars honored as aliases for their config keys.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("AWS_REGION", "aws.region"),
    ("AZURE_LOCATION", "azure.location"),
    ("GCP_REGION", "gcp.region"),
    ("GCP_PROJECT", "gcp.project"),
];

pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_AZURE_LOCATION: &str = "eastus";
pub const DEFAULT_GCP_REGION: &str = "us-central1";

/// One configuration source as a flat `key -> value` map.
///
/// Nested YAML keys are flattened with dots (`aws.region`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// First value found under any of `keys`, compared after normalization.
    #[must_use]
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.values.get(&normalize_key(key)))
            .map(String::as_str)
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// # Errors
    ///
    /// Returns an error if `contents` is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.insert(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs shaped like environment vars.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut aliased = Self::default();
        let mut prefixed = Self::default();

        for (key, value) in vars {
            let key = key.as_ref();
            let value = value.into();
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                for variant in env_key_variants(stripped) {
                    prefixed.insert(&variant, value.clone());
                }
            } else if let Some((_, config_key)) =
                ENV_ALIASES.iter().find(|(name, _)| *name == key)
            {
                if !value.trim().is_empty() {
                    aliased.insert(config_key, value);
                }
            }
        }

        // INFRATEST_AWS_REGION beats AWS_REGION.
        Self::merge_layers(&[aliased, prefixed])
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub terraform_bin: Option<PathBuf>,
    pub modules_root: Option<PathBuf>,
    pub no_color: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(bin) = &self.terraform_bin {
            layer.insert("terraform-bin", bin.to_string_lossy());
        }
        if let Some(root) = &self.modules_root {
            layer.insert("modules-root", root.to_string_lossy());
        }
        if let Some(no_color) = self.no_color {
            layer.insert("no-color", no_color.to_string());
        }

        layer
    }
}

/// Load project config.
///
/// An explicit path (from `--config` or `INFRATEST_CONFIG`) must exist; the
/// implicit `infratest.yaml` in `cwd` is optional.
///
/// # Errors
///
/// Returns an error if an explicit file is missing, or any file cannot be
/// read or parsed.
pub fn load_project_config(explicit: Option<&Path>, cwd: &Path) -> Result<ConfigLayer> {
    let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
    match explicit.map(Path::to_path_buf).or(from_env) {
        Some(path) if !path.exists() => Err(HarnessError::config(format!(
            "config file not found: {}",
            path.display()
        ))),
        Some(path) => ConfigLayer::from_yaml(&path),
        None => ConfigLayer::from_yaml(&cwd.join(PROJECT_CONFIG_FILE)),
    }
}

/// Load user config (~/.config/infratest/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("infratest")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.insert("terraform-bin", "terraform");
    layer.insert("modules-root", "modules");
    layer.insert("no-color", "true");
    layer.insert("aws.region", DEFAULT_AWS_REGION);
    layer.insert("azure.location", DEFAULT_AZURE_LOCATION);
    layer.insert("gcp.region", DEFAULT_GCP_REGION);
    layer
}

/// Load every layer and merge with the standard precedence.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(cli: &CliOverrides) -> Result<ConfigLayer> {
    let cwd = env::current_dir()?;
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = load_project_config(cli.config.as_deref(), &cwd)?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, env_layer, cli_layer,
    ]))
}

/// Resolved settings used by the harness and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub terraform_bin: PathBuf,
    pub modules_root: PathBuf,
    pub no_color: bool,
    pub aws_region: String,
    pub azure_location: String,
    pub gcp_region: String,
    pub gcp_project: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            terraform_bin: PathBuf::from("terraform"),
            modules_root: PathBuf::from("modules"),
            no_color: true,
            aws_region: DEFAULT_AWS_REGION.to_string(),
            azure_location: DEFAULT_AZURE_LOCATION.to_string(),
            gcp_region: DEFAULT_GCP_REGION.to_string(),
            gcp_project: None,
        }
    }
}

impl HarnessConfig {
    /// Load from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is unreadable or a value is invalid.
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        Self::from_layer(&load_config(cli)?)
    }

    /// Load from environment and config files only, for use inside tests.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is unreadable or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::load(&CliOverrides::default())
    }

    /// Resolve a merged layer. Keys missing from the layer keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `no-color` is not a recognizable boolean.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let defaults = Self::default();
        let string = |keys: &[&str], fallback: String| {
            non_empty(layer.get(keys)).map_or(fallback, str::to_string)
        };

        let no_color = match layer.get(&["no-color"]) {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                HarnessError::config(format!("no-color: expected a boolean, got '{raw}'"))
            })?,
            None => defaults.no_color,
        };

        Ok(Self {
            terraform_bin: non_empty(layer.get(&["terraform-bin", "terraform.bin"]))
                .map_or(defaults.terraform_bin, PathBuf::from),
            modules_root: non_empty(layer.get(&["modules-root", "modules.root"]))
                .map_or(defaults.modules_root, PathBuf::from),
            no_color,
            aws_region: string(&["aws.region"], defaults.aws_region),
            azure_location: string(&["azure.location"], defaults.azure_location),
            gcp_region: string(&["gcp.region"], defaults.gcp_region),
            gcp_project: non_empty(layer.get(&["gcp.project"])).map(str::to_string),
        })
    }

    /// Resolve a module path.
    ///
    /// Absolute paths and paths that exist as given are used unchanged;
    /// anything else is taken relative to `modules_root`.
    #[must_use]
    pub fn resolve_module(&self, module: &Path) -> PathBuf {
        if module.is_absolute() || module.exists() {
            module.to_path_buf()
        } else {
            self.modules_root.join(module)
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn env_key_variants(raw: &str) -> Vec<String> {
    let raw_lower = raw.to_lowercase();
    vec![
        raw_lower.clone(),
        raw_lower.replace('_', "."),
        raw_lower.replace('_', "-"),
    ]
}

/// Parse a boolean flag value the way config files and env vars spell it.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
