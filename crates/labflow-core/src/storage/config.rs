//! TOML-based application configuration.
//!
//! Stores:
//! - Loop behavior (failure policy, confirmation, iteration limits)
//! - Invocation timeouts, globally and per action
//! - The recipes file name
//! - The equipment list used to build the device registry
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::data_dir;
use crate::actions::TimeoutPolicy;
use crate::devices::EquipmentConfig;
use crate::error::ConfigError;
use crate::sweep::{FailurePolicy, SweepLimits};

/// Tables whose keys are user-defined, so `set` may add new entries.
const OPEN_TABLES: &[&str] = &["invoker.timeouts"];

/// Loop execution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Ask before a loop starts touching instruments.
    #[serde(default = "default_true")]
    pub confirm_before_start: bool,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Pause between recipes in a multi sweep, in seconds.
    #[serde(default)]
    pub recipe_delay_secs: f64,
}

/// Invoker configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvokerConfig {
    /// Bound for every action without its own; 0 means unbounded.
    #[serde(default)]
    pub default_timeout_secs: f64,
    /// Per-action bounds in seconds.
    #[serde(default)]
    pub timeouts: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// File name inside the data directory.
    #[serde(default = "default_recipes_file")]
    pub file: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "loop")]
    pub loop_: LoopConfig,
    #[serde(default)]
    pub invoker: InvokerConfig,
    #[serde(default)]
    pub recipes: RecipesConfig,
    #[serde(default = "default_equipment")]
    pub equipment: Vec<EquipmentConfig>,
}

fn default_true() -> bool {
    true
}
fn default_max_iterations() -> usize {
    crate::sweep::spec::DEFAULT_MAX_ITERATIONS
}
fn default_tolerance() -> f64 {
    crate::sweep::spec::DEFAULT_TOLERANCE
}
fn default_recipes_file() -> String {
    "recipes.toml".into()
}
fn default_equipment() -> Vec<EquipmentConfig> {
    vec![
        EquipmentConfig {
            id: "laser-01".into(),
            kind: "Toptica Laser".into(),
            driver: "simulated".into(),
            address: None,
        },
        EquipmentConfig {
            id: "cryo-01".into(),
            kind: "Montana Cryostation".into(),
            driver: "simulated".into(),
            address: None,
        },
    ]
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            confirm_before_start: true,
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            recipe_delay_secs: 0.0,
        }
    }
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            file: default_recipes_file(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loop_: LoopConfig::default(),
            invoker: InvokerConfig::default(),
            recipes: RecipesConfig::default(),
            equipment: default_equipment(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut Value, key: &str, value: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let open = parent_path.is_some_and(|p| OPEN_TABLES.contains(&p));
        let obj = current.as_object_mut().ok_or_else(unknown)?;

        let new_value = match obj.get(leaf) {
            Some(Value::Bool(_)) => Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            Some(Value::Number(_)) => parse_number(value).ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
            Some(Value::Object(_)) | Some(Value::Array(_)) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            Some(_) => Value::String(value.into()),
            None if open => parse_number(value).ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?,
            None => return Err(unknown()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Path of the config file in the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::DataDir(e.to_string()))?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, keeping the existing type.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation. The config is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf value as `(dot.path, value)`, in declaration order.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            flatten("", &json, &mut out);
        }
        out
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.loop_.max_iterations == 0 {
            return invalid("loop.max_iterations", "must be at least 1");
        }
        if !(self.loop_.tolerance.is_finite() && self.loop_.tolerance >= 0.0) {
            return invalid("loop.tolerance", "must be a non-negative number");
        }
        let secs = [
            ("loop.recipe_delay_secs".to_string(), self.loop_.recipe_delay_secs),
            ("invoker.default_timeout_secs".to_string(), self.invoker.default_timeout_secs),
        ]
        .into_iter()
        .chain(self.invoker.timeouts.iter().map(|(k, v)| (format!("invoker.timeouts.{k}"), *v)));
        for (key, value) in secs {
            if Duration::try_from_secs_f64(value).is_err() {
                return invalid(&key, "must be a non-negative number of seconds within range");
            }
        }
        Ok(())
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.loop_.failure_policy
    }

    pub fn sweep_limits(&self) -> SweepLimits {
        SweepLimits {
            tolerance: self.loop_.tolerance,
            max_iterations: self.loop_.max_iterations,
        }
    }

    /// Out-of-range values (only reachable by bypassing `validate`) give no delay.
    pub fn recipe_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.loop_.recipe_delay_secs).unwrap_or_default()
    }

    /// Timeouts for the invoker. Zero or unrepresentable entries are treated
    /// as unbounded.
    pub fn timeout_policy(&self) -> TimeoutPolicy {
        let positive = |secs: f64| {
            Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|d| !d.is_zero())
        };
        TimeoutPolicy {
            default: positive(self.invoker.default_timeout_secs),
            overrides: self
                .invoker
                .timeouts
                .iter()
                .filter_map(|(action, secs)| positive(*secs).map(|d| (action.clone(), d)))
                .collect(),
        }
    }

    /// Recipes file path in the data directory.
    pub fn recipes_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::DataDir(e.to_string()))?;
        Ok(dir.join(&self.recipes.file))
    }
}

fn parse_number(value: &str) -> Option<Value> {
    if let Ok(n) = value.parse::<u64>() {
        Some(Value::Number(n.into()))
    } else {
        value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
