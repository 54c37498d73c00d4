use std::collections::HashMap;
use std::fmt::Write as _;
use std::{fs, io};

use anyhow::{Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use toml::{Table, Value};
use tracing::{debug, trace};

use crate::lifecycle::{Lifecycle, Script};
use crate::templates;

/// File looked up in the working directory on every resolution.
pub const CONFIG_FILENAME: &str = "tool.config.toml";

const EXAMPLE_TEMPLATE: &str = "tool.config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path}")]
    NotFound { path: Utf8PathBuf },
    #[error("failed to load configuration from {path}")]
    Load {
        path: Utf8PathBuf,
        #[source]
        source: LoadCause,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Utf8Path {
        match self {
            ConfigError::NotFound { path } | ConfigError::Load { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadCause {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

/// User-authored record from `tool.config.toml`. Kept as the raw top-level table;
/// consumers decide which fields they care about.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    fields: Table,
}

impl Configuration {
    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        let fields: Table = toml::from_str(raw)?;
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn port(&self) -> Option<i64> {
        self.fields.get("port").and_then(Value::as_integer)
    }

    /// String form of a string, integer, float or boolean field.
    pub fn scalar(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(scalar_to_string)
    }

    pub fn scalar_fields(&self) -> Vec<(&str, String)> {
        let mut fields: Vec<(&str, String)> = self
            .fields
            .iter()
            .filter_map(|(name, value)| scalar_to_string(value).map(|v| (name.as_str(), v)))
            .collect();
        fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
        fields
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let port = self
            .port()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "<unset>".to_owned());
        let _ = writeln!(out, "Port: {}", port);

        let scripts: Vec<&str> = Lifecycle::ALL
            .iter()
            .map(Lifecycle::as_str)
            .filter(|name| self.get(name).and_then(Script::from_value).is_some())
            .collect();
        let scripts = if scripts.is_empty() {
            "none".to_owned()
        } else {
            scripts.join(", ")
        };
        let _ = writeln!(out, "Lifecycle scripts: {}", scripts);

        for name in self.field_names() {
            if let Some(value) = self.get(name) {
                let _ = writeln!(out, "  - {} ({})", name, value.type_str());
            }
        }
        out
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(format_float(*f)),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whole floats keep their `.0` so `1.0` does not render as `1`.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Locates and loads `tool.config.toml`. Every call re-reads the file; the
/// per-path cache is only a record of the last load and is dropped first.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    cache: HashMap<Utf8PathBuf, Configuration>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_path(working_directory: &Utf8Path) -> Utf8PathBuf {
        let joined = working_directory.join(CONFIG_FILENAME);
        if joined.is_absolute() {
            return joined;
        }
        std::path::absolute(&joined)
            .ok()
            .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
            .unwrap_or(joined)
    }

    pub fn resolve(&mut self, working_directory: &Utf8Path) -> Result<Configuration, ConfigError> {
        let path = Self::config_path(working_directory);
        if self.invalidate(&path) {
            trace!(%path, "discarded cached configuration");
        }

        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }

        let config = load_from_path(&path)?;
        debug!(%path, "loaded configuration");
        self.cache.insert(path, config.clone());
        Ok(config)
    }

    pub fn cached(&self, path: &Utf8Path) -> Option<&Configuration> {
        self.cache.get(path)
    }

    /// Returns whether an entry was present.
    pub fn invalidate(&mut self, path: &Utf8Path) -> bool {
        self.cache.remove(path).is_some()
    }
}

/// Read and parse a configuration file. A missing file is always `NotFound`,
/// even when it disappears after an existence check.
pub fn load_from_path(path: &Utf8Path) -> Result<Configuration, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_owned(),
        },
        _ => ConfigError::Load {
            path: path.to_owned(),
            source: err.into(),
        },
    })?;

    Configuration::parse(&raw).map_err(|err| ConfigError::Load {
        path: path.to_owned(),
        source: err.into(),
    })
}

pub fn write_example_config(path: &Utf8Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        bail!("{} already exists; rerun with --force to overwrite", path);
    }

    templates::write_template(path, EXAMPLE_TEMPLATE)
}
