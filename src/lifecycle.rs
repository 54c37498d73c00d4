use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::{Captures, Regex};
use serde::Deserialize;
use toml::Value;
use tracing::debug;

use crate::config::Configuration;

/// Named lifecycle fields a configuration may define.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    Start,
    Build,
    Publish,
}

impl Lifecycle {
    pub const ALL: [Lifecycle; 3] = [Lifecycle::Start, Lifecycle::Build, Lifecycle::Publish];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Start => "start",
            Lifecycle::Build => "build",
            Lifecycle::Publish => "publish",
        }
    }
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("placeholder pattern is valid")
});

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptValue {
    Command(String),
    Sequence(Vec<String>),
}

/// An invocable lifecycle field: one shell command or an ordered list of them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Script {
    commands: Vec<String>,
}

impl Script {
    /// `None` when the value is not something that can be invoked.
    pub fn from_value(value: &Value) -> Option<Script> {
        let commands = match ScriptValue::deserialize(value.clone()).ok()? {
            ScriptValue::Command(command) => vec![command],
            ScriptValue::Sequence(commands) => commands,
        };

        if commands.is_empty() || commands.iter().any(|c| c.trim().is_empty()) {
            return None;
        }
        Some(Script { commands })
    }

    /// Commands with `{{ field }}` placeholders filled from sibling fields.
    pub fn render(&self, config: &Configuration) -> Result<Vec<String>> {
        self.commands
            .iter()
            .map(|command| interpolate(command, config))
            .collect()
    }
}

fn interpolate(command: &str, config: &Configuration) -> Result<String> {
    let mut missing: Option<String> = None;
    let rendered = PLACEHOLDER.replace_all(command, |caps: &Captures| {
        let name = &caps[1];
        config.scalar(name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| name.to_owned());
            String::new()
        })
    });

    if let Some(name) = missing {
        bail!("placeholder `{{{{{name}}}}}` does not name a scalar config field");
    }
    Ok(rendered.into_owned())
}

/// `TOOL_<NAME>` variables exported to lifecycle commands, one per scalar field.
/// Fields the OS cannot carry in an environment block are left out.
pub fn environment(config: &Configuration) -> Vec<(String, String)> {
    config
        .scalar_fields()
        .into_iter()
        .filter_map(|(name, value)| {
            let key = env_key(name);
            if key.contains(['\0', '=']) || value.contains('\0') {
                debug!(field = name, "not exporting field to the environment");
                return None;
            }
            Some((key, value))
        })
        .collect()
}

fn env_key(name: &str) -> String {
    let mut key = String::from("TOOL_");
    for c in name.chars() {
        match c {
            '-' | '.' => key.push('_'),
            other => key.extend(other.to_uppercase()),
        }
    }
    key
}
