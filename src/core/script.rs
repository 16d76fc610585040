// Author: Dustin Pilgrim
// License: MIT

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::ScriptError;

pub const DEFAULT_SHUTDOWN_SCRIPT: &str = "TURN_OFF_HEATERS\nM84";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").expect("valid placeholder regex"));

/// Values a shutdown template may reference as `{ name }`.
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    vars: BTreeMap<String, String>,
}

impl ScriptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Unrendered shutdown script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    source: String,
}

impl ScriptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &ScriptContext) -> Result<String, ScriptError> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.source) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];

            let value = ctx
                .get(name)
                .ok_or_else(|| ScriptError::UnknownVariable(name.to_string()))?;

            out.push_str(&self.source[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }

        out.push_str(&self.source[last..]);
        Ok(out)
    }
}

impl Default for ScriptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_SCRIPT)
    }
}

/// Runs a rendered shutdown script against the machine.
pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, script: &str) -> Result<(), ScriptError>;
}
