// Author: Dustin Pilgrim
// License: MIT

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr, eyre};
use rune_cfg::RuneConfig;

use crate::config::model::QuiesceConfig;
use crate::core::config::{IdleConfig, validate_timeout};
use crate::core::script::ScriptTemplate;
use crate::qdebug;

pub const INTERNAL_DEFAULT: &str = include_str!("../../assets/quiesce.rune");

/// Keys may be written `snake_case` or `kebab-case`.
fn get_f64(config: &RuneConfig, key: &str) -> Option<f64> {
    let alt = key.replace('_', "-");
    config
        .get::<f64>(key)
        .or_else(|_| config.get::<f64>(&alt))
        .ok()
        .or_else(|| {
            config
                .get::<u64>(key)
                .or_else(|_| config.get::<u64>(&alt))
                .ok()
                .map(|v| v as f64)
        })
}

fn get_string(config: &RuneConfig, key: &str) -> Option<String> {
    config
        .get::<String>(key)
        .or_else(|_| config.get::<String>(&key.replace('_', "-")))
        .ok()
}

/// `gcode` is either a list of lines or one string with embedded newlines.
fn get_script(config: &RuneConfig, key: &str) -> Option<String> {
    config
        .get::<Vec<String>>(key)
        .ok()
        .map(|lines| lines.join("\n"))
        .or_else(|| get_string(config, key))
}

pub fn parse_quiesce_config(config: &RuneConfig) -> Result<QuiesceConfig> {
    let defaults = QuiesceConfig::default();

    let idle_timeout = match get_f64(config, "quiesce.timeout") {
        Some(t) => validate_timeout(t).wrap_err("invalid quiesce.timeout")?,
        None => defaults.idle.idle_timeout,
    };

    let gcode = get_script(config, "quiesce.gcode")
        .map(ScriptTemplate::new)
        .unwrap_or(defaults.idle.gcode);

    let script_command = get_string(config, "quiesce.script_command")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(defaults.script_command);

    let script_timeout = match get_f64(config, "quiesce.script_timeout") {
        Some(t) => validate_timeout(t).wrap_err("invalid quiesce.script_timeout")?,
        None => defaults.script_timeout,
    };

    let lookahead_flush = match get_f64(config, "quiesce.lookahead_flush") {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(v) => return Err(eyre!("invalid quiesce.lookahead_flush: {} (must be >= 0)", v)),
        None => defaults.lookahead_flush,
    };

    Ok(QuiesceConfig {
        idle: IdleConfig { idle_timeout, gcode },
        script_command,
        script_timeout,
        lookahead_flush,
    })
}

pub fn parse_str(source: &str) -> Result<QuiesceConfig> {
    let config = RuneConfig::from_str(source)
        .map_err(|e| eyre!("failed to parse config: {}", e))?;
    parse_quiesce_config(&config)
}

pub fn load_from_path(path: &Path) -> Result<QuiesceConfig> {
    let config = RuneConfig::from_file(path)
        .map_err(|e| eyre!("failed to load config from {}: {}", path.display(), e))?;
    qdebug!("Config", "loaded config from: {}", path.display());
    parse_quiesce_config(&config)
        .wrap_err_with(|| format!("invalid config in {}", path.display()))
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(mut p) = dirs::home_dir() {
        p.push(".config/quiesce/quiesce.rune");
        paths.push(p);
    }
    paths.push(PathBuf::from("/etc/quiesce/quiesce.rune"));
    paths
}

/// An explicit path must exist. Otherwise the user file wins over the system
/// file, and the embedded default is used when neither exists.
pub fn load_config(explicit: Option<&Path>) -> Result<QuiesceConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(eyre!("config file not found: {}", path.display()));
        }
        return load_from_path(path);
    }

    for path in search_paths() {
        if path.exists() {
            return load_from_path(&path);
        }
    }

    qdebug!("Config", "using internal default configuration");
    parse_str(INTERNAL_DEFAULT).wrap_err("failed to parse internal default config")
}
