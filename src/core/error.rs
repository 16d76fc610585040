// Author: Dustin Pilgrim
// License: MIT

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A user-supplied setting was rejected; the previous value is kept.
    ///
    /// Examples:
    /// - `SET_IDLE_TIMEOUT TIMEOUT=0`
    /// - `SET_IDLE_TIMEOUT TIMEOUT=nan`
    InvalidConfig(ConfigError),

    /// The shutdown script could not be rendered or executed.
    ///
    /// Never escapes a tick: the controller logs it and retries.
    /// `power_down` hands it back to the caller.
    Script(ScriptError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositiveTimeout(f64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Template referenced a name the render context does not provide.
    UnknownVariable(String),

    /// The executor could not be started.
    Spawn(String),

    /// The executor ran but reported failure.
    Failed { code: Option<i32>, stderr: String },
}

// ---------------- Display ----------------

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(e) => write!(f, "{e}"),
            Error::Script(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveTimeout(v) =>
                write!(f, "timeout must be above 0 (got {v})"),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::UnknownVariable(name) =>
                write!(f, "unknown template variable '{name}'"),
            ScriptError::Spawn(msg) =>
                write!(f, "failed to start script executor: {msg}"),
            ScriptError::Failed { code: Some(code), stderr } if !stderr.is_empty() =>
                write!(f, "script exited with status {code}: {stderr}"),
            ScriptError::Failed { code: Some(code), .. } =>
                write!(f, "script exited with status {code}"),
            ScriptError::Failed { code: None, stderr } if !stderr.is_empty() =>
                write!(f, "script terminated: {stderr}"),
            ScriptError::Failed { code: None, .. } =>
                write!(f, "script terminated by signal"),
        }
    }
}

impl From<ScriptError> for Error {
    fn from(err: ScriptError) -> Self {
        Error::Script(err)
    }
}

impl std::error::Error for Error {}
impl std::error::Error for ScriptError {}
