// Author: Dustin Pilgrim
// License: MIT

use crate::core::config::IdleConfig;
use crate::services::gcode::{DEFAULT_SCRIPT_COMMAND, DEFAULT_SCRIPT_TIMEOUT};
use crate::services::toolhead::DEFAULT_LOOKAHEAD_FLUSH;

/// Everything the daemon reads from the config file.
#[derive(Debug, Clone)]
pub struct QuiesceConfig {
    pub idle: IdleConfig,
    /// Shell command that receives the rendered shutdown script on stdin.
    pub script_command: String,
    /// Seconds the script command may run before it is killed.
    pub script_timeout: f64,
    pub lookahead_flush: f64,
}

impl Default for QuiesceConfig {
    fn default() -> Self {
        Self {
            idle: IdleConfig::default(),
            script_command: DEFAULT_SCRIPT_COMMAND.to_string(),
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
            lookahead_flush: DEFAULT_LOOKAHEAD_FLUSH,
        }
    }
}
