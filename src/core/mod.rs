// Author: Dustin Pilgrim
// License: MIT

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod host_msg;
pub mod info;
pub mod oracle;
pub mod script;
pub mod state;
pub mod timer;

#[cfg(test)]
mod controller_tests;
