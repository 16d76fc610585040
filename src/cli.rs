// Author: Dustin Pilgrim
// License: MIT

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "quiesce",
    version = env!("CARGO_PKG_VERSION"),
    about = "Idle-timeout supervisor for motion-control hosts"
)]
pub struct Args {
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(short, long, action)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Display the idle state, print duration and timeout")]
    Status {
        #[arg(long)]
        json: bool,
    },

    #[command(about = "Change the idle timeout (seconds)", allow_negative_numbers = true)]
    SetTimeout {
        seconds: f64,
    },

    #[command(about = "Queue a simulated move lasting the given seconds")]
    Move {
        seconds: f64,
    },

    #[command(about = "Emergency stop: drop queued motion and stop idle monitoring")]
    Halt,

    #[command(about = "Stop the running daemon")]
    Stop,
}

impl Command {
    /// Wire form sent over the IPC socket.
    pub fn to_ipc(&self) -> String {
        match self {
            Command::Status { json: true } => "status --json".to_string(),
            Command::Status { json: false } => "status".to_string(),
            Command::SetTimeout { seconds } => format!("set-timeout {}", seconds),
            Command::Move { seconds } => format!("move {}", seconds),
            Command::Halt => "halt".to_string(),
            Command::Stop => "stop".to_string(),
        }
    }
}
