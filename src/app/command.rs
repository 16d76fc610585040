// Author: Dustin Pilgrim
// License: MIT

use crate::cli::{Args, Command};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// Printed when the daemon answers with an empty body.
fn fallback_message(cmd: &Command) -> Option<&'static str> {
    match cmd {
        Command::Status { .. } => None,
        Command::SetTimeout { .. } => Some("Idle timeout updated"),
        Command::Move { .. } => Some("Move queued"),
        Command::Halt => Some("Motion halted"),
        Command::Stop => Some("Stopping quiesce daemon"),
    }
}

pub async fn run(args: Args) -> Result<(), AnyError> {
    let Some(cmd) = args.command.as_ref() else {
        return Err("no command given".into());
    };

    match crate::ipc::client::send_raw(&cmd.to_ipc()).await {
        Ok(resp) => {
            let out = resp.trim_end();
            match (out.is_empty(), fallback_message(cmd)) {
                (false, _) => println!("{out}"),
                (true, Some(msg)) => println!("{msg}"),
                (true, None) => {}
            }

            if out.starts_with("ERROR:") {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            if let Command::Status { json: true } = cmd {
                // Scripts polling status always get valid JSON.
                println!(r#"{{"state":"not_running","printing_time":0.0,"idle_timeout":null}}"#);
                return Ok(());
            }
            eprintln!("quiesce: {e}");
            std::process::exit(1);
        }
    }
}
