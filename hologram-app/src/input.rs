//! Keyboard input from stdin.

use hologram_core::EngineHandle;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputCommand {
    Toggle,
    Quit,
    /// Any other input counts as a click on the page
    Interact,
}

fn parse_command(line: &str) -> InputCommand {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "p" | "play" | "pause" | "start" => InputCommand::Toggle,
        "q" | "quit" | "exit" => InputCommand::Quit,
        _ => InputCommand::Interact,
    }
}

/// Forward stdin lines to the engine until cancelled or stdin closes
pub async fn forward_stdin(handle: EngineHandle, cancel_token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("stdin closed, keyboard control disabled");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                };

                let delivered = match parse_command(&line) {
                    InputCommand::Toggle => handle.toggle(),
                    InputCommand::Interact => handle.interact(),
                    InputCommand::Quit => {
                        cancel_token.cancel();
                        break;
                    }
                };
                if !delivered {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(""), InputCommand::Toggle);
        assert_eq!(parse_command("  P \n"), InputCommand::Toggle);
        assert_eq!(parse_command("pause"), InputCommand::Toggle);
        assert_eq!(parse_command("q"), InputCommand::Quit);
        assert_eq!(parse_command("Quit"), InputCommand::Quit);
        assert_eq!(parse_command("x"), InputCommand::Interact);
        assert_eq!(parse_command("hello"), InputCommand::Interact);
    }
}
