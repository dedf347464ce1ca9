//! Line-based commands on stdin standing in for the rotary encoder

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use fftwave_control::ControlEvent;
use tracing::{debug, info, warn};

/// What one input line asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Event(ControlEvent),
    Quit,
}

/// Parse one line; `None` for blank lines
pub fn parse_line(line: &str) -> Option<std::result::Result<Command, String>> {
    let word = line.trim();
    if word.is_empty() {
        return None;
    }
    if matches!(word, "q" | "quit" | "exit") {
        return Some(Ok(Command::Quit));
    }
    Some(
        word.parse::<ControlEvent>()
            .map(Command::Event)
            .map_err(|e| e.to_string()),
    )
}

/// Read commands from stdin until EOF or `quit`.
///
/// The thread is detached: a blocking stdin read cannot be interrupted, and
/// it holds nothing that needs cleaning up.
pub fn spawn(events: Sender<ControlEvent>, quit: Arc<AtomicBool>) -> Result<()> {
    let help: Vec<&str> = ControlEvent::ALL.iter().map(|e| e.command()).collect();
    info!("Commands: {}, quit", help.join(", "));

    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_line(&line) {
                    None => {}
                    Some(Ok(Command::Quit)) => {
                        quit.store(true, Ordering::Release);
                        break;
                    }
                    Some(Ok(Command::Event(event))) => {
                        debug!("Command: {}", event);
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => warn!("{}", e),
                }
            }
        })
        .context("Failed to spawn stdin command thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("q\n"), Some(Ok(Command::Quit)));
        assert_eq!(
            parse_line("b"),
            Some(Ok(Command::Event(ControlEvent::NextBackground)))
        );
        assert!(matches!(parse_line("dance"), Some(Err(_))));
    }
}
