//! Command-line REPL acting as a pointer/drag source

use std::sync::Arc;

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;

use crate::control::{Point, SchedulerHandle};
use crate::targets::{TargetRegistry, TopicRegistry};

/// One parsed REPL line
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Start(Point),
    Move(Point),
    End,
    Topics,
    Target(String),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown command '{0}' (type 'help')")]
    UnknownCommand(String),
    #[error("'{0}' expects {1}")]
    Usage(&'static str, &'static str),
    #[error("invalid coordinate '{0}'")]
    InvalidCoordinate(String),
}

/// Parse a REPL line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, InputError> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match word.to_ascii_lowercase().as_str() {
        "start" | "s" => ReplCommand::Start(parse_point("start", &args)?),
        "move" | "m" => ReplCommand::Move(parse_point("move", &args)?),
        "end" | "e" => ReplCommand::End,
        "topics" => ReplCommand::Topics,
        "target" => match args.as_slice() {
            [name] => ReplCommand::Target((*name).to_string()),
            _ => return Err(InputError::Usage("target", "a topic name")),
        },
        "status" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };

    Ok(Some(command))
}

fn parse_point(command: &'static str, args: &[&str]) -> Result<Point, InputError> {
    let [x, y] = args else {
        return Err(InputError::Usage(command, "two coordinates: X Y"));
    };
    Ok(Point::new(parse_coordinate(x)?, parse_coordinate(y)?))
}

fn parse_coordinate(raw: &str) -> Result<f64, InputError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::InvalidCoordinate(raw.to_string()))
}

/// Run the interactive REPL until `quit` or EOF
///
/// Blocks on stdin, so run it on a dedicated thread.
pub fn run_repl(
    scheduler: SchedulerHandle,
    registry: Arc<TopicRegistry>,
    runtime: tokio::runtime::Handle,
) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("{}", "vel-cmd joystick REPL (type 'help')".bold().cyan());

    loop {
        let line = match rl.readline("vel-cmd> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = rl.add_history_entry(line.as_str());

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e.to_string().red());
                continue;
            }
        };

        match command {
            ReplCommand::Start(p) => scheduler.drag_start(p),
            ReplCommand::Move(p) => scheduler.drag_move(p),
            ReplCommand::End => scheduler.drag_end(),
            ReplCommand::Topics => print_topics(&registry),
            ReplCommand::Target(name) => match registry.select(&name) {
                Ok(target) => println!(
                    "Target: {} ({})",
                    target.name.green(),
                    target.schema_name.yellow()
                ),
                Err(e) => println!("{}", e.to_string().red()),
            },
            ReplCommand::Status => match runtime.block_on(scheduler.status()) {
                Ok(status) => {
                    println!("  Phase:     {}", format!("{:?}", status.phase).green());
                    if let Some(cmd) = status.last_command {
                        println!(
                            "  Last cmd:  linear {:+.4}, angular {:+.4}",
                            cmd.linear_speed, cmd.angular_speed
                        );
                    }
                    println!(
                        "  Published: {} (skipped {})",
                        status.published.to_string().green(),
                        status.skipped.to_string().yellow()
                    );
                }
                Err(e) => println!("{}", e.to_string().red()),
            },
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
        }
    }

    Ok(())
}

fn print_topics(registry: &TopicRegistry) {
    let active = registry.active_target().map(|t| t.name);
    let topics = registry.topics();

    if topics.is_empty() {
        println!("{}", "No usable topics".yellow());
    }
    for topic in topics {
        let marker = if active.as_deref() == Some(topic.name.as_str()) { "*" } else { " " };
        println!(" {} {} ({})", marker, topic.name.green(), topic.schema_name);
    }
}

fn print_help() {
    println!("\n{}", "Commands:".bold());
    println!("  {}    begin a drag at X Y", "start X Y".yellow());
    println!("  {}     move the pointer to X Y", "move X Y".yellow());
    println!("  {}          release the joystick", "end".yellow());
    println!("  {}       list usable topics", "topics".yellow());
    println!("  {}  select the publish topic", "target NAME".yellow());
    println!("  {}       show scheduler state", "status".yellow());
    println!("  {}         leave the REPL\n", "quit".yellow());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drag_commands() {
        assert_eq!(
            parse_command("start 100 100"),
            Ok(Some(ReplCommand::Start(Point::new(100.0, 100.0))))
        );
        assert_eq!(
            parse_command("  m 100.5 -3 "),
            Ok(Some(ReplCommand::Move(Point::new(100.5, -3.0))))
        );
        assert_eq!(parse_command("END"), Ok(Some(ReplCommand::End)));
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        assert_eq!(
            parse_command("move 1 abc"),
            Err(InputError::InvalidCoordinate("abc".to_string()))
        );
        assert_eq!(
            parse_command("move NaN 0"),
            Err(InputError::InvalidCoordinate("NaN".to_string()))
        );
        assert!(matches!(parse_command("start 1"), Err(InputError::Usage("start", _))));
    }

    #[test]
    fn test_parse_target_and_misc() {
        assert_eq!(
            parse_command("target /cmd_vel"),
            Ok(Some(ReplCommand::Target("/cmd_vel".to_string())))
        );
        assert!(parse_command("target").is_err());
        assert_eq!(parse_command("quit"), Ok(Some(ReplCommand::Quit)));
        assert_eq!(
            parse_command("jump"),
            Err(InputError::UnknownCommand("jump".to_string()))
        );
    }
}
