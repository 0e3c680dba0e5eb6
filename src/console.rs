//! Line-oriented operator console
//!
//! Each stdin line is either an input gesture fed to the command encoder or a
//! console action. Key and control names are the ones in the binding table,
//! with `space` accepted for the stop key.

use crate::command::InputEvent;
use crate::telemetry::LogEntry;
use krushinova_shared::{Distance, TelemetrySnapshot};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty input")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("'{0}' needs a key or control name")]
    MissingTarget(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Input(InputEvent),
    Status,
    Logs,
    Video,
    Reconnect,
    Logout,
    Quit,
    Help,
}

pub const HELP: &str = "\
key <name>     press a key (ArrowUp, ArrowDown, ArrowLeft, ArrowRight, space)
keyup <name>   release a key
down <name>    press a control (forward, backward, left, right, stop)
up <name>      release a control
click <name>   press then release a control
status         show latest telemetry
logs           show recent log entries
video          show the video feed address
reconnect      open a new session
logout         forget the stored token and quit
quit           close the session and exit";

/// Parse one console line. `click` expands to a press and a release.
pub fn parse_line(line: &str) -> Result<Vec<ConsoleCommand>, ParseError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err(ParseError::Empty);
    };
    let target = parts.next().map(key_name);

    let single = |command: ConsoleCommand| -> Result<Vec<ConsoleCommand>, ParseError> {
        Ok(vec![command])
    };
    let needs_target = |make: fn(String) -> InputEvent| match &target {
        Some(id) => Ok(vec![ConsoleCommand::Input(make(id.clone()))]),
        None => Err(ParseError::MissingTarget(verb.to_string())),
    };

    match verb.to_ascii_lowercase().as_str() {
        "key" => needs_target(InputEvent::key_down),
        "keyup" => needs_target(InputEvent::key_up),
        "down" => needs_target(InputEvent::pointer_down),
        "up" => needs_target(InputEvent::pointer_up),
        "click" => match &target {
            Some(id) => Ok(vec![
                ConsoleCommand::Input(InputEvent::pointer_down(id.clone())),
                ConsoleCommand::Input(InputEvent::pointer_up(id.clone())),
            ]),
            None => Err(ParseError::MissingTarget(verb.to_string())),
        },
        "status" => single(ConsoleCommand::Status),
        "logs" => single(ConsoleCommand::Logs),
        "video" => single(ConsoleCommand::Video),
        "reconnect" => single(ConsoleCommand::Reconnect),
        "logout" => single(ConsoleCommand::Logout),
        "quit" | "exit" => single(ConsoleCommand::Quit),
        "help" | "?" => single(ConsoleCommand::Help),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

fn key_name(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("space") {
        " ".to_string()
    } else {
        raw.to_string()
    }
}

/// Render the telemetry panel
pub fn render_status(snapshot: &TelemetrySnapshot) -> String {
    let vision = match snapshot.detections.len() {
        0 => "Clear".to_string(),
        n => format!("{} Targets", n),
    };

    let mut out = String::new();
    let _ = writeln!(out, "Distance: {}", format_distance(&snapshot.distance));
    let _ = writeln!(out, "Status:   {}", snapshot.status);
    let _ = write!(out, "Vision:   {}", vision);
    for detection in &snapshot.detections {
        if let (Some(name), Some(conf)) = (detection.name(), detection.confidence()) {
            let _ = write!(out, "\n  - {} ({:.0}%)", name, conf * 100.0);
        }
    }
    out
}

fn format_distance(distance: &Distance) -> String {
    match distance {
        Distance::Cm(cm) => format!("{:.1} cm", cm),
        Distance::Raw(serde_json::Value::Null) => "N/A".to_string(),
        Distance::Raw(serde_json::Value::String(text)) => text.clone(),
        Distance::Raw(other) => other.to_string(),
    }
}

/// Render the log panel, most recent first
pub fn render_logs(logs: &[LogEntry]) -> String {
    if logs.is_empty() {
        return "(no log entries)".to_string();
    }
    logs.iter()
        .map(|entry| format!("[{}] {}", entry.timestamp_ms, entry.message))
        .collect::<Vec<_>>()
        .join("\n")
}
