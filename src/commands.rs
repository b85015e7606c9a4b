//! Operator commands read line by line from stdin.
//!
//! Slots and devices are numbered from 1, the way the grid labels them.

use thiserror::Error;

use crate::config::model::{DEFAULT_BUTTON_PADDING, DEFAULT_FONT_SIZE};
use crate::config::{GridSettings, Pad};
use crate::messages::ControllerEvent;

pub const HELP: &str = "\
commands:
  play N                 trigger pad N
  key COMBO              press a key combination, e.g. ctrl+1
  stop                   stop every playing sound
  volume P               master volume in percent (0-100)
  devices                list output devices
  device N               select output device N
  grid R C [FONT PAD]    set grid size (1-16) and button style
  edit N PAD_JSON        replace pad N, e.g. edit 2 {\"Label\":\"Boo\",\"FilePath\":\"boo.mp3\"}
  reload                 reread the config file
  help                   show this text
  quit                   stop everything and exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(ControllerEvent),
    Help,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),

    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{0:?} is not a valid number")]
    InvalidNumber(String),

    #[error("numbering starts at 1")]
    ZeroIndex,

    #[error("invalid pad: {0}")]
    InvalidPad(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let event = match name.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "help" | "?" => return Ok(Some(Command::Help)),
        "play" => ControllerEvent::Trigger(index(args.next(), "play", "a pad number")?),
        "key" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "key",
                    argument: "a key combination",
                });
            }
            ControllerEvent::KeyPressed(rest.to_string())
        }
        "stop" => ControllerEvent::StopAll,
        "volume" => {
            let raw = args.next().ok_or(CommandError::MissingArgument {
                command: "volume",
                argument: "a percentage",
            })?;
            let percent = raw
                .trim_end_matches('%')
                .parse::<f32>()
                .map_err(|_| CommandError::InvalidNumber(raw.to_string()))?;
            ControllerEvent::SetMasterVolume(percent)
        }
        "devices" => ControllerEvent::ListDevices,
        "device" => ControllerEvent::SelectDevice(index(args.next(), "device", "a device number")?),
        "grid" => {
            let rows = number(args.next(), "grid", "rows and columns")?;
            let cols = number(args.next(), "grid", "rows and columns")?;
            let font_size = args.next().map(parse_i32).transpose()?;
            let padding = args.next().map(parse_i32).transpose()?;
            ControllerEvent::ApplyGrid(GridSettings {
                rows,
                cols,
                font_size: font_size.unwrap_or(DEFAULT_FONT_SIZE),
                padding: padding.unwrap_or(DEFAULT_BUTTON_PADDING),
            })
        }
        "edit" => {
            let slot = index(args.next(), "edit", "a pad number")?;
            let json = rest
                .split_once(char::is_whitespace)
                .map(|(_, json)| json.trim())
                .filter(|json| !json.is_empty())
                .ok_or(CommandError::MissingArgument {
                    command: "edit",
                    argument: "a pad as JSON",
                })?;
            let pad: Pad =
                serde_json::from_str(json).map_err(|e| CommandError::InvalidPad(e.to_string()))?;
            ControllerEvent::EditCommitted { slot, pad }
        }
        "reload" => ControllerEvent::Reload,
        "quit" | "exit" => ControllerEvent::Shutdown,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(Command::Event(event)))
}

fn parse_i32(raw: &str) -> Result<i32, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

fn number(
    raw: Option<&str>,
    command: &'static str,
    argument: &'static str,
) -> Result<i32, CommandError> {
    parse_i32(raw.ok_or(CommandError::MissingArgument { command, argument })?)
}

/// One-based operator index to a zero-based slot.
fn index(
    raw: Option<&str>,
    command: &'static str,
    argument: &'static str,
) -> Result<usize, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument { command, argument })?;
    let n: usize = raw
        .parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))?;
    n.checked_sub(1).ok_or(CommandError::ZeroIndex)
}
