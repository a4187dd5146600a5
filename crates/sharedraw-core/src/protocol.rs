//! Line-oriented push protocol.
//!
//! Client lines parse into [`Command`]; everything the server writes is an
//! [`Event`] rendered through `Display`, one line each, without the newline.

use std::fmt;

use thiserror::Error;

use crate::error::ValidationError;
use crate::shapes::{
    ActorId, Shape, ShapeId, ShapeSpec, ShapeStyle, parse_int, parse_shape_data,
};

/// A parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(ShapeSpec),
    Edit { shape_id: ShapeId, style: ShapeStyle },
    RemoveMine,
    RemoveAll,
    SaveSnapshot,
    LoadSnapshot,
    LoadCanvas,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("missing arguments for {0}")]
    MissingArguments(&'static str),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl Command {
    /// Parse one line. Bounds are checked later by the canvas.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }
        let (verb, rest) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "ADD" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArguments("ADD"));
                }
                Ok(Command::Add(parse_shape_data(rest)?))
            }
            "EDIT" => {
                let (id, style) = rest
                    .split_once(':')
                    .ok_or(ParseError::MissingArguments("EDIT"))?;
                let shape_id: ShapeId = id
                    .trim()
                    .parse()
                    .map_err(|_| ValidationError::NotANumber(id.to_string()))?;
                Ok(Command::Edit {
                    shape_id,
                    style: parse_style(style)?,
                })
            }
            "REMOVE_MINE" => Ok(Command::RemoveMine),
            "REMOVE_ALL" => Ok(Command::RemoveAll),
            "SAVE_SNAPSHOT" => Ok(Command::SaveSnapshot),
            "LOAD_SNAPSHOT" => Ok(Command::LoadSnapshot),
            "LOAD_CANVAS" => Ok(Command::LoadCanvas),
            "EXIT" => Ok(Command::Exit),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

/// `<Type> <Color> <W> <H>`
fn parse_style(s: &str) -> Result<ShapeStyle, ValidationError> {
    let fields: Vec<&str> = s.split_whitespace().collect();
    let [kind, color, w, h] = fields.as_slice() else {
        return Err(ValidationError::FieldCount {
            expected: 4,
            found: fields.len(),
        });
    };
    Ok(ShapeStyle::new(kind.parse()?, color.parse()?, parse_int(w)?, parse_int(h)?))
}

/// A server line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Welcome(ActorId),
    Added(Shape),
    Edited(Shape),
    RemovedFrom(ActorId),
    RemovedAll,
    Mark { shape_id: ShapeId, actor: ActorId },
    Unmark { shape_id: ShapeId, actor: ActorId },
    GettingCanvas(usize),
    GettingSnapshot(usize),
    /// One entry of a canvas/snapshot listing
    Listed(Shape),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Welcome(actor) => write!(f, "WELCOME {actor}"),
            Event::Added(shape) => write!(f, "ADDED {}", shape.record()),
            Event::Edited(shape) => write!(f, "EDITED {}", shape.record()),
            Event::RemovedFrom(owner) => write!(f, "REMOVED_FROM {owner}"),
            Event::RemovedAll => f.write_str("REMOVED_ALL"),
            Event::Mark { shape_id, actor } => write!(f, "MARK {shape_id}:{actor}"),
            Event::Unmark { shape_id, actor } => write!(f, "UNMARK {shape_id}:{actor}"),
            Event::GettingCanvas(n) => write!(f, "GETTING_CANVAS {n}"),
            Event::GettingSnapshot(n) => write!(f, "GETTING_SNAPSHOT {n}"),
            Event::Listed(shape) => write!(f, "SH {}", shape.record()),
        }
    }
}

/// Header line followed by one `SH` line per shape
pub fn listing(header: fn(usize) -> Event, shapes: &[Shape]) -> Vec<String> {
    std::iter::once(header(shapes.len()).to_string())
        .chain(shapes.iter().map(|s| Event::Listed(s.clone()).to_string()))
        .collect()
}
