//! Shared-canvas state engine for sharedraw
//!
//! The [`Canvas`] owns the shape registry, version counter, per-actor markers
//! and ban list, and fans every change out to push subscribers through the
//! broadcast drain. Transports hold a clone of the canvas and nothing else.

pub mod broadcast;
pub mod canvas;
pub mod error;
pub mod markers;
pub mod moderation;
pub mod protocol;
pub mod registry;
pub mod shapes;
pub mod snapshots;

pub use broadcast::{EventLine, Subscription};
pub use canvas::{Canvas, CanvasOptions, CanvasStats, DEFAULT_MARKER_DURATION};
pub use error::{CanvasError, ValidationError};
pub use protocol::{Command, Event, ParseError};
pub use shapes::{
    ActorId, CanvasLimits, Position, Shape, ShapeColor, ShapeId, ShapeSpec, ShapeStyle, ShapeType,
};
pub use snapshots::{SnapshotStore, default_snapshot_path};
