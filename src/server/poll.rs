//! Request/response access for clients that poll.
//!
//! Frames are a 4-byte big-endian length followed by a JSON body. Each
//! [`PollRequest`] gets exactly one [`PollResponse`]. Clients compare the
//! `version` they last saw with `CurrentVersion` and refetch on change.
//!
//! `max_message_size` bounds requests only. Replies carry the whole registry
//! and are limited by the 32-bit length prefix alone.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sharedraw_core::{ActorId, Canvas, Shape, ShapeId, ShapeSpec, ShapeStyle};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PollRequest {
    RegisterActor,
    CurrentVersion,
    Add { actor: ActorId, spec: ShapeSpec },
    Edit { actor: ActorId, shape_id: ShapeId, style: ShapeStyle },
    RemoveByOwner { actor: ActorId },
    RemoveAll { actor: ActorId },
    SaveSnapshot { actor: ActorId },
    LoadSnapshot { actor: ActorId },
    CurrentRegistry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PollResponse {
    Actor { actor: ActorId },
    Version { version: u64 },
    /// `shape_id` is absent when the add was dropped
    Added { shape_id: Option<ShapeId> },
    Saved { count: usize },
    Shapes { shapes: Vec<Shape> },
    Done,
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("empty frame")]
    Empty,
    #[error("frame too large: {len} > {max}")]
    TooLarge { len: usize, max: usize },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read one frame body; `Ok(None)` on a clean close between frames
pub async fn read_frame<R>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(FrameError::Empty);
    }
    if len > max_len {
        return Err(FrameError::TooLarge { len, max: max_len });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(body.len()).map_err(|_| FrameError::TooLarge {
        len: body.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Apply one request to the canvas
pub fn handle_request(canvas: &Canvas, request: PollRequest) -> PollResponse {
    match request {
        PollRequest::RegisterActor => PollResponse::Actor {
            actor: canvas.register_actor(),
        },
        PollRequest::CurrentVersion => PollResponse::Version {
            version: canvas.version(),
        },
        PollRequest::Add { actor, spec } => PollResponse::Added {
            shape_id: canvas.add(actor, spec),
        },
        PollRequest::Edit {
            actor,
            shape_id,
            style,
        } => match canvas.edit(shape_id, actor, style) {
            Ok(()) => PollResponse::Done,
            Err(e) => {
                debug!(%actor, "poll edit failed: {e}");
                PollResponse::Error {
                    message: e.to_string(),
                }
            }
        },
        PollRequest::RemoveByOwner { actor } => {
            canvas.remove_by_owner(actor);
            PollResponse::Done
        }
        PollRequest::RemoveAll { actor } => {
            canvas.remove_all(actor);
            PollResponse::Done
        }
        PollRequest::SaveSnapshot { actor } => PollResponse::Saved {
            count: canvas.save_snapshot(actor),
        },
        PollRequest::LoadSnapshot { actor } => PollResponse::Shapes {
            shapes: canvas.load_snapshot(actor),
        },
        PollRequest::CurrentRegistry => PollResponse::Shapes {
            shapes: canvas.shapes(),
        },
    }
}

/// Serve requests until the client closes, sends a bad frame, or shutdown
pub async fn serve_poll_connection<S>(
    mut stream: S,
    canvas: Canvas,
    max_message_size: usize,
    shutdown: Arc<Notify>,
) -> Result<(), FrameError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let stop = shutdown.notified();
    tokio::pin!(stop);

    loop {
        let body = tokio::select! {
            body = read_frame(&mut stream, max_message_size) => body?,
            _ = &mut stop => return Ok(()),
        };
        let Some(body) = body else {
            return Ok(());
        };

        let response = match serde_json::from_slice::<PollRequest>(&body) {
            Ok(request) => {
                trace!(?request, "poll request");
                handle_request(&canvas, request)
            }
            Err(e) => PollResponse::Error {
                message: format!("invalid request: {e}"),
            },
        };
        let json = serde_json::to_vec(&response)?;
        write_frame(&mut stream, &json).await?;
    }
}
