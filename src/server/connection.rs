//! One push-protocol session.
//!
//! The session task is the only writer on its stream: broadcast lines arrive
//! through the actor's subscription and listings are written inline, so a
//! `GETTING_CANVAS` block is never split by a broadcast line.
//!
//! Client lines longer than `max_line_len` bytes end the session with an
//! `InvalidData` error.

use std::io;
use std::ops::ControlFlow;
use std::sync::Arc;

use sharedraw_core::protocol::listing;
use sharedraw_core::{ActorId, Canvas, Command, Event};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Run a session until the client exits, the stream fails, the canvas drops
/// our subscription, or shutdown is signalled.
pub async fn serve_push_connection<S>(
    stream: S,
    canvas: Canvas,
    max_line_len: usize,
    shutdown: Arc<Notify>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let stop = shutdown.notified();
    tokio::pin!(stop);

    let actor = canvas.register_actor();
    // Subscribe before greeting so nothing between the two is missed.
    let mut events = canvas.subscribe(actor);
    info!(%actor, "push client connected");

    let (read, write) = tokio::io::split(stream);
    let mut reader = BufReader::new(read);
    let mut pending = Vec::new();
    let mut out = BufWriter::new(write);

    let result = async {
        write_lines(&mut out, [Event::Welcome(actor).to_string()]).await?;
        loop {
            tokio::select! {
                line = read_line(&mut reader, &mut pending, max_line_len) => {
                    let line = line.inspect_err(|e| warn!(%actor, "dropping client: {e}"))?;
                    let Some(line) = line else {
                        debug!(%actor, "client closed the stream");
                        break;
                    };
                    if dispatch(&canvas, actor, &line, &mut out).await?.is_break() {
                        break;
                    }
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!(%actor, "subscription dropped by server");
                        break;
                    };
                    write_lines(&mut out, [event]).await?;
                }
                _ = &mut stop => break,
            }
        }
        out.shutdown().await
    }
    .await;

    canvas.unsubscribe(actor);
    info!(%actor, "push client disconnected");
    result
}

/// Next `\n`-terminated line without its terminator, `None` at end of input.
///
/// Partial input is kept in `pending`, so the future can be dropped by
/// `select!` and polled again without losing bytes.
async fn read_line<R>(
    reader: &mut R,
    pending: &mut Vec<u8>,
    max_len: usize,
) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if pending.is_empty() {
                return Ok(None);
            }
            break;
        }
        if let Some(end) = available.iter().position(|&b| b == b'\n') {
            pending.extend_from_slice(&available[..end]);
            reader.consume(end + 1);
            break;
        }
        let len = available.len();
        pending.extend_from_slice(available);
        reader.consume(len);
        if pending.len() > max_len {
            break;
        }
    }

    if pending.len() > max_len {
        let len = pending.len();
        pending.clear();
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {max_len} bytes ({len} buffered)"),
        ));
    }
    if pending.last() == Some(&b'\r') {
        pending.pop();
    }
    String::from_utf8(std::mem::take(pending))
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

async fn dispatch<W>(
    canvas: &Canvas,
    actor: ActorId,
    line: &str,
    out: &mut W,
) -> io::Result<ControlFlow<()>>
where
    W: AsyncWrite + Unpin,
{
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(e) => {
            debug!(%actor, line, "ignoring line: {e}");
            return Ok(ControlFlow::Continue(()));
        }
    };

    match command {
        Command::Add(spec) => {
            canvas.add(actor, spec);
        }
        Command::Edit { shape_id, style } => {
            if let Err(e) = canvas.edit(shape_id, actor, style) {
                debug!(%actor, "edit failed: {e}");
            }
        }
        Command::RemoveMine => {
            canvas.remove_by_owner(actor);
        }
        Command::RemoveAll => {
            canvas.remove_all(actor);
        }
        Command::SaveSnapshot => {
            canvas.save_snapshot(actor);
        }
        Command::LoadSnapshot => {
            let shapes = canvas.load_snapshot(actor);
            write_lines(out, listing(Event::GettingSnapshot, &shapes)).await?;
        }
        Command::LoadCanvas => {
            let shapes = canvas.shapes();
            write_lines(out, listing(Event::GettingCanvas, &shapes)).await?;
        }
        Command::Exit => return Ok(ControlFlow::Break(())),
    }
    Ok(ControlFlow::Continue(()))
}

async fn write_lines<W, L>(out: &mut W, lines: impl IntoIterator<Item = L>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    L: AsRef<str>,
{
    for line in lines {
        out.write_all(line.as_ref().as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await
}
