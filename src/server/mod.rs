//! TCP front ends for the canvas.
//!
//! Both transports share one accept loop; each accepted stream gets its own
//! task holding a clone of the [`Canvas`]. Shutdown is a single `Notify`
//! that stops the accept loops and every connection still waiting on it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use sharedraw_core::Canvas;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

pub mod connection;
pub mod poll;

use connection::serve_push_connection;
use poll::serve_poll_connection;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Owns the shutdown signal shared by every listener and connection
#[derive(Clone)]
pub struct Server {
    canvas: Canvas,
    shutdown: Arc<Notify>,
}

impl Server {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// The signal `shutdown` fires, for other tasks that should stop with the server
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Stop accepting and ask live connections to close
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    /// Serve the line protocol until shutdown
    pub async fn serve_push(
        &self,
        listener: TcpListener,
        max_line_len: usize,
    ) -> Result<(), ServerError> {
        let canvas = self.canvas.clone();
        let shutdown = self.shutdown.clone();
        self.accept_loop("push", listener, move |stream, _peer| {
            serve_push_connection(stream, canvas.clone(), max_line_len, shutdown.clone())
        })
        .await
    }

    /// Serve framed poll requests until shutdown
    pub async fn serve_poll(
        &self,
        listener: TcpListener,
        max_message_size: usize,
    ) -> Result<(), ServerError> {
        let canvas = self.canvas.clone();
        let shutdown = self.shutdown.clone();
        self.accept_loop("poll", listener, move |stream, _peer| {
            serve_poll_connection(stream, canvas.clone(), max_message_size, shutdown.clone())
        })
        .await
    }

    async fn accept_loop<F, Fut, E>(
        &self,
        transport: &'static str,
        listener: TcpListener,
        handler: F,
    ) -> Result<(), ServerError>
    where
        F: Fn(TcpStream, SocketAddr) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display,
    {
        // Created up front so a notify between iterations is not lost.
        let stop = self.shutdown.notified();
        tokio::pin!(stop);

        info!(transport, addr = %listener.local_addr()?, "listening");

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!(transport, %peer, "connection accepted");
                        let session = handler(stream, peer);
                        tokio::spawn(async move {
                            match session.await {
                                Ok(()) => debug!(transport, %peer, "connection closed"),
                                Err(e) => warn!(transport, %peer, "connection error: {e}"),
                            }
                        });
                    }
                    Err(e) => error!(transport, "accept error: {e}"),
                },
                _ = &mut stop => {
                    info!(transport, "listener shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}
