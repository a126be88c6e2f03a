// ABOUTME: Provides stream connection management for the manager protocol
// ABOUTME: Runs the read loop that reassembles frames and writes actions through a buffered writer

use crate::action::Action;
use crate::client::error::{AmiError, AmiResult};
use crate::event::{Dispatcher, Signal, classify};
use crate::frame::FrameAccumulator;
use crate::message::Message;
use bytes::BytesMut;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, trace, warn};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Manager protocol connection
///
/// Wraps one byte stream to the PBX. The read half is moved into a spawned
/// read loop which reassembles message blocks, classifies them and hands
/// the resulting signals to a [`Dispatcher`]. The write half stays here,
/// behind an async mutex, so actions reach the wire in the order they are
/// written and a batch of actions is never interleaved with another
/// caller's.
///
/// ## Lifecycle
///
/// ```text
/// new() ──▶ connected ──(peer closes / read error / close())──▶ closed
/// ```
///
/// When the read loop ends it raises [`Signal::Disconnected`] exactly once.
pub struct Connection {
    // The write half of the stream, decorated with a `BufWriter` so an
    // action goes out in as few syscalls as possible. `None` once closed.
    writer: Mutex<Option<BufWriter<BoxedWriter>>>,

    connected: Arc<AtomicBool>,

    shutdown: std::sync::Mutex<Option<oneshot::Sender<()>>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Create a new `Connection` over `stream` and start its read loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<S>(stream: S, dispatcher: Dispatcher) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let connected = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(read_loop(reader, dispatcher, connected.clone(), shutdown_rx));

        let writer: BoxedWriter = Box::new(writer);

        Connection {
            writer: Mutex::new(Some(BufWriter::new(writer))),
            connected,
            shutdown: std::sync::Mutex::new(Some(shutdown_tx)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Write a single action and flush it.
    pub async fn write_action(&self, action: &Action) -> AmiResult<()> {
        self.write_actions(std::slice::from_ref(action)).await
    }

    /// Write `actions` back to back, in order, without letting any other
    /// writer in between.
    pub async fn write_actions(&self, actions: &[Action]) -> AmiResult<()> {
        if actions.iter().any(Action::is_empty) {
            return Err(AmiError::EmptyInput);
        }

        let mut guard = self.writer.lock().await;
        let stream = guard.as_mut().ok_or(AmiError::ConnectionClosed)?;

        let mut buf = BytesMut::new();
        for action in actions {
            action.encode(&mut buf);
        }
        trace!(data = %String::from_utf8_lossy(&buf), "Writing actions");

        stream.write_all(&buf).await?;

        // The writes above went to the buffered stream; `flush` pushes them
        // out to the socket.
        stream.flush().await?;
        Ok(())
    }

    /// Shut the write half down and stop the read loop.
    pub async fn close(&self) -> AmiResult<()> {
        let shutdown = self
            .shutdown
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!("Error shutting down writer: {e}");
            }
        }

        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}

async fn read_loop<S>(
    mut reader: ReadHalf<S>,
    dispatcher: Dispatcher,
    connected: Arc<AtomicBool>,
    mut shutdown: oneshot::Receiver<()>,
) where
    S: AsyncRead + Send + Unpin,
{
    let mut accumulator = FrameAccumulator::new();
    let mut chunk = BytesMut::with_capacity(4 * 1024);

    loop {
        chunk.clear();

        let read = tokio::select! {
            _ = &mut shutdown => {
                debug!("Read loop stopped by close()");
                break;
            }
            read = reader.read_buf(&mut chunk) => read,
        };

        match read {
            // `0` indicates "end of stream": the PBX closed the connection.
            Ok(0) => {
                if accumulator.pending() > 0 {
                    warn!(
                        pending = accumulator.pending(),
                        "Connection closed in the middle of a message block"
                    );
                } else {
                    debug!("Connection closed by peer");
                }
                break;
            }
            Ok(_) => {
                trace!(data = %String::from_utf8_lossy(&chunk), "Received data");

                for frame in accumulator.feed(&chunk) {
                    debug!(frame = %frame, "Received message block");
                    let message = Message::parse(frame);
                    dispatcher.dispatch(&classify(&message));
                }
            }
            Err(e) => {
                warn!("Read error, closing connection: {e}");
                break;
            }
        }
    }

    connected.store(false, Ordering::Release);
    dispatcher.dispatch(&[Signal::Disconnected]);
}
