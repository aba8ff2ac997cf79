// MIT License - Copyright (c) 2026 Peter Wright
// TCP transport to the panel

pub mod framer;
pub mod listener;

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::config::PanelConfig;
use crate::constants::{CMD_MODE, MAX_BUFFER_BYTES, READ_CHUNK_BYTES};
use crate::error::{AlarmError, Result};
use crate::protocol::Delimiter;

/// Owns the write half of one TCP session.
///
/// The read half is handed back from [`connect`](Self::connect) so a listener
/// task can own it. No reconnection happens here; a closed transport stays
/// closed and the panel builds a new one.
#[derive(Debug)]
pub struct Transport {
    writer: Mutex<Option<OwnedWriteHalf>>,
    connected: AtomicBool,
    peer: String,
}

impl Transport {
    /// Open a TCP session, failing with [`AlarmError::ConnectTimeout`] if the
    /// panel does not accept within `connect_timeout`.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<(Self, OwnedReadHalf)> {
        info!("Connecting to panel at {}:{}", host, port);

        let stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                error!("TCP connect to {}:{} timed out", host, port);
                AlarmError::ConnectTimeout
            })?
            .map_err(|e| {
                error!("TCP connect failed: {}", e);
                AlarmError::Io(e)
            })?;

        debug!("TCP socket connected");
        Ok(Self::from_stream(stream, format!("{host}:{port}")))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, peer: String) -> (Self, OwnedReadHalf) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY on {}: {}", peer, e);
        }
        let (reader, writer) = stream.into_split();
        let transport = Self {
            writer: Mutex::new(Some(writer)),
            connected: AtomicBool::new(true),
            peer,
        };
        (transport, reader)
    }

    /// Whether the session is still believed to be alive. Never blocks.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Flag the session dead without touching the socket.
    ///
    /// Called by the listener when the peer closes or the framer overflows.
    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Write bytes and flush them.
    ///
    /// Concurrent writers (acks from the listener, commands from callers) are
    /// serialized by the writer lock so frames never interleave.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(AlarmError::NotConnected);
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(AlarmError::NotConnected)?;

        let written = match writer.write_all(bytes).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            warn!("Write to {} failed: {}", self.peer, e);
            self.mark_disconnected();
            return Err(AlarmError::Io(e));
        }
        Ok(())
    }

    /// Flush, half-close and release the socket. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        self.mark_disconnected();
        let Some(mut writer) = self.writer.lock().await.take() else {
            return Ok(());
        };

        debug!("Closing connection to {}", self.peer);
        writer.flush().await?;
        writer.shutdown().await?;
        Ok(())
    }
}

/// Check that a panel answers `MODE <n>` with an echo of the same command.
///
/// Opens its own short-lived connection. Returns `false` if the connection
/// fails, the peer closes first, more than 8 KB arrives without the echo, or
/// any step exceeds the configured connect timeout.
pub async fn probe_mode(config: &PanelConfig) -> bool {
    let connect_timeout = config.connect_timeout();
    let (transport, mut reader) =
        match Transport::connect(&config.host, config.port, connect_timeout).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!("Mode probe could not connect: {}", e);
                return false;
            }
        };

    let expected = format!("{CMD_MODE} {}", config.mode);
    let command = format!("{expected}{}", Delimiter::LfCr.as_str());

    let matched = await_mode_echo(&transport, &mut reader, &command, &expected, connect_timeout)
        .await
        .unwrap_or_else(|e| {
            debug!("Mode probe failed: {}", e);
            false
        });

    if let Err(e) = transport.close().await {
        debug!("Error closing probe connection: {}", e);
    }
    matched
}

async fn await_mode_echo(
    transport: &Transport,
    reader: &mut OwnedReadHalf,
    command: &str,
    expected: &str,
    step_timeout: Duration,
) -> Result<bool> {
    transport.write(command.as_bytes()).await?;

    let mut buffer = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let n = timeout(step_timeout, reader.read(&mut chunk))
            .await
            .map_err(|_| AlarmError::ConnectTimeout)??;
        if n == 0 {
            debug!("Panel closed the connection before answering the mode probe");
            return Ok(false);
        }
        buffer.extend_from_slice(&chunk[..n]);

        if contains(&buffer, expected.as_bytes()) {
            return Ok(true);
        }
        if buffer.len() > MAX_BUFFER_BYTES {
            debug!("Mode probe buffer exceeded {} bytes", MAX_BUFFER_BYTES);
            return Ok(false);
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
