// MIT License - Copyright (c) 2026 Peter Wright
// Reader loop: frame, acknowledge, hand off

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::constants::{FRAME_ACK, READ_CHUNK_BYTES};
use crate::error::{AlarmError, Result};
use crate::transport::framer::Framer;
use crate::transport::Transport;

/// Read from the panel until EOF, cancellation or an error.
///
/// Each complete frame is acknowledged with `OK\n` through `transport` before
/// it is pushed onto `frames`. The queue is unbounded so a slow consumer never
/// delays an ack.
///
/// Returns `Ok(())` on EOF or cancellation. A framer overflow, an I/O error or
/// a closed queue is returned as `Err` and ends the session.
pub async fn read_frames<R>(
    mut reader: R,
    transport: &Transport,
    frames: &mpsc::UnboundedSender<String>,
    cancel: &CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut framer = Framer::new();
    let mut buf = vec![0u8; READ_CHUNK_BYTES];

    loop {
        let n = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Reader cancelled");
                return Ok(());
            }
            read = reader.read(&mut buf) => read?,
        };

        if n == 0 {
            debug!("Reader: connection closed by panel");
            return Ok(());
        }

        for frame in framer.push(&buf[..n])? {
            trace!(frame = %frame, "Received frame");
            transport.write(FRAME_ACK).await?;
            frames.send(frame).map_err(|_| AlarmError::ChannelClosed)?;
        }
    }
}
