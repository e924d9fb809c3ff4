//! Per-connection read loop.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::Dispatcher;
use crate::config::DEFAULT_RECEIVE_BUFFER_SIZE;
use crate::error::Result;
use crate::protocol::{FrameDecoder, DEFAULT_MAX_FRAME_SIZE};
use crate::transport::Stream;

/// Settings applied to every served connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Bytes requested per socket read.
    pub receive_buffer_size: usize,
    /// Largest accepted request payload.
    pub max_frame_size: u32,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Drive one connection until the peer closes it.
///
/// Each complete frame is dispatched and answered in arrival order. The
/// decoder session lives and dies with this call. A framing violation
/// ends the connection with an error once the frames completed before it
/// have been answered.
pub async fn serve_connection<S: Stream>(
    mut stream: S,
    dispatcher: &Dispatcher,
    options: ConnectionOptions,
) -> Result<()> {
    let mut decoder = FrameDecoder::with_max_frame_size(options.max_frame_size);
    let mut buf = vec![0u8; options.receive_buffer_size.max(1)];
    let mut served = 0u64;

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            if !decoder.is_empty() {
                tracing::debug!(
                    "Peer closed with {} bytes of an incomplete frame buffered",
                    decoder.buffered()
                );
            }
            tracing::trace!("Connection done after {} calls", served);
            return Ok(());
        }

        decoder.extend(&buf[..n]);
        loop {
            match decoder.decode() {
                Ok(Some(frame)) => {
                    let response = dispatcher.dispatch(&frame);
                    stream.write_all(&response.encode()).await?;
                    served += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    // Answer what completed before the bad header.
                    stream.flush().await?;
                    tracing::warn!("Closing connection after {} calls: {}", served, e);
                    return Err(e);
                }
            }
        }
        stream.flush().await?;
    }
}
