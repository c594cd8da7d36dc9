//! Single-shot TCP exchange with an outlet.
//! One connection per request: connect, write the frame, read one reply, close.

use crate::error::{Result, TuyaError};
use log::{debug, info};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default TCP port of Tuya devices.
pub const DEFAULT_PORT: u16 = 6668;
/// Default connect/read/write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Size of the single reply read.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Send `frame` to `address:port` and return whatever arrives in one read.
///
/// The connection is closed before returning, on success and on error alike.
/// No retries happen here.
pub async fn exchange(
    address: &str,
    port: u16,
    connection_timeout: Duration,
    frame: &[u8],
) -> Result<Vec<u8>> {
    let target = format!("{}:{}", address, port);
    info!("Connecting to device at {}", target);

    let mut stream = timeout(connection_timeout, TcpStream::connect(&target))
        .await
        .map_err(|_| TuyaError::Connection(format!("timed out connecting to {}", target)))?
        .map_err(|e| TuyaError::Connection(format!("{}: {}", target, e)))?;

    let result = send_receive(&mut stream, connection_timeout, frame).await;
    if let Err(e) = stream.shutdown().await {
        debug!("Shutdown of {} failed: {}", target, e);
    }
    result
}

async fn send_receive(
    stream: &mut TcpStream,
    io_timeout: Duration,
    frame: &[u8],
) -> Result<Vec<u8>> {
    debug!("Sending frame (hex): {}", hex::encode(frame));
    timeout(io_timeout, stream.write_all(frame))
        .await
        .map_err(|_| TuyaError::Transport("write timeout".into()))?
        .map_err(|e| TuyaError::Transport(e.to_string()))?;

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let n = timeout(io_timeout, stream.read(&mut buf))
        .await
        .map_err(|_| TuyaError::Transport("read timeout".into()))?
        .map_err(|e| TuyaError::Transport(e.to_string()))?;
    buf.truncate(n);

    debug!("Received {} bytes (hex): {}", n, hex::encode(&buf));
    Ok(buf)
}
