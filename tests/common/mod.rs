//! Shared helpers: a loopback stand-in for an outlet and frame decoding.
#![allow(dead_code)]

use serde_json::Value;
use smartoutlet::crypto::{TuyaCipher, signature};
use smartoutlet::protocol::{PROTOCOL_VERSION, REPLY_HEADER_LEN, SIGNATURE_LEN};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const DEV_ID: &str = "abc123";
pub const KEY: &[u8] = b"0123456789abcdef";

/// Wrap a reply body the way the outlet does: 20 header bytes, body, 8 trailer bytes.
pub fn wrap_reply(body: &[u8]) -> Vec<u8> {
    let mut raw = vec![0u8; REPLY_HEADER_LEN];
    raw[2] = 0x55;
    raw[3] = 0xaa;
    raw.extend_from_slice(body);
    raw.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0xaa, 0x55]);
    raw
}

/// Encrypted reply body: version tag, signature placeholder, raw ciphertext.
pub fn encrypted_body(json: &[u8]) -> Vec<u8> {
    let cipher = TuyaCipher::new(KEY).unwrap();
    let mut body = PROTOCOL_VERSION.to_vec();
    body.extend_from_slice(&[b'0'; SIGNATURE_LEN]);
    body.extend_from_slice(&cipher.encrypt(json));
    body
}

/// Encrypted reply body carrying a valid signature over the base64 ciphertext.
pub fn signed_encrypted_body(json: &[u8]) -> Vec<u8> {
    let cipher = TuyaCipher::new(KEY).unwrap();
    let ciphertext = cipher.encrypt(json);
    let mut body = PROTOCOL_VERSION.to_vec();
    body.extend_from_slice(&signature(
        &cipher.encrypt_b64(json),
        PROTOCOL_VERSION,
        KEY,
    ));
    body.extend_from_slice(&ciphertext);
    body
}

/// Number of requests the mock outlet is serving right now, and the most it
/// ever served at once.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGauge {
    open: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConnectionGauge {
    fn enter(&self) {
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(open, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Accept one connection per entry in `replies`, in order.
///
/// Each connection reads one frame and answers with the reply, or stays silent
/// for a while when the reply is `None`. Returns the frames received.
pub async fn mock_outlet(replies: Vec<Option<Vec<u8>>>) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>) {
    let (addr, handle, _) = gauged_outlet(replies, Duration::ZERO).await;
    (addr, handle)
}

/// Like [`mock_outlet`], but every connection is served on its own task and held
/// for `hold` before replying, so overlapping requests show up in the gauge.
pub async fn gauged_outlet(
    replies: Vec<Option<Vec<u8>>>,
    hold: Duration,
) -> (SocketAddr, JoinHandle<Vec<Vec<u8>>>, ConnectionGauge) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gauge = ConnectionGauge::default();

    let server_gauge = gauge.clone();
    let handle = tokio::spawn(async move {
        let mut connections = Vec::new();
        for reply in replies {
            let (mut socket, _) = listener.accept().await.unwrap();
            let gauge = server_gauge.clone();
            gauge.enter();

            connections.push(tokio::spawn(async move {
                let mut buf = vec![0u8; 1024];
                let n = socket.read(&mut buf).await.unwrap();
                tokio::time::sleep(hold).await;
                // counted until the reply goes out; the client only moves on after that
                gauge.leave();

                match reply {
                    Some(data) => socket.write_all(&data).await.unwrap(),
                    None => tokio::time::sleep(Duration::from_secs(2)).await,
                }
                buf[..n].to_vec()
            }));
        }

        let mut frames = Vec::new();
        for connection in connections {
            frames.push(connection.await.unwrap());
        }
        frames
    });

    (addr, handle, gauge)
}

/// Decode a set frame back to its JSON command.
pub fn decode_set_frame(frame: &[u8]) -> Value {
    assert_eq!(frame[11], 0x07, "set frames use the control command byte");
    assert_eq!(frame[15] as usize, frame.len() - 16);

    let payload = &frame[16..frame.len() - 8];
    assert_eq!(&payload[..3], PROTOCOL_VERSION);
    let ciphertext_b64 = &payload[3 + SIGNATURE_LEN..];
    let json = TuyaCipher::new(KEY)
        .unwrap()
        .decrypt_b64(ciphertext_b64)
        .unwrap();
    assert!(!json.contains(&b' '));
    serde_json::from_slice(&json).unwrap()
}
