/// Test doubles to simulate a byte link during integration tests.
use std::sync::Arc;

use dmtp_codec::protocol::transport::traits::byte_link::{ByteSink, ByteSource};
use tokio::sync::{mpsc, Mutex};

#[derive(Clone)]
#[allow(dead_code)]
/// In-memory byte link reproducing the `ByteSource`/`ByteSink` behavior of
/// a socket or serial port. Bytes written on one endpoint arrive on the
/// other; a closed peer reads as zero bytes (EOF).
pub struct MockLink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    pending: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl MockLink {
    /// Construct a pair of interconnected endpoints (client ↔ server).
    pub fn create_pair() -> (Self, Self) {
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();

        let client = Self {
            tx: client_tx,
            rx: Arc::new(Mutex::new(client_rx)),
            pending: Arc::new(Mutex::new(Vec::new())),
        };
        let server = Self {
            tx: server_tx,
            rx: Arc::new(Mutex::new(server_rx)),
            pending: Arc::new(Mutex::new(Vec::new())),
        };
        (client, server)
    }

    /// Endpoint fed by a fixed byte script; reads past the end return zero
    /// bytes, like a starved stream.
    pub fn from_script(script: &[u8]) -> Self {
        let (endpoint, peer) = Self::create_pair();
        peer.tx.send(script.to_vec()).expect("send script");
        drop(peer);
        endpoint
    }

    /// Push raw bytes at the peer without going through the framer.
    pub fn inject(&self, bytes: &[u8]) {
        self.tx.send(bytes.to_vec()).expect("peer closed");
    }
}

impl ByteSource for MockLink {
    type Error = ();

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut pending = self.pending.lock().await;
        if pending.is_empty() {
            let mut rx = self.rx.lock().await;
            match rx.try_recv() {
                Ok(chunk) => pending.extend_from_slice(&chunk),
                // Closed or momentarily empty peer reads as zero bytes;
                // the framer decides whether that is a timeout.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(pending.len());
        buf[..n].copy_from_slice(&pending[..n]);
        pending.drain(..n);
        Ok(n)
    }
}

impl ByteSink for MockLink {
    type Error = ();

    async fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.tx.send(data.to_vec()).map_err(|_| ())
    }
}
