//! TCP fixtures for reachability tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A loopback listener that accepts and immediately drops connections,
/// counting how many it has seen.
///
/// The accept loop is aborted when the fixture is dropped.
pub struct TestListener {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl TestListener {
    /// Bind to `127.0.0.1:0` and start accepting in the background.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("test listener address");
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });

        Self {
            addr,
            accepted,
            handle,
        }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for TestListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A loopback port with nothing listening on it.
///
/// Binds an ephemeral port and releases it straight away, so a connect gets
/// refused. Another process could grab it in between, which is unlikely
/// enough for tests.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("ephemeral port address").port()
}
