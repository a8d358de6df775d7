//! TCP listener that spawns one handler task per accepted connection
//! (`Listener`).

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::error;

/// Binds an address and hands each accepted connection to `handler`.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Binds `addr`. Pass port `0` to let the OS choose a port, then read
    /// it back with [`Listener::local_addr`] — this is how a worker with
    /// a configured port of 0 learns the port it must advertise.
    pub async fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts connections until `handler` decides to stop being called,
    /// i.e. forever — the loop ends only when the listener itself errors
    /// out or the caller drops the future (select! cancellation).
    pub async fn serve<F, Fut>(&self, handler: F)
    where
    F: Fn(TcpStream, SocketAddr) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
    {
        loop {
            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move { handler(stream, addr).await });
                }
                Err(e) => error!(error = %e, "accept error"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn advertises_bound_port_when_zero_requested() {
        let listener = Listener::bind("127.0.0.1:0".parse().expect("addr")).await.expect("bind");
        assert_ne!(listener.local_addr().expect("addr").port(), 0);
    }

    #[tokio::test]
    async fn spawns_handler_per_connection() {
        let listener = Listener::bind("127.0.0.1:0".parse().expect("addr")).await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        tokio::spawn(async move {
                listener
                .serve(move |_stream, _addr| {
                        let count = Arc::clone(&count_clone);
                        async move {
                            count.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                .await;
            });

        let _ = TcpStream::connect(addr).await.expect("connect 1");
        let _ = TcpStream::connect(addr).await.expect("connect 2");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
