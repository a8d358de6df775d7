//! Framed TCP endpoint: fixed-width big-endian int64s, NUL-terminated
//! length-prefixed strings, and length-prefixed byte payloads, each read or
//! written against a per-operation deadline.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::ProtocolError;

/// A single framed TCP connection. Not `Clone`/`Sync` by design — a
/// blocking socket is never shared between threads: every caller owns
/// its endpoint exclusively and drives both read and write sides from
/// one task.
pub struct FramedEndpoint {
    stream: TcpStream,
}

impl FramedEndpoint {
    /// Opens a new connection with a connect deadline.
    pub async fn open(addr: SocketAddr, connect_timeout: Duration) -> Result<Self, ProtocolError> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        stream.set_nodelay(true).ok();
        Ok(Self { stream })
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Closes the connection. Dropping the endpoint is
    /// equivalent; this exists for call sites that want to make the close
    /// explicit in the session's control flow.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }

    async fn write_raw(&mut self, buf: &[u8]) -> Result<(), ProtocolError> {
        self.stream.write_all(buf).await.map_err(map_io_err)
    }

    async fn read_raw(&mut self, n: usize, deadline: Duration) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = vec![0u8; n];
        match timeout(deadline, self.stream.read_exact(&mut buf)).await {
            Ok(Ok(_)) => Ok(buf),
            Ok(Err(e)) => Err(map_io_err(e)),
            Err(_) => Err(ProtocolError::Timeout),
        }
    }

    pub async fn write_i64(&mut self, v: i64) -> Result<(), ProtocolError> {
        self.write_raw(&v.to_be_bytes()).await
    }

    pub async fn read_i64(&mut self, deadline: Duration) -> Result<i64, ProtocolError> {
        let buf = self.read_raw(8, deadline).await?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&buf);
        Ok(i64::from_be_bytes(arr))
    }

    /// Writes a length-prefixed, NUL-terminated string.
    pub async fn write_string(&mut self, s: &str) -> Result<(), ProtocolError> {
        let bytes = s.as_bytes();
        self.write_i64(bytes.len() as i64).await?;
        self.write_raw(bytes).await?;
        self.write_raw(&[0u8]).await
    }

    pub async fn read_string(&mut self, deadline: Duration) -> Result<String, ProtocolError> {
        let len = self.read_i64(deadline).await?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;
        let bytes = self.read_raw(len, deadline).await?;
        let _nul = self.read_raw(1, deadline).await?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Writes a length-prefixed byte payload (task/result bodies).
    /// Unlike strings, there is no trailing NUL.
    pub async fn write_bytes(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        self.write_i64(payload.len() as i64).await?;
        self.write_raw(payload).await
    }

    pub async fn read_bytes(&mut self, deadline: Duration) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_i64(deadline).await?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;
        self.read_raw(len, deadline).await
    }
}

fn map_io_err(e: std::io::Error) -> ProtocolError {
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => {
            ProtocolError::ConnectionClosed
        }
        ErrorKind::TimedOut => ProtocolError::Timeout,
        _ => ProtocolError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tokio::net::TcpListener;

    async fn pair() -> (FramedEndpoint, FramedEndpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let client = tokio::spawn(async move {
                FramedEndpoint::open(addr, Duration::from_secs(1)).await.expect("connect")
            });
        let (stream, _) = listener.accept().await.expect("accept");
        let server = FramedEndpoint::from_stream(stream);
        (client.await.expect("join"), server)
    }

    #[tokio::test]
    async fn int64_round_trips() {
        let (mut client, mut server) = pair().await;
        client.write_i64(-42).await.expect("write");
        let got = server.read_i64(Duration::from_secs(1)).await.expect("read");
        assert_eq!(got, -42);
    }

    #[tokio::test]
    async fn string_round_trips_and_consumes_nul() {
        let (mut client, mut server) = pair().await;
        client.write_string("hello world").await.expect("write");
        client.write_i64(7).await.expect("write marker");
        let got = server.read_string(Duration::from_secs(1)).await.expect("read");
        assert_eq!(got, "hello world");
        let marker = server.read_i64(Duration::from_secs(1)).await.expect("read marker");
        assert_eq!(marker, 7);
    }

    #[tokio::test]
    async fn empty_payload_is_legal() {
        let (mut client, mut server) = pair().await;
        client.write_bytes(&[]).await.expect("write");
        let got = server.read_bytes(Duration::from_secs(1)).await.expect("read");
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn payload_round_trips_byte_identical() {
        let (mut client, mut server) = pair().await;
        let payload: Vec<u8> = (0..=255).collect();
        client.write_bytes(&payload).await.expect("write");
        let got = server.read_bytes(Duration::from_secs(1)).await.expect("read");
        assert_eq!(got, payload);
    }

    #[tokio::test]
    async fn read_after_close_is_connection_closed() {
        let (client, mut server) = pair().await;
        client.close().await;
        let err = server.read_i64(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }

    #[tokio::test]
    async fn read_timeout_is_distinct_from_closed() {
        let (_client, mut server) = pair().await;
        let err = server.read_i64(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout));
    }

    proptest! {
        /// Any byte payload, including one embedding NUL bytes, round-trips
        /// byte-identical (length-prefixed, no NUL scanning).
        #[test]
        fn arbitrary_payload_round_trips(payload in prop::collection::vec(any::<u8>(), 0..512)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                    let (mut client, mut server) = pair().await;
                    client.write_bytes(&payload).await.expect("write");
                    let got = server.read_bytes(Duration::from_secs(1)).await.expect("read");
                    prop_assert_eq!(got, payload);
                    Ok(())
                })?;
        }

        /// Any valid unicode string round-trips, including ones with
        /// embedded NUL bytes in the body (the trailing NUL written by
        /// `write_string` is consumed positionally, not by scanning).
        #[test]
        fn arbitrary_string_round_trips(s in ".*") {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                    let (mut client, mut server) = pair().await;
                    client.write_string(&s).await.expect("write");
                    let got = server.read_string(Duration::from_secs(1)).await.expect("read");
                    prop_assert_eq!(got, s);
                    Ok(())
                })?;
        }
    }
}
