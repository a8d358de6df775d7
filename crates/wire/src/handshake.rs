//! Job-identity handshake: every session begins with each side
//! writing its `jobid` and reading the peer's; a mismatch closes the
//! connection and logs at ERROR ("Protocol anomaly").

use std::time::Duration;

use spits_core::JobId;
use tracing::error;

use crate::endpoint::FramedEndpoint;
use crate::error::ProtocolError;

/// Performs the handshake on an already-connected endpoint. Writes
/// nothing beyond the handshake exchange itself when it fails — callers
/// must not issue a verb before this returns `Ok`.
pub async fn handshake(
    endpoint: &mut FramedEndpoint,
    local_job: &JobId,
    deadline: Duration,
) -> Result<(), ProtocolError> {
    endpoint.write_string(local_job.as_str()).await?;
    let peer = endpoint.read_string(deadline).await?;
    if peer != local_job.as_str() {
        error!(local = %local_job, peer = %peer, "job id mismatch, closing connection");
        return Err(ProtocolError::JobIdMismatch { local: local_job.to_string(), peer });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
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
    async fn matching_job_ids_succeed() {
        let (mut a, mut b) = pair().await;
        let job = JobId::new("job-1");
        let (ra, rb) = tokio::join!(
            handshake(&mut a, &job, Duration::from_secs(1)),
            handshake(&mut b, &job, Duration::from_secs(1)),
        );
        assert!(ra.is_ok());
        assert!(rb.is_ok());
    }

    #[tokio::test]
    async fn mismatched_job_ids_fail_both_sides() {
        let (mut a, mut b) = pair().await;
        let (ra, rb) = tokio::join!(
            handshake(&mut a, &JobId::new("job-a"), Duration::from_secs(1)),
            handshake(&mut b, &JobId::new("job-b"), Duration::from_secs(1)),
        );
        assert!(matches!(ra, Err(ProtocolError::JobIdMismatch { .. })));
        assert!(matches!(rb, Err(ProtocolError::JobIdMismatch { .. })));
    }
}
