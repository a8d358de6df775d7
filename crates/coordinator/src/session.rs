//! PUSH and PULL session state machines driven by the coordinator side of
//! the wire protocol, built on the framed endpoint and
//! handshake primitives from `spits-wire`.

use std::net::SocketAddr;
use std::time::Duration;

use spits_core::{JobId, RunId, TaskId};
use spits_wire::{handshake, FramedEndpoint, ProtocolError, Verb};
use tracing::warn;

/// Connects, performs the job-identity handshake, and returns an endpoint
/// ready for a verb exchange. A failed handshake writes nothing beyond
/// the handshake itself and is surfaced to the caller as
/// any other transient error — callers close and retry next round.
pub async fn connect(
    addr: SocketAddr,
    jobid: &JobId,
    connect_timeout: Duration,
    handshake_timeout: Duration,
) -> Result<FramedEndpoint, ProtocolError> {
    let mut endpoint = FramedEndpoint::open(addr, connect_timeout).await?;
    handshake(&mut endpoint, jobid, handshake_timeout).await?;
    Ok(endpoint)
}

async fn read_verb(endpoint: &mut FramedEndpoint, deadline: Duration) -> Result<Verb, ProtocolError> {
    let code = endpoint.read_i64(deadline).await?;
    Verb::from_code(code).ok_or(ProtocolError::UnknownVerb(code))
}

/// Result of one PUSH session: the tasks successfully framed
/// onto the wire, and whether the native generator reported exhaustion
/// during this session.
#[derive(Debug, Default)]
pub struct PushOutcome {
    pub dispatched: Vec<(TaskId, Vec<u8>)>,
    pub generation_done: bool,
}

/// Drives one PUSH session. `next_task` is called once per admitted slot
/// and must mirror `job_manager_next_task`: `Some((taskid, payload))`
/// when a task is available, `has_more = false` once generation is
/// exhausted (independent of whether a task accompanied that call).
pub async fn push_session(
    endpoint: &mut FramedEndpoint,
    runid: RunId,
    deadline: Duration,
    mut next_task: impl FnMut() -> (Option<(TaskId, Vec<u8>)>, bool),
) -> Result<PushOutcome, ProtocolError> {
    let mut outcome = PushOutcome::default();

    endpoint.write_i64(Verb::SendTask.code()).await?;

    loop {
        match read_verb(endpoint, deadline).await? {
            Verb::SendFull => break,
            Verb::SendRjct => {
                warn!("worker rejected task admission, ending push session");
                break;
            }
            Verb::SendMore => {
                let (task, has_more) = next_task();
                if !has_more {
                    outcome.generation_done = true;
                }
                let Some((taskid, payload)) = task else {
                    break;
                };
                endpoint.write_i64(taskid as i64).await?;
                endpoint.write_i64(i64::from(runid)).await?;
                endpoint.write_bytes(&payload).await?;
                outcome.dispatched.push((taskid, payload));
            }
            got => {
                return Err(ProtocolError::UnexpectedVerb { expected: "SEND_MORE|SEND_FULL|SEND_RJCT", got })
            }
        }
    }

    Ok(outcome)
}

/// One result frame drained in a PULL session: `(taskid, taskrunid,
/// status, payload)`.
pub type PulledResult = (TaskId, RunId, i64, Vec<u8>);

/// Drives one PULL session. The worker's reply stream alternates
/// result frames and the coordinator's per-result ACK until the worker
/// signals `READ_EMPTY`; the leading int64 of each reply is the verb code
/// `READ_EMPTY` or, for a result frame, the `taskid` itself — the two
/// spaces share the wire and are disambiguated only by protocol state,
/// matching the source this was specified from.
pub async fn pull_session(
    endpoint: &mut FramedEndpoint,
    deadline: Duration,
) -> Result<Vec<PulledResult>, ProtocolError> {
    let mut results = Vec::new();

    endpoint.write_i64(Verb::ReadResult.code()).await?;

    loop {
        let head = endpoint.read_i64(deadline).await?;
        if head == Verb::ReadEmpty.code() {
            break;
        }
        let taskid = head as TaskId;
        let runid = endpoint.read_i64(deadline).await? as RunId;
        let status = endpoint.read_i64(deadline).await?;
        let payload = endpoint.read_bytes(deadline).await?;
        results.push((taskid, runid, status, payload));
        // ACK : if this write fails the worker re-queues the
        // result it just sent, so losing the ACK never drops data.
        endpoint.write_i64(Verb::ReadResult.code()).await?;
    }

    Ok(results)
}

/// Sends a liveness probe; no reply is expected.
pub async fn send_heartbeat(endpoint: &mut FramedEndpoint) -> Result<(), ProtocolError> {
    endpoint.write_i64(Verb::SendHeart.code()).await
}

/// Broadcasts process termination to a worker (`kill_tms`).
pub async fn send_terminate(endpoint: &mut FramedEndpoint) -> Result<(), ProtocolError> {
    endpoint.write_i64(Verb::Terminate.code()).await
}

#[cfg(test)]
mod tests {
    use super::*;
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

    async fn worker_side_push(mut endpoint: FramedEndpoint, admits: Vec<Verb>) {
        let verb = endpoint.read_i64(Duration::from_secs(1)).await.expect("verb");
        assert_eq!(verb, Verb::SendTask.code());
        for reply in admits {
            endpoint.write_i64(reply.code()).await.expect("reply");
            if matches!(reply, Verb::SendFull | Verb::SendRjct) {
                break;
            }
            let _taskid = endpoint.read_i64(Duration::from_secs(1)).await.expect("taskid");
            let _runid = endpoint.read_i64(Duration::from_secs(1)).await.expect("runid");
            let _payload = endpoint.read_bytes(Duration::from_secs(1)).await.expect("payload");
        }
    }

    #[tokio::test]
    async fn push_session_stops_on_send_full() {
        let (mut coord, worker) = pair().await;
        let handle = tokio::spawn(worker_side_push(worker, vec![Verb::SendFull]));
        let outcome = push_session(&mut coord, 1, Duration::from_secs(1), || {
            (Some((1, vec![0x01])), true)
        })
        .await
        .expect("session");
        handle.await.expect("worker task");
        assert!(outcome.dispatched.is_empty());
        assert!(!outcome.generation_done);
    }

    #[tokio::test]
    async fn push_session_dispatches_until_generation_exhausted() {
        let (mut coord, worker) = pair().await;
        let handle = tokio::spawn(worker_side_push(
            worker,
            vec![Verb::SendMore, Verb::SendMore],
        ));
        let mut remaining = vec![(1u64, vec![0xAA]), (2u64, vec![0xBB])];
        let outcome = push_session(&mut coord, 7, Duration::from_secs(1), || {
            if remaining.is_empty() {
                (None, false)
            } else {
                let task = remaining.remove(0);
                (Some(task), !remaining.is_empty())
            }
        })
        .await
        .expect("session");
        handle.await.expect("worker task");
        assert_eq!(outcome.dispatched.len(), 2);
        assert!(outcome.generation_done);
    }

    #[tokio::test]
    async fn push_session_ends_on_rejection() {
        let (mut coord, worker) = pair().await;
        let handle = tokio::spawn(worker_side_push(worker, vec![Verb::SendMore, Verb::SendRjct]));
        let outcome = push_session(&mut coord, 1, Duration::from_secs(1), || {
            (Some((1, vec![])), true)
        })
        .await
        .expect("session");
        handle.await.expect("worker task");
        assert_eq!(outcome.dispatched.len(), 1);
    }

    #[tokio::test]
    async fn pull_session_drains_to_empty() {
        let (mut coord, mut worker) = pair().await;
        let handle = tokio::spawn(async move {
            let verb = worker.read_i64(Duration::from_secs(1)).await.expect("verb");
            assert_eq!(verb, Verb::ReadResult.code());
            worker.write_i64(5).await.expect("taskid"); // result frame
            worker.write_i64(1).await.expect("runid");
            worker.write_i64(0).await.expect("status");
            worker.write_bytes(&[0x02]).await.expect("payload");
            let ack = worker.read_i64(Duration::from_secs(1)).await.expect("ack");
            assert_eq!(ack, Verb::ReadResult.code());
            worker.write_i64(Verb::ReadEmpty.code()).await.expect("empty");
        });
        let results = pull_session(&mut coord, Duration::from_secs(1)).await.expect("pull");
        handle.await.expect("worker task");
        assert_eq!(results, vec![(5, 1, 0, vec![0x02])]);
    }

    #[tokio::test]
    async fn pull_session_with_no_completions_is_immediately_empty() {
        let (mut coord, mut worker) = pair().await;
        let handle = tokio::spawn(async move {
            let verb = worker.read_i64(Duration::from_secs(1)).await.expect("verb");
            assert_eq!(verb, Verb::ReadResult.code());
            worker.write_i64(Verb::ReadEmpty.code()).await.expect("empty");
        });
        let results = pull_session(&mut coord, Duration::from_secs(1)).await.expect("pull");
        handle.await.expect("worker task");
        assert!(results.is_empty());
    }
}
