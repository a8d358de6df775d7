//! Worker task server: one handler per accepted connection,
//! dispatching on the verb that follows the job-identity handshake.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use spits_core::JobId;
use spits_wire::{handshake, FramedEndpoint, Listener, ProtocolError, Verb};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::idle::IdleClock;
use crate::pool::TaskPool;

#[derive(Serialize)]
struct MetricListEntry {
    name: String,
    samples: usize,
}

pub struct ServerContext {
    pub jobid: JobId,
    pub pool: Arc<TaskPool>,
    pub idle: Arc<IdleClock>,
    pub metrics: Arc<spits_core::metrics::MetricsStore>,
    pub recv_timeout: Duration,
    pub send_timeout: Duration,
}

pub async fn serve(listener: Listener, ctx: Arc<ServerContext>) {
    listener
        .serve(move |stream, _addr| {
            let ctx = Arc::clone(&ctx);
            async move {
                if let Err(error) = handle_connection(stream, &ctx).await {
                    debug!(%error, "task server connection ended with a transient error");
                }
            }
        })
        .await;
}

async fn handle_connection(stream: TcpStream, ctx: &ServerContext) -> Result<(), ProtocolError> {
    let mut endpoint = FramedEndpoint::from_stream(stream);
    handshake(&mut endpoint, &ctx.jobid, ctx.recv_timeout).await?;

    let code = endpoint.read_i64(ctx.recv_timeout).await?;
    let verb = Verb::from_code(code).ok_or(ProtocolError::UnknownVerb(code))?;
    ctx.idle.touch();

    match verb {
        Verb::Terminate => {
            warn!("received TERMINATE, exiting process");
            std::process::exit(0);
        }
        Verb::SendHeart => Ok(()),
        Verb::SendTask => push_receiver(&mut endpoint, ctx).await,
        Verb::ReadResult => pull_sender(&mut endpoint, ctx).await,
        Verb::QueryMetricsList => {
            let entries: Vec<MetricListEntry> = ctx
                .metrics
                .list()
                .into_iter()
                .map(|(name, samples)| MetricListEntry { name, samples })
                .collect();
            let body = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
            endpoint.write_string(&body).await
        }
        got => Err(ProtocolError::UnexpectedVerb { expected: "task-server verb", got }),
    }
}

/// Admits tasks while the pool has room, ends the session with
/// `SEND_FULL` once it fills.
async fn push_receiver(endpoint: &mut FramedEndpoint, ctx: &ServerContext) -> Result<(), ProtocolError> {
    loop {
        if ctx.pool.full() {
            endpoint.write_i64(Verb::SendFull.code()).await?;
            return Ok(());
        }
        endpoint.write_i64(Verb::SendMore.code()).await?;

        let taskid = endpoint.read_i64(ctx.recv_timeout).await? as u64;
        let runid = endpoint.read_i64(ctx.recv_timeout).await? as u32;
        let payload = endpoint.read_bytes(ctx.recv_timeout).await?;
        ctx.idle.touch();

        if !ctx.pool.try_admit(taskid, runid, payload) {
            // Lost the race against another handler filling the pool
            // between the check above and this admission attempt.
            endpoint.write_i64(Verb::SendRjct.code()).await?;
            return Ok(());
        }
    }
}

/// Drains completed results, reinserting on any I/O failure or missing
/// ACK so nothing is lost.
async fn pull_sender(endpoint: &mut FramedEndpoint, ctx: &ServerContext) -> Result<(), ProtocolError> {
    loop {
        let Some(result) = ctx.pool.try_drain_one() else {
            return endpoint.write_i64(Verb::ReadEmpty.code()).await;
        };

        if let Err(error) = send_result(endpoint, ctx, result.clone()).await {
            ctx.pool.requeue(result);
            return Err(error);
        }
    }
}

async fn send_result(
    endpoint: &mut FramedEndpoint,
    ctx: &ServerContext,
    (taskid, runid, status, payload): crate::pool::CompletedResult,
) -> Result<(), ProtocolError> {
    endpoint.write_i64(taskid as i64).await?;
    endpoint.write_i64(i64::from(runid)).await?;
    endpoint.write_i64(status).await?;
    endpoint.write_bytes(&payload).await?;

    let ack = endpoint.read_i64(ctx.send_timeout).await?;
    if Verb::from_code(ack) != Some(Verb::ReadResult) {
        return Err(ProtocolError::UnknownVerb(ack));
    }
    Ok(())
}
