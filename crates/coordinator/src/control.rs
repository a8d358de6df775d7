//! Control server: answers out-of-band queries over the same
//! framed/handshake/verb wire used by workers. Every reply is a single
//! JSON document written as a length-prefixed string.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use spits_discovery::{NodesDir, WorkerEndpoint};
use spits_wire::{handshake, FramedEndpoint, Listener, ProtocolError, Verb};
use tokio::net::TcpStream;
use tracing::{debug, error};

use crate::config::Config;
use crate::state::{CoordinatorState, Phase};

#[derive(Serialize)]
struct StateDoc {
    phase: &'static str,
    runid: u32,
    pending: usize,
    submissions: usize,
    completed: usize,
}

impl From<Phase> for &'static str {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Init => "init",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Done => "done",
        }
    }
}

#[derive(Serialize)]
struct MetricListEntry {
    name: String,
    samples: usize,
}

pub async fn serve(state: Arc<CoordinatorState>, config: Arc<Config>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.control_port));
    let listener = Listener::bind(addr).await?;
    debug!(port = listener.local_addr()?.port(), "control server listening");

    listener
        .serve(move |stream, _addr| {
            let state = Arc::clone(&state);
            let config = Arc::clone(&config);
            async move {
                if let Err(error) = handle_connection(stream, &state, &config).await {
                    debug!(%error, "control connection ended with a transient error");
                }
            }
        })
        .await;

    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    state: &CoordinatorState,
    config: &Config,
) -> Result<(), ProtocolError> {
    let mut endpoint = FramedEndpoint::from_stream(stream);
    handshake(&mut endpoint, &state.jobid, config.recv_timeout).await?;

    let deadline = config.recv_timeout;
    let code = endpoint.read_i64(deadline).await?;
    let verb = Verb::from_code(code).ok_or(ProtocolError::UnknownVerb(code))?;

    match verb {
        Verb::QueryState => reply_state(&mut endpoint, state, deadline).await,
        Verb::QueryMetricsList => reply_metrics_list(&mut endpoint, state, deadline).await,
        Verb::QueryMetricsLast => reply_metrics_last(&mut endpoint, state, deadline).await,
        Verb::QueryMetricsHistory => reply_metrics_history(&mut endpoint, state, deadline).await,
        Verb::NodesList => reply_nodes_list(&mut endpoint, config, deadline).await,
        Verb::NodesAppend => handle_nodes_append(&mut endpoint, config, deadline).await,
        Verb::NodesRemove => handle_nodes_remove(&mut endpoint, config, deadline).await,
        got => {
            error!(?got, "control server received an unsupported verb");
            Err(ProtocolError::UnexpectedVerb { expected: "control verb", got })
        }
    }
}

async fn reply_state(
    endpoint: &mut FramedEndpoint,
    state: &CoordinatorState,
    _deadline: Duration,
) -> Result<(), ProtocolError> {
    let doc = StateDoc {
        phase: state.phase().into(),
        runid: state.runid(),
        pending: state.pending.len(),
        submissions: state.submissions.len(),
        completed: state.completed.len(),
    };
    write_json(endpoint, &doc).await
}

async fn reply_metrics_list(
    endpoint: &mut FramedEndpoint,
    state: &CoordinatorState,
    _deadline: Duration,
) -> Result<(), ProtocolError> {
    let entries: Vec<MetricListEntry> = state
        .metrics
        .list()
        .into_iter()
        .map(|(name, samples)| MetricListEntry { name, samples })
        .collect();
    write_json(endpoint, &entries).await
}

async fn reply_metrics_last(
    endpoint: &mut FramedEndpoint,
    state: &CoordinatorState,
    deadline: Duration,
) -> Result<(), ProtocolError> {
    let name = endpoint.read_string(deadline).await?;
    write_json(endpoint, &state.metrics.last(&name)).await
}

async fn reply_metrics_history(
    endpoint: &mut FramedEndpoint,
    state: &CoordinatorState,
    deadline: Duration,
) -> Result<(), ProtocolError> {
    let name = endpoint.read_string(deadline).await?;
    write_json(endpoint, &state.metrics.history(&name)).await
}

async fn reply_nodes_list(
    endpoint: &mut FramedEndpoint,
    config: &Config,
    _deadline: Duration,
) -> Result<(), ProtocolError> {
    let nodes = NodesDir::new(config.announce_dir.join("nodes"))
        .list()
        .unwrap_or_default()
        .into_iter()
        .map(|ep| ep.to_line())
        .collect::<Vec<_>>();
    write_json(endpoint, &nodes).await
}

async fn handle_nodes_append(
    endpoint: &mut FramedEndpoint,
    config: &Config,
    deadline: Duration,
) -> Result<(), ProtocolError> {
    let name = endpoint.read_string(deadline).await?;
    let line = endpoint.read_string(deadline).await?;
    let parsed = line
        .rsplit_once(':')
        .and_then(|(h, p)| p.parse::<u16>().ok().map(|p| (h.to_string(), p)));
    let ok = match parsed {
        Some((host, port)) => {
            let dir = NodesDir::new(config.announce_dir.join("nodes"));
            dir.announce(&name, &WorkerEndpoint::new(host, port)).is_ok()
        }
        None => false,
    };
    write_json(endpoint, &ok).await
}

async fn handle_nodes_remove(
    endpoint: &mut FramedEndpoint,
    config: &Config,
    deadline: Duration,
) -> Result<(), ProtocolError> {
    let name = endpoint.read_string(deadline).await?;
    let dir = NodesDir::new(config.announce_dir.join("nodes"));
    let ok = dir.remove(&name).is_ok();
    write_json(endpoint, &ok).await
}

async fn write_json(endpoint: &mut FramedEndpoint, value: &impl Serialize) -> Result<(), ProtocolError> {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    endpoint.write_string(&body).await
}
