//! One-shot control client: connects, performs the job-identity
//! handshake, issues a single verb, and reads back the JSON reply. Unlike
//! `spits_coordinator::session`, which drives long-lived PUSH/PULL
//! sessions, every call here opens a fresh connection and closes it.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use spits_core::JobId;
use spits_wire::{handshake, FramedEndpoint, ProtocolError, Verb};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("malformed reply: {0}")]
    MalformedReply(#[from] serde_json::Error),
}

pub struct ControlClient {
    endpoint: FramedEndpoint,
    deadline: Duration,
}

impl ControlClient {
    pub async fn connect(
        addr: SocketAddr,
        jobid: &JobId,
        connect_timeout: Duration,
        deadline: Duration,
    ) -> Result<Self, ClientError> {
        let mut endpoint = FramedEndpoint::open(addr, connect_timeout).await?;
        handshake(&mut endpoint, jobid, deadline).await?;
        Ok(Self { endpoint, deadline })
    }

    async fn query(&mut self, verb: Verb) -> Result<Value, ClientError> {
        self.endpoint.write_i64(verb.code()).await?;
        let body = self.endpoint.read_string(self.deadline).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn query_with_arg(&mut self, verb: Verb, arg: &str) -> Result<Value, ClientError> {
        self.endpoint.write_i64(verb.code()).await?;
        self.endpoint.write_string(arg).await?;
        let body = self.endpoint.read_string(self.deadline).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn state(&mut self) -> Result<Value, ClientError> {
        self.query(Verb::QueryState).await
    }

    pub async fn metrics_list(&mut self) -> Result<Value, ClientError> {
        self.query(Verb::QueryMetricsList).await
    }

    pub async fn metrics_last(&mut self, name: &str) -> Result<Value, ClientError> {
        self.query_with_arg(Verb::QueryMetricsLast, name).await
    }

    pub async fn metrics_history(&mut self, name: &str) -> Result<Value, ClientError> {
        self.query_with_arg(Verb::QueryMetricsHistory, name).await
    }

    pub async fn nodes_list(&mut self) -> Result<Value, ClientError> {
        self.query(Verb::NodesList).await
    }

    pub async fn nodes_append(&mut self, name: &str, line: &str) -> Result<Value, ClientError> {
        self.endpoint.write_i64(Verb::NodesAppend.code()).await?;
        self.endpoint.write_string(name).await?;
        self.endpoint.write_string(line).await?;
        let body = self.endpoint.read_string(self.deadline).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn nodes_remove(&mut self, name: &str) -> Result<Value, ClientError> {
        self.query_with_arg(Verb::NodesRemove, name).await
    }
}
