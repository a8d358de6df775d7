//! `spits-metric-values` command: the control CLI surface —
//! metrics query and discovery membership mutation against a running
//! coordinator's control server. Exit code 0 on success, 1 on any
//! protocol or I/O failure.

use std::net::ToSocketAddrs;

use spits_core::JobId;
use spits_discovery::WorkerEndpoint;

use crate::args::{ControlCommand, MetricValuesArgs};
use crate::client::ControlClient;

pub async fn run(args: MetricValuesArgs) -> i32 {
    let addr = match (args.host.as_str(), args.port).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => {
                eprintln!("could not resolve {}:{}", args.host, args.port);
                return 1;
            }
        },
        Err(error) => {
            eprintln!("address resolution failed: {error}");
            return 1;
        }
    };

    let jobid = JobId::new(args.jobid.clone());
    let mut client = match ControlClient::connect(addr, &jobid, args.ctimeout, args.rtimeout).await {
        Ok(client) => client,
        Err(error) => {
            eprintln!("connect failed: {error}");
            return 1;
        }
    };

    let result = match &args.command {
        ControlCommand::MetricsList => client.metrics_list().await,
        ControlCommand::MetricsLast { name } => client.metrics_last(name).await,
        ControlCommand::MetricsHistory { name } => client.metrics_history(name).await,
        ControlCommand::State => client.state().await,
        ControlCommand::NodesList => client.nodes_list().await,
        ControlCommand::NodesAppend { name, host, port } => {
            let line = WorkerEndpoint::new(host.clone(), *port).to_line();
            client.nodes_append(name, &line).await
        }
        ControlCommand::NodesRemove { name } => client.nodes_remove(name).await,
    };

    match result {
        Ok(value) => {
            match serde_json::to_string_pretty(&value) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{value}"),
            }
            0
        }
        Err(error) => {
            eprintln!("query failed: {error}");
            1
        }
    }
}
