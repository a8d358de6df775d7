//! Heartbeat routine: periodically probes every known worker so
//! its idle timer resets. Heartbeats never mutate the membership list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Config;
use crate::discovery_refresh::EndpointCache;
use crate::session::{self, send_heartbeat};
use crate::state::CoordinatorState;

pub async fn run(state: Arc<CoordinatorState>, config: Arc<Config>) {
    let mut endpoints = EndpointCache::new();

    while state.is_running() {
        let pass_started = Instant::now();
        let targets = endpoints.refresh(&config).to_vec();

        for endpoint in &targets {
            if !state.is_running() {
                break;
            }
            let addr = match endpoint.resolve() {
                Ok(addr) => addr,
                Err(error) => {
                    debug!(%endpoint, %error, "could not resolve worker endpoint for heartbeat");
                    continue;
                }
            };

            match session::connect(
                addr,
                &state.jobid,
                config.connect_timeout,
                config.heartbeat_response_timeout,
            )
            .await
            {
                Ok(mut conn) => {
                    if let Err(error) = send_heartbeat(&mut conn).await {
                        debug!(%endpoint, %error, "heartbeat send failed");
                    }
                    conn.close().await;
                }
                Err(error) => debug!(%endpoint, %error, "heartbeat connect/handshake failed"),
            }
        }

        let elapsed = pass_started.elapsed();
        if elapsed < config.heartbeat_interval {
            tokio::time::sleep(config.heartbeat_interval - elapsed).await;
        }
    }
}
