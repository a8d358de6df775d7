//! Shared "reread the discovery directory" step used by the generator,
//! collector, and heartbeat loops.

use spits_discovery::{NodesDir, NodesFile, WorkerEndpoint};
use tracing::warn;

use crate::config::{AnnounceStyle, Config};

pub struct EndpointCache {
    previous: Vec<WorkerEndpoint>,
}

impl EndpointCache {
    pub fn new() -> Self {
        Self { previous: Vec::new() }
    }

    /// Rereads the configured rendezvous location. If the fresh read comes
    /// back empty, the previous round's list is kept and a warning logged
    /// rather than treating a transient empty read as "no
    /// workers".
    pub fn refresh(&mut self, config: &Config) -> &[WorkerEndpoint] {
        if let Some((host, port)) = &config.tm_static {
            self.previous = vec![WorkerEndpoint::new(host.clone(), *port)];
            return &self.previous;
        }
        let fresh = match config.announce_style {
            AnnounceStyle::File => NodesDir::new(config.announce_dir.join("nodes")).list(),
            AnnounceStyle::Cat => NodesFile::new(config.announce_dir.join("nodes.txt")).list(),
        };
        match fresh {
            Ok(endpoints) if !endpoints.is_empty() => {
                self.previous = endpoints;
            }
            Ok(_) => {
                if !self.previous.is_empty() {
                    warn!("discovery round found no workers, keeping previous list");
                }
            }
            Err(error) => {
                warn!(%error, "failed to reread discovery directory, keeping previous list");
            }
        }
        &self.previous
    }
}

impl Default for EndpointCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_round_keeps_previous_list() {
        let dir = tempdir().expect("tempdir");
        let mut config = Config::default();
        config.announce_dir = dir.path().to_path_buf();
        let nodes = NodesDir::new(dir.path().join("nodes"));
        nodes.announce("a", &WorkerEndpoint::new("10.0.0.1", 9001)).expect("announce");

        let mut cache = EndpointCache::new();
        assert_eq!(cache.refresh(&config).len(), 1);

        nodes.remove("a").expect("remove");
        assert_eq!(cache.refresh(&config).len(), 1, "stale read should keep previous list");
    }

    #[test]
    fn zero_workers_ever_discovered_is_an_empty_list() {
        let dir = tempdir().expect("tempdir");
        let mut config = Config::default();
        config.announce_dir = dir.path().to_path_buf();
        let mut cache = EndpointCache::new();
        assert!(cache.refresh(&config).is_empty());
    }

    #[test]
    fn static_tm_mode_bypasses_discovery_directory() {
        // `announce_dir` points nowhere real and nothing is ever written
        // under it; `tm_static` must still produce the one fixed endpoint.
        let dir = tempdir().expect("tempdir");
        let mut config = Config::default();
        config.announce_dir = dir.path().join("does-not-exist");
        config.tm_static = Some(("worker-1.internal".to_string(), 9100));

        let mut cache = EndpointCache::new();
        let endpoints = cache.refresh(&config);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0], WorkerEndpoint::new("worker-1.internal", 9100));
    }

    #[test]
    fn static_tm_mode_ignores_a_populated_discovery_directory() {
        let dir = tempdir().expect("tempdir");
        let mut config = Config::default();
        config.announce_dir = dir.path().to_path_buf();
        config.tm_static = Some(("pinned-host".to_string(), 7000));
        let nodes = NodesDir::new(dir.path().join("nodes"));
        nodes.announce("a", &WorkerEndpoint::new("10.0.0.1", 9001)).expect("announce");

        let mut cache = EndpointCache::new();
        let endpoints = cache.refresh(&config);
        assert_eq!(endpoints, &[WorkerEndpoint::new("pinned-host", 7000)]);
    }
}
