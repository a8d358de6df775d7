//! A worker's advertised listening endpoint ("Worker endpoint").

use std::fmt;
use std::net::SocketAddr;

/// `(host, port)` parsed from a discovery file line. Kept as separate
/// fields rather than a resolved [`SocketAddr`] since `host` may be a
/// name the caller still needs to resolve at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerEndpoint {
    pub host: String,
    pub port: u16,
}

impl WorkerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn to_line(&self) -> String {
        format!("node {}:{}", self.host, self.port)
    }

    /// Resolves to a concrete socket address for connecting.
    pub fn resolve(&self) -> std::io::Result<SocketAddr> {
        use std::net::ToSocketAddrs;
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"))
    }
}

impl fmt::Display for WorkerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_node_line() {
        let ep = WorkerEndpoint::new("10.0.0.5", 9000);
        assert_eq!(ep.to_line(), "node 10.0.0.5:9000");
    }
}
