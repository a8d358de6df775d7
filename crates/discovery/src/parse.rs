//! Shared line grammar for `nodes.txt` and per-worker discovery files:
//! `node HOST:PORT` or `proxy NAME PROTO:ADDR:PORT`.
//!
//! Proxy lines are accepted syntactically but never resolved to a live
//! endpoint — parsing one must not fail the whole file.

use tracing::warn;

use crate::endpoint::WorkerEndpoint;

/// Parses a single discovery-file line. Returns `None` for blank lines,
/// comments, unparseable lines, and (deliberately unimplemented) `proxy`
/// lines — never an error, so callers can keep reading the rest of the
/// file.
pub fn parse_line(line: &str) -> Option<WorkerEndpoint> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "node" => {
            let addr = parts.next()?;
            let (host, port) = addr.rsplit_once(':')?;
            let port: u16 = port.parse().ok()?;
            Some(WorkerEndpoint::new(host, port))
        }
        "proxy" => {
            // Syntactically accepted, not implemented.
            warn!(line, "proxy node lines are not implemented, ignoring");
            None
        }
        other => {
            warn!(line, kind = other, "unrecognized discovery line, ignoring");
            None
        }
    }
}

/// Parses every line of a discovery file's text, skipping any that don't
/// parse rather than failing the whole file.
pub fn parse_text(text: &str) -> Vec<WorkerEndpoint> {
    text.lines().filter_map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_node_line() {
        assert_eq!(parse_line("node 127.0.0.1:9000"), Some(WorkerEndpoint::new("127.0.0.1", 9000)));
    }

    #[test]
    fn ignores_proxy_lines_without_failing() {
        assert_eq!(parse_line("proxy relay tcp:10.0.0.1:8080"), None);
    }

    #[test]
    fn ignores_blank_and_comment_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line(" "), None);
        assert_eq!(parse_line("# a comment"), None);
    }

    #[test]
    fn malformed_line_does_not_fail_the_rest_of_the_file() {
        let text = "node not-a-port\nnode 10.0.0.1:9001\n";
        let endpoints = parse_text(text);
        assert_eq!(endpoints, vec![WorkerEndpoint::new("10.0.0.1", 9001)]);
    }

    #[test]
    fn mixed_file_keeps_only_valid_node_lines() {
        let text = "\
        node 10.0.0.1:9001
        proxy relay tcp:10.0.0.2:8080
        # comment
        node 10.0.0.3:9003
        ";
        let endpoints = parse_text(text);
        assert_eq!(
            endpoints,
            vec![WorkerEndpoint::new("10.0.0.1", 9001), WorkerEndpoint::new("10.0.0.3", 9003)]
        );
    }
}
