//! The single shared `nodes.txt` rendezvous file. Deprecated
//! relative to [`crate::nodes_dir::NodesDir`] — a
//! multi-worker deployment writing this file concurrently can interleave
//! lines — but still readable for interoperability with that style.

use std::fs;
use std::path::{Path, PathBuf};

use crate::endpoint::WorkerEndpoint;
use crate::error::{io_err, DiscoveryError};
use crate::parse::parse_text;

pub struct NodesFile {
    path: PathBuf,
}

impl NodesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads and parses the file. A missing file reads as empty.
    pub fn list(&self) -> Result<Vec<WorkerEndpoint>, DiscoveryError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(parse_text(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_err(self.path.display().to_string(), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn missing_file_lists_as_empty() {
        let dir = tempdir().expect("tempdir");
        let nodes = NodesFile::new(dir.path().join("nodes.txt"));
        assert_eq!(nodes.list().expect("list"), vec![]);
    }

    #[test]
    fn reads_node_lines_from_a_shared_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nodes.txt");
        let mut f = fs::File::create(&path).expect("create");
        writeln!(f, "node 10.0.0.1:9001").expect("write");
        writeln!(f, "node 10.0.0.2:9002").expect("write");
        let nodes = NodesFile::new(path);
        assert_eq!(
            nodes.list().expect("list"),
            vec![WorkerEndpoint::new("10.0.0.1", 9001), WorkerEndpoint::new("10.0.0.2", 9002)]
        );
    }
}
