//! Per-worker-file rendezvous directory (preferred style): a
//! directory named `nodes/` with one file per worker, each containing a
//! single `node HOST:PORT` line. Workers create their own file; the
//! coordinator rereads the directory every dispatch round.

use std::fs;
use std::path::{Path, PathBuf};

use crate::endpoint::WorkerEndpoint;
use crate::error::{io_err, DiscoveryError};
use crate::parse::parse_line;

/// Handle to a `nodes/` directory.
pub struct NodesDir {
    dir: PathBuf,
}

impl NodesDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name_for(name: &str) -> String {
        format!("{name}.node")
    }

    /// Rereads every file in the directory, returning the union of
    /// endpoints found. A directory that doesn't exist yet reads as
    /// empty rather than erroring (no workers have announced themselves).
    pub fn list(&self) -> Result<Vec<WorkerEndpoint>, DiscoveryError> {
        let mut endpoints = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(endpoints),
            Err(e) => return Err(io_err(self.dir.display().to_string(), e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| io_err(self.dir.display().to_string(), e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(_) => continue, // transient read race with a worker rewriting its file
            };
            if let Some(line) = text.lines().find_map(parse_line) {
                endpoints.push(line);
            }
        }
        Ok(endpoints)
    }

    /// Writes (or overwrites) this worker's own announce file.
    pub fn announce(&self, name: &str, endpoint: &WorkerEndpoint) -> Result<PathBuf, DiscoveryError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_err(self.dir.display().to_string(), e))?;
        let path = self.dir.join(Self::file_name_for(name));
        fs::write(&path, format!("{}\n", endpoint.to_line()))
            .map_err(|e| io_err(path.display().to_string(), e))?;
        Ok(path)
    }

    /// Removes a worker's announce file (membership mutation,
    /// `NODES_REMOVE`).
    pub fn remove(&self, name: &str) -> Result<(), DiscoveryError> {
        let path = self.dir.join(Self::file_name_for(name));
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(path.display().to_string(), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}
