//! Per-job directory lifecycle files: `job`, `finished`, `jm.pid`,
//! `TM-*.pid`, and a `logs/` subdirectory. Creating the directory itself
//! and spawning the processes that populate it are out of scope (owned by
//! process-supervisor scripts); this module only writes and reads the
//! files the coordinator and worker processes are responsible for.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{io_err, DiscoveryError};

/// Run status recorded in the `finished` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishedStatus {
    NotStarted,
    Running,
    CompletedAt(i64),
}

impl FinishedStatus {
    fn to_value(self) -> i64 {
        match self {
            FinishedStatus::NotStarted => -1,
            FinishedStatus::Running => 0,
            FinishedStatus::CompletedAt(ts) => ts,
        }
    }

    fn from_value(v: i64) -> Self {
        match v {
            -1 => FinishedStatus::NotStarted,
            0 => FinishedStatus::Running,
            ts => FinishedStatus::CompletedAt(ts),
        }
    }
}

/// A process descriptor written to `jm.pid` or `TM-<name>.pid`: PID,
/// command line, and announce-file path on separate lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    pub pid: u32,
    pub command_line: String,
    pub announce_file: PathBuf,
}

pub struct JobDir {
    dir: PathBuf,
}

impl JobDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    pub fn ensure_layout(&self) -> Result<(), DiscoveryError> {
        fs::create_dir_all(self.logs_dir()).map_err(|e| io_err(self.dir.display().to_string(), e))
    }

    pub fn write_job(&self, command_line: &str) -> Result<(), DiscoveryError> {
        let path = self.dir.join("job");
        fs::write(&path, command_line).map_err(|e| io_err(path.display().to_string(), e))
    }

    pub fn write_finished(&self, status: FinishedStatus) -> Result<(), DiscoveryError> {
        let path = self.dir.join("finished");
        fs::write(&path, status.to_value().to_string()).map_err(|e| io_err(path.display().to_string(), e))
    }

    pub fn read_finished(&self) -> Result<FinishedStatus, DiscoveryError> {
        let path = self.dir.join("finished");
        match fs::read_to_string(&path) {
            Ok(text) => {
                let v: i64 = text.trim().parse().unwrap_or(-1);
                Ok(FinishedStatus::from_value(v))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FinishedStatus::NotStarted),
            Err(e) => Err(io_err(path.display().to_string(), e)),
        }
    }

    fn pid_file_path(&self, file_stem: &str) -> PathBuf {
        self.dir.join(file_stem)
    }

    /// Writes `jm.pid` (coordinator) or `TM-<name>.pid` (worker).
    pub fn write_pid_file(
        &self,
        file_stem: &str,
        descriptor: &ProcessDescriptor,
    ) -> Result<(), DiscoveryError> {
        let path = self.pid_file_path(file_stem);
        let contents = format!(
            "{}\n{}\n{}\n",
            descriptor.pid,
            descriptor.command_line,
            descriptor.announce_file.display()
        );
        fs::write(&path, contents).map_err(|e| io_err(path.display().to_string(), e))
    }

    pub fn read_pid_file(&self, file_stem: &str) -> Result<Option<ProcessDescriptor>, DiscoveryError> {
        let path = self.pid_file_path(file_stem);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(path.display().to_string(), e)),
        };
        let mut lines = text.lines();
        let pid: u32 = match lines.next().and_then(|l| l.trim().parse().ok()) {
            Some(pid) => pid,
            None => return Ok(None),
        };
        let command_line = lines.next().unwrap_or_default().to_string();
        let announce_file = PathBuf::from(lines.next().unwrap_or_default());
        Ok(Some(ProcessDescriptor { pid, command_line, announce_file }))
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finished_defaults_to_not_started() {
        let dir = tempdir().expect("tempdir");
        let job = JobDir::new(dir.path());
        assert_eq!(job.read_finished().expect("read"), FinishedStatus::NotStarted);
    }

    #[test]
    fn finished_round_trips_every_variant() {
        let dir = tempdir().expect("tempdir");
        let job = JobDir::new(dir.path());
        for status in [FinishedStatus::NotStarted, FinishedStatus::Running, FinishedStatus::CompletedAt(1234)] {
            job.write_finished(status).expect("write");
            assert_eq!(job.read_finished().expect("read"), status);
        }
    }

    #[test]
    fn pid_file_round_trips() {
        let dir = tempdir().expect("tempdir");
        let job = JobDir::new(dir.path());
        let descriptor = ProcessDescriptor {
            pid: 4242,
            command_line: "spits-job-manager job.so".to_string(),
            announce_file: PathBuf::from("/tmp/nodes/worker-a.node"),
        };
        job.write_pid_file("jm.pid", &descriptor).expect("write");
        let read_back = job.read_pid_file("jm.pid").expect("read").expect("present");
        assert_eq!(read_back, descriptor);
    }

    #[test]
    fn missing_pid_file_reads_as_none() {
        let dir = tempdir().expect("tempdir");
        let job = JobDir::new(dir.path());
        assert_eq!(job.read_pid_file("TM-worker-a.pid").expect("read"), None);
    }

    #[test]
    fn ensure_layout_creates_logs_dir() {
        let dir = tempdir().expect("tempdir");
        let job = JobDir::new(dir.path());
        job.ensure_layout().expect("ensure");
        assert!(job.logs_dir().is_dir());
    }
}
