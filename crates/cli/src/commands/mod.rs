//! Command implementations behind each `spits-cli` binary.

pub mod control;
pub mod create_job;
pub mod job_manager;
pub mod task_manager;

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_secs() as i64)
    .unwrap_or(0)
}
