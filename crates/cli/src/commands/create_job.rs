//! `spits-create-job` command: lays out a new job directory —
//! `logs/`, the `job` file, and an initial `finished=NotStarted`.

use spits_discovery::jobdir::{FinishedStatus, JobDir};

use crate::args::CreateJobArgs;

pub fn run(args: CreateJobArgs) -> i32 {
    let job_dir = JobDir::new(&args.dir);
    if let Err(error) = job_dir.ensure_layout() {
        eprintln!("failed to create job layout: {error}");
        return 1;
    }
    if let Err(error) = job_dir.write_job(&args.command_line) {
        eprintln!("failed to write job file: {error}");
        return 1;
    }
    if let Err(error) = job_dir.write_finished(FinishedStatus::NotStarted) {
        eprintln!("failed to write finished file: {error}");
        return 1;
    }
    println!("created job directory at {}", job_dir.path().display());
    0
}
