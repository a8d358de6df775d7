use clap::Parser;
use spits_cli::args::JobManagerArgs;
use spits_cli::{commands, logging};

#[tokio::main]
async fn main() {
    let args = JobManagerArgs::parse();
    logging::init(args.log.as_deref(), args.verbose);
    match commands::job_manager::run(args).await {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{error:#}");
            std::process::exit(1);
        }
    }
}
