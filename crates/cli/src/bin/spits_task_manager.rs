use clap::Parser;
use spits_cli::args::TaskManagerArgs;
use spits_cli::{commands, logging};

#[tokio::main]
async fn main() {
    let args = TaskManagerArgs::parse();
    logging::init(args.log.as_deref(), args.verbose);
    std::process::exit(commands::task_manager::run(args).await);
}
