use clap::Parser;
use spits_cli::args::MetricValuesArgs;
use spits_cli::{commands, logging};

#[tokio::main]
async fn main() {
    let args = MetricValuesArgs::parse();
    logging::init(args.log.as_deref(), args.verbose);
    std::process::exit(commands::control::run(args).await);
}
