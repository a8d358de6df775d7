use clap::Parser;
use spits_cli::args::CreateJobArgs;
use spits_cli::{commands, logging};

fn main() {
    let args = CreateJobArgs::parse();
    logging::init(args.log.as_deref(), args.verbose);
    std::process::exit(commands::create_job::run(args));
}
