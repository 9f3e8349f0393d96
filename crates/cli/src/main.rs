use clap::Parser;
use snapfilter_cli::cli::Cli;
use snapfilter_cli::{commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		error!(target = "snapfilter", error = %format!("{err:#}"), "command failed");
		std::process::exit(1);
	}
}
