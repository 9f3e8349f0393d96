use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "snapfilter")]
#[command(about = "Apply AI photo filters from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// JSON configuration file
	#[arg(long, global = true, value_name = "FILE", env = "SNAPFILTER_CONFIG")]
	pub config: Option<PathBuf>,

	/// API base URL (overrides the configuration file)
	#[arg(long, global = true, value_name = "URL", env = "SNAPFILTER_API_BASE")]
	pub api_base: Option<String>,

	/// Push channel URL (overrides the configuration file)
	#[arg(long, global = true, value_name = "URL", env = "SNAPFILTER_PUSH_URL")]
	pub push_url: Option<String>,

	/// Where the session token is stored
	#[arg(long, global = true, value_name = "FILE")]
	pub token_store: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List available filters
	#[command(alias = "ls")]
	Filters {
		/// Only show filters in this category
		#[arg(short, long)]
		category: Option<String>,
	},

	/// Upload a photo, apply a filter and wait for the result
	Apply {
		/// Photo to process
		photo: PathBuf,

		/// Filter id (see `snapfilter filters`)
		#[arg(long)]
		filter: String,

		/// Download the result to this file
		#[arg(short, long)]
		output: Option<PathBuf>,

		/// Content type of the photo (guessed from the extension by default)
		#[arg(long)]
		mime: Option<String>,
	},

	/// Session token management
	Auth {
		#[command(subcommand)]
		action: AuthAction,
	},
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
	/// Show the stored session
	Status,
	/// Forget the stored session
	Clear,
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_apply_with_global_flags() {
		let cli = Cli::try_parse_from([
			"snapfilter",
			"apply",
			"cat.png",
			"--filter",
			"f1",
			"-o",
			"out.jpg",
			"-vv",
			"--api-base",
			"http://127.0.0.1:9/api/v1",
		])
		.unwrap();
		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.api_base.as_deref(), Some("http://127.0.0.1:9/api/v1"));
		match cli.command {
			Commands::Apply { photo, filter, output, mime } => {
				assert_eq!(photo, PathBuf::from("cat.png"));
				assert_eq!(filter, "f1");
				assert_eq!(output, Some(PathBuf::from("out.jpg")));
				assert!(mime.is_none());
			}
			other => panic!("unexpected command {other:?}"),
		}
	}
}
