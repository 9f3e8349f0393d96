mod apply;
mod auth;
mod filters;

use anyhow::Result;

use crate::cli::{AuthAction, Cli, Commands};
use crate::context::build_services;
use crate::output::print_failure;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	let name = command_name(&cli.command);

	let result = match build_services(&cli) {
		Ok(services) => match cli.command {
			Commands::Filters { category } => filters::execute(&services, category.as_deref(), format).await,
			Commands::Apply {
				photo,
				filter,
				output,
				mime,
			} => {
				apply::execute(
					&services,
					apply::ApplyOptions {
						photo,
						filter,
						output,
						mime,
					},
					format,
				)
				.await
			}
			Commands::Auth { action } => match action {
				AuthAction::Status => auth::status(&services, format).await,
				AuthAction::Clear => auth::clear(&services, format).await,
			},
		},
		Err(err) => Err(err),
	};

	if let Err(err) = &result {
		print_failure(format, name, err);
	}
	result
}

fn command_name(command: &Commands) -> &'static str {
	match command {
		Commands::Filters { .. } => "filters",
		Commands::Apply { .. } => "apply",
		Commands::Auth { action: AuthAction::Status } => "auth.status",
		Commands::Auth { action: AuthAction::Clear } => "auth.clear",
	}
}
