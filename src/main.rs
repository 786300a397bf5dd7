use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stx_connect::cli::{Cli, Command};
use stx_connect::commands;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if cli.verbose {
			EnvFilter::new("debug")
		} else {
			EnvFilter::new("info")
		}
	});
	tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(filter)
		.init();

	match &cli.command {
		Command::Call { contract, function, args } => commands::tx::call(&cli, contract, function, args).await,
		Command::Deploy { name, source } => commands::tx::deploy(&cli, name, source).await,
		Command::Transfer { recipient, amount, memo } => {
			commands::tx::transfer(&cli, recipient, *amount, memo.as_deref()).await
		}
		Command::Session { command } => commands::session::run(command).await,
		Command::Token { command } => commands::token::run(command),
	}
}
