use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
	name = "stx-connect",
	about = "Ask an installed Stacks wallet to sign and broadcast transactions.",
	version
)]
pub struct Cli {
	/// Network the transaction targets.
	#[arg(long, global = true)]
	pub network: Option<Network>,

	/// Override the wallet provider's base URL.
	#[arg(long, global = true)]
	pub provider_url: Option<String>,

	/// Print the request URL instead of launching a browser.
	#[arg(long, global = true)]
	pub no_browser: bool,

	/// Enable debug logging.
	#[arg(short, long, global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Network {
	Testnet,
	Mainnet,
}

impl Network {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Testnet => "testnet",
			Self::Mainnet => "mainnet",
		}
	}
}

#[derive(Subcommand)]
pub enum Command {
	/// Request a contract call.
	Call {
		/// Contract identifier as ADDRESS.NAME.
		contract: String,

		/// Public function to call.
		function: String,

		/// Function argument, repeatable.  A JSON object such as
		/// '{"type":"uint","value":"5"}' or a hex-encoded Clarity value.
		#[arg(long = "arg")]
		args: Vec<String>,
	},

	/// Request a contract deployment.
	Deploy {
		/// Name of the new contract.
		name: String,

		/// Path to the Clarity source file.
		source: PathBuf,
	},

	/// Request an STX transfer.
	Transfer {
		/// Recipient address.
		recipient: String,

		/// Amount in micro-STX.
		amount: u128,

		/// Optional memo.
		#[arg(long)]
		memo: Option<String>,
	},

	/// Manage the app session that holds the signing key.
	Session {
		#[command(subcommand)]
		command: SessionCommand,
	},

	/// Inspect request tokens.
	Token {
		#[command(subcommand)]
		command: TokenCommand,
	},
}

// -- Session subcommands --

#[derive(Subcommand)]
pub enum SessionCommand {
	/// Sign the app in, generating a key unless one is given.
	Init {
		/// Hex private key to use instead of a fresh one.
		#[arg(long)]
		private_key: Option<String>,
	},

	/// Show the current session.
	Show,
}

// -- Token subcommands --

#[derive(Subcommand)]
pub enum TokenCommand {
	/// Print a token's header and payload.
	Decode {
		token: String,
	},

	/// Check a token's signature against its embedded public key.
	Verify {
		token: String,
	},
}
