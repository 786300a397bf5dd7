use std::io::BufRead;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};

use crate::cli::Cli;
use crate::clarity::ClarityValue;
use crate::commands::{app_details, build_connect, resolve_network};
use crate::config::Config;
use crate::error::ConnectError;
use crate::listener::{Callbacks, FinishedTx, ListenerState};
use crate::popup::{Channel, MessagePort, WindowMessage};
use crate::transactions::{ContractCallOptions, ContractDeployOptions, FunctionArg, StxTransferOptions, TxRequest};

pub async fn call(cli: &Cli, contract: &str, function: &str, args: &[String]) -> Result<()> {
	let config = Config::load()?;
	let (address, name) = contract
		.split_once('.')
		.with_context(|| format!("contract must be ADDRESS.NAME, got {contract}"))?;

	let mut options = ContractCallOptions::new(address, name, function, resolve_network(cli, &config));
	for raw in args {
		options = options.arg(parse_function_arg(raw)?);
	}
	if let Some(details) = app_details(&config) {
		options = options.app_details(details);
	}
	submit(cli, &config, options).await
}

pub async fn deploy(cli: &Cli, name: &str, source: &std::path::Path) -> Result<()> {
	let config = Config::load()?;
	let code = std::fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))?;

	let mut options = ContractDeployOptions::new(name, code, resolve_network(cli, &config));
	if let Some(details) = app_details(&config) {
		options = options.app_details(details);
	}
	submit(cli, &config, options).await
}

pub async fn transfer(cli: &Cli, recipient: &str, amount: u128, memo: Option<&str>) -> Result<()> {
	let config = Config::load()?;

	let mut options = StxTransferOptions::new(recipient, amount, resolve_network(cli, &config));
	if let Some(memo) = memo {
		options = options.memo(memo);
	}
	if let Some(details) = app_details(&config) {
		options = options.app_details(details);
	}
	submit(cli, &config, options).await
}

/// A JSON object is taken as a Clarity value, anything else as hex.
pub fn parse_function_arg(raw: &str) -> Result<FunctionArg> {
	let trimmed = raw.trim();
	if trimmed.starts_with('{') {
		let value: ClarityValue =
			serde_json::from_str(trimmed).with_context(|| format!("invalid Clarity value: {trimmed}"))?;
		return Ok(FunctionArg::Value(value));
	}
	Ok(FunctionArg::Hex(trimmed.to_owned()))
}

async fn submit<T: TxRequest>(cli: &Cli, config: &Config, options: T) -> Result<()> {
	let connect = build_connect(cli, config)?;

	let (finished_tx, finished_rx) = oneshot::channel();
	let callbacks = Callbacks::new()
		.on_finish(move |finished| {
			let _ = finished_tx.send(finished);
		})
		.on_cancel(|| tracing::warn!("wallet request cancelled"));

	let channel = connect.open_request(&options, callbacks).await?;
	eprintln!("Waiting for the wallet at {}", channel.origin());
	eprintln!("Request URL: {}", channel.request_url());
	eprintln!("Paste wallet responses as JSON lines; close stdin to cancel.");

	let finished = await_response(channel, finished_rx, stdin_lines()).await?;
	println!("{}", serde_json::to_string_pretty(&finished)?);
	Ok(())
}

/// Forward `{"origin": .., "data": ..}` lines into the channel until the
/// listener settles.  The end of input closes the window.
pub async fn await_response(
	channel: Channel,
	mut finished: oneshot::Receiver<FinishedTx>,
	mut input: mpsc::UnboundedReceiver<String>,
) -> Result<FinishedTx> {
	let port = channel.port();
	let delivered = loop {
		tokio::select! {
			res = &mut finished => break res.ok(),
			line = input.recv() => match line {
				Some(line) => forward(&port, &line),
				None => {
					port.close();
					break (&mut finished).await.ok();
				}
			},
		}
	};

	let state = channel.settled().await;
	match (state, delivered) {
		(ListenerState::Delivered, Some(tx)) => Ok(tx),
		_ => Err(ConnectError::Cancelled.into()),
	}
}

fn forward(port: &MessagePort, line: &str) {
	let line = line.trim();
	if line.is_empty() {
		return;
	}
	match serde_json::from_str::<WindowMessage>(line) {
		Ok(message) => {
			if !port.post_message(message) {
				tracing::debug!("channel already closed, message dropped");
			}
		}
		Err(e) => tracing::warn!(error = %e, "ignoring input that is not a window message"),
	}
}

/// Stdin is read on a plain thread so a pending read never holds up exit.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
	let (tx, rx) = mpsc::unbounded_channel();
	std::thread::spawn(move || {
		for line in std::io::stdin().lock().lines() {
			let Ok(line) = line else { break };
			if tx.send(line).is_err() {
				break;
			}
		}
	});
	rx
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_args_become_clarity_values() {
		let arg = parse_function_arg(r#"{"type":"uint","value":"5"}"#).unwrap();
		assert_eq!(arg, FunctionArg::Value(ClarityValue::UInt(5)));
	}

	#[test]
	fn other_args_pass_through_as_hex() {
		let arg = parse_function_arg(" 0x0100000000000000000000000000000064 ").unwrap();
		assert_eq!(arg, FunctionArg::Hex("0x0100000000000000000000000000000064".into()));
	}

	#[test]
	fn malformed_json_arg_is_rejected() {
		assert!(parse_function_arg(r#"{"type":"uint"}"#).is_err());
	}
}
