use anyhow::Result;

use crate::cli::TokenCommand;
use crate::token;

pub fn run(cmd: &TokenCommand) -> Result<()> {
	match cmd {
		TokenCommand::Decode { token } => decode(token),
		TokenCommand::Verify { token } => verify(token),
	}
}

fn decode(raw: &str) -> Result<()> {
	let decoded = token::decode_token(raw.trim())?;
	println!("{}", serde_json::to_string_pretty(&decoded.header)?);
	println!("{}", serde_json::to_string_pretty(&decoded.payload)?);
	Ok(())
}

fn verify(raw: &str) -> Result<()> {
	let raw = raw.trim();
	if !token::verify_token(raw)? {
		anyhow::bail!("signature does not match the token's public key");
	}
	let decoded = token::decode_token(raw)?;
	println!("Signature valid");
	if let Some(public_key) = decoded.public_key() {
		println!("  Public key: {public_key}");
	}
	Ok(())
}
