use anyhow::Result;

use crate::cli::SessionCommand;
use crate::commands::key_resolver;
use crate::config::Config;
use crate::crypto;
use crate::error::ConnectError;
use crate::session::UserData;

pub async fn run(cmd: &SessionCommand) -> Result<()> {
	match cmd {
		SessionCommand::Init { private_key } => init(private_key.as_deref()).await,
		SessionCommand::Show => show().await,
	}
}

async fn init(private_key: Option<&str>) -> Result<()> {
	let config = Config::load()?;
	let resolver = key_resolver(&config)?;

	let key = match private_key {
		Some(k) => k.trim().to_owned(),
		None => crypto::generate_private_key(),
	};
	let public_key = crypto::derive_public_key(&key)?;

	let session = resolver.default_session();
	session.sign_in(UserData::new(key)).await?;

	println!("Signed in {}", session.app_config().app_domain);
	println!("  Public key: {public_key}");
	println!("  Stored in:  {}", Config::sessions_path()?.display());
	Ok(())
}

async fn show() -> Result<()> {
	let config = Config::load()?;
	let resolver = key_resolver(&config)?;
	let session = resolver.default_session();

	println!("Session");
	println!("  App domain: {}", session.app_config().app_domain);
	match session.load_user_data().await {
		Ok(data) => {
			println!("  Public key: {}", crypto::derive_public_key(&data.app_private_key)?);
			println!("  Since:      {}", data.created_at.to_rfc3339());
			if let Some(address) = &data.identity_address {
				println!("  Identity:   {address}");
			}
		}
		Err(ConnectError::SessionUnavailable(_)) => {
			println!("  Not signed in. Run: stx-connect session init");
		}
		Err(e) => return Err(e.into()),
	}
	Ok(())
}
