pub mod session;
pub mod token;
pub mod tx;

use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use crate::cli::Cli;
use crate::config::Config;
use crate::connect::Connect;
use crate::network::StacksNetwork;
use crate::popup::{BrowserOpener, PopupChannel, StaticProvider};
use crate::session::{FileSessionStore, KeyResolver};
use crate::transactions::AppDetails;

/// Environment variable naming the wallet provider when no flag is given.
pub const PROVIDER_ENV: &str = "STX_WALLET_PROVIDER";

/// Resolve the target network from CLI flag or config.
pub fn resolve_network(cli: &Cli, config: &Config) -> StacksNetwork {
	let name = cli.network.as_ref().map(|n| n.as_str()).unwrap_or(config.network.default.as_str());
	StacksNetwork::for_name(name).with_api_url(config.api_url(name))
}

/// Wallet provider URL from CLI flag, then environment, then config.
pub fn resolve_provider(cli: &Cli, config: &Config) -> Result<Option<Url>> {
	let raw = cli
		.provider_url
		.clone()
		.or_else(|| std::env::var(PROVIDER_ENV).ok())
		.or_else(|| config.wallet.provider_url.clone());
	raw.map(|s| Url::parse(&s).with_context(|| format!("invalid provider URL: {s}")))
		.transpose()
}

pub fn app_domain(config: &Config) -> Result<Url> {
	Url::parse(&config.app.domain).with_context(|| format!("invalid app domain: {}", config.app.domain))
}

pub fn app_details(config: &Config) -> Option<AppDetails> {
	(!config.app.name.is_empty()).then(|| AppDetails {
		name: config.app.name.clone(),
		icon: config.app.icon.clone(),
	})
}

pub fn key_resolver(config: &Config) -> Result<KeyResolver> {
	let store = FileSessionStore::new(Config::sessions_path()?);
	Ok(KeyResolver::new(app_domain(config)?, Arc::new(store)))
}

/// Wire a [`Connect`] from CLI flags + config.
pub fn build_connect(cli: &Cli, config: &Config) -> Result<Connect> {
	let opener = if cli.no_browser || !config.wallet.launch_browser {
		BrowserOpener::manual()
	} else {
		BrowserOpener::new()
	};
	let provider = StaticProvider::new(resolve_provider(cli, config)?);
	let popup = PopupChannel::new(Arc::new(provider), Arc::new(opener))
		.with_size(config.wallet.popup_width, config.wallet.popup_height);

	Ok(Connect::new(key_resolver(config)?, popup).with_timeout(config.timeout()))
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;
	use crate::network::TransactionVersion;

	fn cli(args: &[&str]) -> Cli {
		let mut argv = vec!["stx-connect"];
		argv.extend_from_slice(args);
		Cli::parse_from(argv)
	}

	#[test]
	fn network_flag_overrides_config() {
		let mut config = Config::default();
		config.network.mainnet_api = "http://localhost:3999".into();

		let n = resolve_network(&cli(&["--network", "mainnet", "session", "show"]), &config);
		assert_eq!(n.version, TransactionVersion::Mainnet);
		assert_eq!(n.core_api_url, "http://localhost:3999");

		let n = resolve_network(&cli(&["session", "show"]), &config);
		assert_eq!(n.version, TransactionVersion::Testnet);
	}

	#[test]
	fn provider_flag_wins_over_config() {
		let mut config = Config::default();
		config.wallet.provider_url = Some("https://config-wallet.example.com".into());

		let url = resolve_provider(&cli(&["--provider-url", "https://flag-wallet.example.com", "session", "show"]), &config)
			.unwrap()
			.unwrap();
		assert_eq!(url.host_str(), Some("flag-wallet.example.com"));
	}

	#[test]
	fn bad_provider_url_is_rejected() {
		assert!(resolve_provider(&cli(&["--provider-url", "not a url", "session", "show"]), &Config::default()).is_err());
	}

	#[test]
	fn empty_app_name_sends_no_details() {
		let mut config = Config::default();
		assert_eq!(app_details(&config).unwrap().name, "stx-connect");
		config.app.name.clear();
		assert!(app_details(&config).is_none());
	}
}
