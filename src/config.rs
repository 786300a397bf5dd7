use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectError, Result};
use crate::popup::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub network: NetworkConfig,
	pub wallet: WalletConfig,
	pub app: AppSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
	pub default: String,
	pub testnet_api: String,
	pub mainnet_api: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
	/// Base URL of the installed wallet's signing UI.
	pub provider_url: Option<String>,
	pub popup_width: u32,
	pub popup_height: u32,
	/// Seconds to wait for an answer before cancelling.  Unset waits forever.
	pub timeout_secs: Option<u64>,
	pub launch_browser: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
	pub name: String,
	pub icon: String,
	pub domain: String,
}

impl Default for NetworkConfig {
	fn default() -> Self {
		Self {
			default: "testnet".into(),
			testnet_api: "https://api.testnet.hiro.so".into(),
			mainnet_api: "https://api.mainnet.hiro.so".into(),
		}
	}
}

impl Default for WalletConfig {
	fn default() -> Self {
		Self {
			provider_url: None,
			popup_width: DEFAULT_WIDTH,
			popup_height: DEFAULT_HEIGHT,
			timeout_secs: None,
			launch_browser: true,
		}
	}
}

impl Default for AppSection {
	fn default() -> Self {
		Self {
			name: "stx-connect".into(),
			icon: String::new(),
			domain: "http://localhost".into(),
		}
	}
}

impl Config {
	/// Directory where CLI state is stored (~/.stx-connect/).
	pub fn dir() -> Result<PathBuf> {
		dirs::home_dir()
			.map(|home| home.join(".stx-connect"))
			.ok_or_else(|| ConnectError::Config("could not determine home directory".into()))
	}

	pub fn path() -> Result<PathBuf> {
		Ok(Self::dir()?.join("config.toml"))
	}

	/// Where signed-in app sessions are kept.
	pub fn sessions_path() -> Result<PathBuf> {
		Ok(Self::dir()?.join("sessions.json"))
	}

	/// Load config from disk, falling back to defaults if no file exists.
	pub fn load() -> Result<Self> {
		let path = Self::path()?;
		if !path.exists() {
			return Ok(Self::default());
		}
		let content = std::fs::read_to_string(&path)?;
		Self::parse(&content)
	}

	pub fn parse(content: &str) -> Result<Self> {
		toml::from_str(content).map_err(|e| ConnectError::Config(e.to_string()))
	}

	/// Persist the current config to disk, creating the directory if needed.
	pub fn save(&self) -> Result<()> {
		let path = Self::path()?;
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let body = toml::to_string_pretty(self).map_err(|e| ConnectError::Config(e.to_string()))?;
		std::fs::write(&path, body)?;
		Ok(())
	}

	/// Return the API URL for the given network name.
	pub fn api_url(&self, network: &str) -> &str {
		match network {
			"mainnet" => &self.network.mainnet_api,
			_ => &self.network.testnet_api,
		}
	}

	pub fn timeout(&self) -> Option<Duration> {
		self.wallet.timeout_secs.map(Duration::from_secs)
	}
}
