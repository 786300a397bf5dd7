use serde::{Deserialize, Serialize};

use crate::address;

/// Transaction version byte for a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionVersion {
	Mainnet,
	Testnet,
}

impl TransactionVersion {
	pub fn byte(self) -> u8 {
		match self {
			Self::Mainnet => 0x00,
			Self::Testnet => 0x80,
		}
	}

	pub fn from_byte(b: u8) -> Option<Self> {
		match b {
			0x00 => Some(Self::Mainnet),
			0x80 => Some(Self::Testnet),
			_ => None,
		}
	}

	/// Address version used for single-sig accounts on this network.
	pub fn single_sig_address_version(self) -> u8 {
		match self {
			Self::Mainnet => address::MAINNET_SINGLE_SIG,
			Self::Testnet => address::TESTNET_SINGLE_SIG,
		}
	}
}

/// The network a transaction is meant for.  Serialized into the request
/// payload so the wallet can check it matches its own selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StacksNetwork {
	pub version: TransactionVersion,
	pub chain_id: u32,
	pub core_api_url: String,
}

impl StacksNetwork {
	pub fn mainnet() -> Self {
		Self {
			version: TransactionVersion::Mainnet,
			chain_id: 0x0000_0001,
			core_api_url: "https://api.mainnet.hiro.so".into(),
		}
	}

	pub fn testnet() -> Self {
		Self {
			version: TransactionVersion::Testnet,
			chain_id: 0x8000_0000,
			core_api_url: "https://api.testnet.hiro.so".into(),
		}
	}

	/// Resolve a network by name.  Unknown names fall back to testnet.
	pub fn for_name(name: &str) -> Self {
		match name {
			"mainnet" => Self::mainnet(),
			_ => Self::testnet(),
		}
	}

	/// Same network, different API endpoint.
	pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
		self.core_api_url = url.into();
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chain_ids_match_versions() {
		let m = StacksNetwork::mainnet();
		let t = StacksNetwork::testnet();
		assert_eq!(m.chain_id, 1);
		assert_eq!(m.version.byte(), 0x00);
		assert_eq!(t.chain_id, 0x8000_0000);
		assert_eq!(t.version.byte(), 0x80);
	}

	#[test]
	fn unknown_name_falls_back_to_testnet() {
		assert_eq!(StacksNetwork::for_name("devnet"), StacksNetwork::testnet());
		assert_eq!(StacksNetwork::for_name("mainnet"), StacksNetwork::mainnet());
	}

	#[test]
	fn serializes_camel_case() {
		let v = serde_json::to_value(StacksNetwork::testnet()).unwrap();
		assert_eq!(v["chainId"], 0x8000_0000u32);
		assert_eq!(v["version"], "testnet");
		assert_eq!(v["coreApiUrl"], "https://api.testnet.hiro.so");
	}
}
