use serde::{Deserialize, Serialize};

use crate::error::{ConnectError, Result};
use crate::network::StacksNetwork;
use crate::transactions::options::{
	AppDetails, ContractCallOptions, ContractDeployOptions, FunctionArg, StxTransferOptions,
	TransactionOptions,
};

/// The body of a signed request token.  The `txType` tag uses the values
/// wallets expect on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "txType")]
pub enum TransactionPayload {
	#[serde(rename = "contract_call")]
	ContractCall(ContractCallPayload),
	#[serde(rename = "smart_contract")]
	ContractDeploy(ContractDeployPayload),
	#[serde(rename = "token_transfer")]
	StxTransfer(StxTransferPayload),
}

impl TransactionPayload {
	pub fn tx_type(&self) -> &'static str {
		match self {
			Self::ContractCall(_) => "contract_call",
			Self::ContractDeploy(_) => "smart_contract",
			Self::StxTransfer(_) => "token_transfer",
		}
	}

	pub fn public_key(&self) -> &str {
		match self {
			Self::ContractCall(p) => &p.public_key,
			Self::ContractDeploy(p) => &p.public_key,
			Self::StxTransfer(p) => &p.public_key,
		}
	}

	pub fn app_details(&self) -> Option<&AppDetails> {
		match self {
			Self::ContractCall(p) => p.app_details.as_ref(),
			Self::ContractDeploy(p) => p.app_details.as_ref(),
			Self::StxTransfer(p) => p.app_details.as_ref(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallPayload {
	pub contract_address: String,
	pub contract_name: String,
	pub function_name: String,
	pub function_args: Vec<String>,
	pub network: StacksNetwork,
	pub public_key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_details: Option<AppDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDeployPayload {
	pub contract_name: String,
	pub code_body: String,
	pub network: StacksNetwork,
	pub public_key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_details: Option<AppDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StxTransferPayload {
	pub recipient: String,
	/// Base-10 micro-STX amount.
	pub amount: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub memo: Option<String>,
	pub network: StacksNetwork,
	pub public_key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_details: Option<AppDetails>,
}

/// Build the payload for any request kind.
pub fn build_payload(options: &TransactionOptions, public_key: &str) -> Result<TransactionPayload> {
	Ok(match options {
		TransactionOptions::ContractCall(o) => {
			TransactionPayload::ContractCall(build_contract_call_payload(o, public_key)?)
		}
		TransactionOptions::ContractDeploy(o) => {
			TransactionPayload::ContractDeploy(build_contract_deploy_payload(o, public_key))
		}
		TransactionOptions::StxTransfer(o) => {
			TransactionPayload::StxTransfer(build_stx_transfer_payload(o, public_key))
		}
	})
}

/// Hex arguments pass through untouched; Clarity values are serialized in
/// place, keeping their position.
pub fn build_contract_call_payload(options: &ContractCallOptions, public_key: &str) -> Result<ContractCallPayload> {
	let function_args = options
		.function_args
		.iter()
		.enumerate()
		.map(|(index, arg)| match arg {
			FunctionArg::Hex(s) => Ok(s.clone()),
			FunctionArg::Value(v) => v.to_hex().map_err(|e| ConnectError::ArgumentSerialization {
				index,
				reason: e.to_string(),
			}),
		})
		.collect::<Result<Vec<_>>>()?;

	Ok(ContractCallPayload {
		contract_address: options.contract_address.clone(),
		contract_name: options.contract_name.clone(),
		function_name: options.function_name.clone(),
		function_args,
		network: options.network.clone(),
		public_key: public_key.to_owned(),
		app_details: options.app_details.clone(),
	})
}

pub fn build_contract_deploy_payload(options: &ContractDeployOptions, public_key: &str) -> ContractDeployPayload {
	ContractDeployPayload {
		contract_name: options.contract_name.clone(),
		code_body: options.code_body.clone(),
		network: options.network.clone(),
		public_key: public_key.to_owned(),
		app_details: options.app_details.clone(),
	}
}

pub fn build_stx_transfer_payload(options: &StxTransferOptions, public_key: &str) -> StxTransferPayload {
	StxTransferPayload {
		recipient: options.recipient.clone(),
		amount: options.amount.to_string(),
		memo: options.memo.clone(),
		network: options.network.clone(),
		public_key: public_key.to_owned(),
		app_details: options.app_details.clone(),
	}
}
