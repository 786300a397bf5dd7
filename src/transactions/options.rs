use serde::{Deserialize, Serialize};

use crate::clarity::ClarityValue;
use crate::error::Result;
use crate::network::StacksNetwork;
use crate::session::UserSession;
use crate::transactions::payload::{self, TransactionPayload};

/// How the requesting app presents itself in the wallet's approval screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
	pub name: String,
	pub icon: String,
}

/// A contract-call argument: either already serialized to hex, or a Clarity
/// value still to be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionArg {
	Hex(String),
	Value(ClarityValue),
}

impl From<ClarityValue> for FunctionArg {
	fn from(v: ClarityValue) -> Self {
		Self::Value(v)
	}
}

impl From<String> for FunctionArg {
	fn from(s: String) -> Self {
		Self::Hex(s)
	}
}

impl From<&str> for FunctionArg {
	fn from(s: &str) -> Self {
		Self::Hex(s.to_owned())
	}
}

#[derive(Debug, Clone)]
pub struct ContractCallOptions {
	pub contract_address: String,
	pub contract_name: String,
	pub function_name: String,
	pub function_args: Vec<FunctionArg>,
	pub network: StacksNetwork,
	pub app_details: Option<AppDetails>,
	pub user_session: Option<UserSession>,
}

impl ContractCallOptions {
	pub fn new(
		contract_address: impl Into<String>,
		contract_name: impl Into<String>,
		function_name: impl Into<String>,
		network: StacksNetwork,
	) -> Self {
		Self {
			contract_address: contract_address.into(),
			contract_name: contract_name.into(),
			function_name: function_name.into(),
			function_args: Vec::new(),
			network,
			app_details: None,
			user_session: None,
		}
	}

	pub fn arg(mut self, arg: impl Into<FunctionArg>) -> Self {
		self.function_args.push(arg.into());
		self
	}

	pub fn app_details(mut self, details: AppDetails) -> Self {
		self.app_details = Some(details);
		self
	}

	pub fn user_session(mut self, session: UserSession) -> Self {
		self.user_session = Some(session);
		self
	}
}

#[derive(Debug, Clone)]
pub struct ContractDeployOptions {
	pub contract_name: String,
	pub code_body: String,
	pub network: StacksNetwork,
	pub app_details: Option<AppDetails>,
	pub user_session: Option<UserSession>,
}

impl ContractDeployOptions {
	pub fn new(contract_name: impl Into<String>, code_body: impl Into<String>, network: StacksNetwork) -> Self {
		Self {
			contract_name: contract_name.into(),
			code_body: code_body.into(),
			network,
			app_details: None,
			user_session: None,
		}
	}

	pub fn app_details(mut self, details: AppDetails) -> Self {
		self.app_details = Some(details);
		self
	}

	pub fn user_session(mut self, session: UserSession) -> Self {
		self.user_session = Some(session);
		self
	}
}

#[derive(Debug, Clone)]
pub struct StxTransferOptions {
	pub recipient: String,
	/// Amount in micro-STX.
	pub amount: u128,
	pub memo: Option<String>,
	pub network: StacksNetwork,
	pub app_details: Option<AppDetails>,
	pub user_session: Option<UserSession>,
}

impl StxTransferOptions {
	pub fn new(recipient: impl Into<String>, amount: u128, network: StacksNetwork) -> Self {
		Self {
			recipient: recipient.into(),
			amount,
			memo: None,
			network,
			app_details: None,
			user_session: None,
		}
	}

	pub fn memo(mut self, memo: impl Into<String>) -> Self {
		self.memo = Some(memo.into());
		self
	}

	pub fn app_details(mut self, details: AppDetails) -> Self {
		self.app_details = Some(details);
		self
	}

	pub fn user_session(mut self, session: UserSession) -> Self {
		self.user_session = Some(session);
		self
	}
}

/// Any of the three request kinds.
#[derive(Debug, Clone)]
pub enum TransactionOptions {
	ContractCall(ContractCallOptions),
	ContractDeploy(ContractDeployOptions),
	StxTransfer(StxTransferOptions),
}

/// The part of a request that differs between transaction kinds.  The rest
/// of the request flow is written once against this trait.
pub trait TxRequest {
	/// Short label for logs.
	fn kind(&self) -> &'static str;

	fn user_session(&self) -> Option<&UserSession>;

	fn build_payload(&self, public_key: &str) -> Result<TransactionPayload>;
}

impl TxRequest for ContractCallOptions {
	fn kind(&self) -> &'static str {
		"contract-call"
	}

	fn user_session(&self) -> Option<&UserSession> {
		self.user_session.as_ref()
	}

	fn build_payload(&self, public_key: &str) -> Result<TransactionPayload> {
		payload::build_contract_call_payload(self, public_key).map(TransactionPayload::ContractCall)
	}
}

impl TxRequest for ContractDeployOptions {
	fn kind(&self) -> &'static str {
		"contract-deploy"
	}

	fn user_session(&self) -> Option<&UserSession> {
		self.user_session.as_ref()
	}

	fn build_payload(&self, public_key: &str) -> Result<TransactionPayload> {
		Ok(TransactionPayload::ContractDeploy(payload::build_contract_deploy_payload(
			self, public_key,
		)))
	}
}

impl TxRequest for StxTransferOptions {
	fn kind(&self) -> &'static str {
		"stx-transfer"
	}

	fn user_session(&self) -> Option<&UserSession> {
		self.user_session.as_ref()
	}

	fn build_payload(&self, public_key: &str) -> Result<TransactionPayload> {
		Ok(TransactionPayload::StxTransfer(payload::build_stx_transfer_payload(
			self, public_key,
		)))
	}
}

impl TxRequest for TransactionOptions {
	fn kind(&self) -> &'static str {
		match self {
			Self::ContractCall(o) => o.kind(),
			Self::ContractDeploy(o) => o.kind(),
			Self::StxTransfer(o) => o.kind(),
		}
	}

	fn user_session(&self) -> Option<&UserSession> {
		match self {
			Self::ContractCall(o) => o.user_session(),
			Self::ContractDeploy(o) => o.user_session(),
			Self::StxTransfer(o) => o.user_session(),
		}
	}

	fn build_payload(&self, public_key: &str) -> Result<TransactionPayload> {
		payload::build_payload(self, public_key)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn function_arg_json_forms() {
		let args: Vec<FunctionArg> =
			serde_json::from_str(r#"["0x0100000000000000000000000000000001", {"type":"bool","value":true}]"#)
				.unwrap();
		assert_eq!(args[0], FunctionArg::Hex("0x0100000000000000000000000000000001".into()));
		assert_eq!(args[1], FunctionArg::Value(ClarityValue::Bool(true)));
	}

	#[test]
	fn builders_fill_optional_fields() {
		let o = StxTransferOptions::new("ST000000000000000000002AMW42H", 5, StacksNetwork::testnet())
			.memo("rent")
			.app_details(AppDetails {
				name: "Demo".into(),
				icon: "https://example.com/icon.png".into(),
			});
		assert_eq!(o.memo.as_deref(), Some("rent"));
		assert!(o.app_details.is_some());
		assert!(o.user_session.is_none());
	}

	#[test]
	fn enum_delegates_kind() {
		let o = TransactionOptions::ContractDeploy(ContractDeployOptions::new(
			"hello",
			"(define-public (hi) (ok true))",
			StacksNetwork::testnet(),
		));
		assert_eq!(o.kind(), "contract-deploy");
	}
}
