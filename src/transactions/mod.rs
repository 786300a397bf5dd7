//! Caller-facing transaction options and the payloads signed from them.

pub mod options;
pub mod payload;

pub use options::{
	AppDetails, ContractCallOptions, ContractDeployOptions, FunctionArg, StxTransferOptions,
	TransactionOptions, TxRequest,
};
pub use payload::{
	build_contract_call_payload, build_contract_deploy_payload, build_payload, build_stx_transfer_payload,
	ContractCallPayload, ContractDeployPayload, StxTransferPayload, TransactionPayload,
};
