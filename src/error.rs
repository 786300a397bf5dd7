use thiserror::Error;

use crate::codec::CodecError;

pub type Result<T> = std::result::Result<T, ConnectError>;

/// Everything that can go wrong between building a request and handing the
/// signed transaction back to the caller.
#[derive(Debug, Error)]
pub enum ConnectError {
	#[error("Stacks wallet not installed")]
	ProviderNotInstalled,

	#[error("session unavailable: {0}")]
	SessionUnavailable(String),

	#[error("function argument #{index} could not be serialized: {reason}")]
	ArgumentSerialization { index: usize, reason: String },

	#[error("signing failed: {0}")]
	Signing(String),

	#[error("malformed wallet response: {0}")]
	MalformedResponse(String),

	#[error("request cancelled before the wallet responded")]
	Cancelled,

	#[error("invalid token: {0}")]
	InvalidToken(String),

	#[error("could not open wallet window: {0}")]
	Window(String),

	#[error("config error: {0}")]
	Config(String),

	#[error(transparent)]
	Codec(#[from] CodecError),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
