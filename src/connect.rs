use std::time::Duration;

use crate::error::Result;
use crate::listener::{Callbacks, ResponseListener};
use crate::popup::{Channel, PopupChannel};
use crate::session::KeyResolver;
use crate::token::TokenSigner;
use crate::transactions::{ContractCallOptions, ContractDeployOptions, StxTransferOptions, TxRequest};

/// Entry point for asking the wallet to sign a transaction.
///
/// Each `open_*` call resolves the app key, builds and signs the request
/// token, opens the wallet window and arms a listener for its answer.  It
/// returns as soon as the window is open; the answer arrives through the
/// supplied [`Callbacks`].
#[derive(Clone)]
pub struct Connect {
	keys: KeyResolver,
	popup: PopupChannel,
	timeout: Option<Duration>,
}

impl Connect {
	pub fn new(keys: KeyResolver, popup: PopupChannel) -> Self {
		Self {
			keys,
			popup,
			timeout: None,
		}
	}

	/// Cancel requests the wallet has not answered within `timeout`.  Off by
	/// default: a request otherwise waits until its window closes.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	pub async fn open_contract_call(&self, options: ContractCallOptions, callbacks: Callbacks) -> Result<Channel> {
		self.open_request(&options, callbacks).await
	}

	pub async fn open_contract_deploy(&self, options: ContractDeployOptions, callbacks: Callbacks) -> Result<Channel> {
		self.open_request(&options, callbacks).await
	}

	pub async fn open_stx_transfer(&self, options: StxTransferOptions, callbacks: Callbacks) -> Result<Channel> {
		self.open_request(&options, callbacks).await
	}

	pub async fn make_contract_call_token(&self, options: &ContractCallOptions) -> Result<String> {
		self.make_token(options).await
	}

	pub async fn make_contract_deploy_token(&self, options: &ContractDeployOptions) -> Result<String> {
		self.make_token(options).await
	}

	pub async fn make_stx_transfer_token(&self, options: &StxTransferOptions) -> Result<String> {
		self.make_token(options).await
	}

	/// Resolve keys, build the payload and sign it.
	pub async fn make_token<T: TxRequest>(&self, options: &T) -> Result<String> {
		let keys = self.keys.resolve(options.user_session()).await?;
		let payload = options.build_payload(keys.public_key())?;
		let token = TokenSigner::new(keys.private_key())?.sign(&payload).await?;
		tracing::debug!(kind = options.kind(), tx_type = payload.tx_type(), "signed request token");
		Ok(token)
	}

	/// Sign, open the window, then arm the listener.  Every failure here
	/// happens before the window is shown.
	pub async fn open_request<T: TxRequest>(&self, options: &T, callbacks: Callbacks) -> Result<Channel> {
		let token = self.make_token(options).await?;
		let (channel, inbox) = self.popup.open(&token).await?;
		let listener = ResponseListener::new(inbox, callbacks).with_timeout(self.timeout).spawn();
		tracing::info!(kind = options.kind(), origin = channel.origin(), "waiting for wallet approval");
		Ok(channel.with_listener(listener))
	}
}
