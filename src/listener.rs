//! Waits for the wallet's single completion message on a channel.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::error::{ConnectError, Result};
use crate::popup::{ChannelEvent, Inbox};
use crate::stacks_tx::{self, StacksTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
	Waiting,
	Delivered,
	Cancelled,
}

impl ListenerState {
	pub fn is_terminal(self) -> bool {
		self != Self::Waiting
	}
}

/// What the wallet posts back once the user approves.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedTxPayload {
	pub tx_raw: String,
	/// Everything else the wallet sent, `txId` included.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// The wallet's response with the transaction decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedTx {
	pub tx_raw: String,
	pub tx_id: String,
	pub stacks_transaction: StacksTransaction,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl FinishedTx {
	/// Decode `txRaw` and merge the transaction into the response.
	pub fn from_payload(payload: FinishedTxPayload) -> Result<Self> {
		let clean = payload.tx_raw.strip_prefix("0x").unwrap_or(&payload.tx_raw);
		let bytes =
			hex::decode(clean).map_err(|e| ConnectError::MalformedResponse(format!("txRaw is not hex: {e}")))?;
		let stacks_transaction = StacksTransaction::from_bytes(&bytes)
			.map_err(|e| ConnectError::MalformedResponse(format!("txRaw is not a transaction: {e}")))?;

		// Fields the response carries itself replace whatever the wallet sent.
		let mut extra = payload.extra;
		let tx_id = match extra.remove("txId") {
			Some(Value::String(id)) => id,
			_ => stacks_tx::txid(&bytes),
		};
		extra.remove("txRaw");
		extra.remove("stacksTransaction");

		Ok(Self {
			tx_id,
			tx_raw: payload.tx_raw,
			stacks_transaction,
			extra,
		})
	}

	/// Parse a raw message body.
	pub fn from_message(data: Value) -> Result<Self> {
		let payload: FinishedTxPayload = serde_json::from_value(data)
			.map_err(|e| ConnectError::MalformedResponse(format!("unexpected message shape: {e}")))?;
		Self::from_payload(payload)
	}
}

pub type FinishCallback = Box<dyn FnOnce(FinishedTx) + Send + 'static>;
pub type CancelCallback = Box<dyn FnOnce() + Send + 'static>;

/// Caller hooks for one request.  Each fires at most once, and never both.
#[derive(Default)]
pub struct Callbacks {
	on_finish: Option<FinishCallback>,
	on_cancel: Option<CancelCallback>,
}

impl Callbacks {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_finish(mut self, f: impl FnOnce(FinishedTx) + Send + 'static) -> Self {
		self.on_finish = Some(Box::new(f));
		self
	}

	pub fn on_cancel(mut self, f: impl FnOnce() + Send + 'static) -> Self {
		self.on_cancel = Some(Box::new(f));
		self
	}
}

impl fmt::Debug for Callbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callbacks")
			.field("on_finish", &self.on_finish.is_some())
			.field("on_cancel", &self.on_cancel.is_some())
			.finish()
	}
}

/// Per-request state machine: `Waiting` until either a valid response from
/// the channel's origin (`Delivered`) or the channel closing (`Cancelled`).
pub struct ResponseListener {
	inbox: Inbox,
	callbacks: Callbacks,
	state: ListenerState,
	timeout: Option<Duration>,
}

impl ResponseListener {
	pub fn new(inbox: Inbox, callbacks: Callbacks) -> Self {
		Self {
			inbox,
			callbacks,
			state: ListenerState::Waiting,
			timeout: None,
		}
	}

	/// Give up after `timeout`.  `None` waits forever.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn state(&self) -> ListenerState {
		self.state
	}

	/// Apply one channel event and return the resulting state.
	pub fn handle(&mut self, event: ChannelEvent) -> ListenerState {
		if self.state.is_terminal() {
			tracing::debug!(state = ?self.state, "ignoring event after listener finished");
			return self.state;
		}

		match event {
			ChannelEvent::Closed => self.cancel("window closed"),
			ChannelEvent::Message(msg) if msg.origin != self.inbox.origin => {
				tracing::debug!(origin = %msg.origin, expected = %self.inbox.origin, "ignoring message from foreign origin");
			}
			ChannelEvent::Message(msg) => match FinishedTx::from_message(msg.data) {
				Ok(tx) => self.deliver(tx),
				Err(e) => tracing::warn!(error = %e, "ignoring wallet message"),
			},
		}
		self.state
	}

	/// Drive the listener until it reaches a terminal state.
	pub async fn run(mut self) -> ListenerState {
		let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);

		while !self.state.is_terminal() {
			let next = match deadline {
				Some(at) => {
					let received = tokio::time::timeout_at(at, self.inbox.rx.recv()).await;
					match received {
						Ok(event) => event,
						Err(_) => {
							self.cancel("timed out waiting for the wallet");
							break;
						}
					}
				}
				None => self.inbox.rx.recv().await,
			};

			match next {
				Some(event) => {
					self.handle(event);
				}
				None => self.cancel("channel dropped"),
			}
		}
		self.state
	}

	pub fn spawn(self) -> JoinHandle<ListenerState> {
		tokio::spawn(self.run())
	}

	fn deliver(&mut self, tx: FinishedTx) {
		self.state = ListenerState::Delivered;
		tracing::info!(tx_id = %tx.tx_id, "wallet returned signed transaction");
		self.callbacks.on_cancel = None;
		if let Some(on_finish) = self.callbacks.on_finish.take() {
			on_finish(tx);
		}
		self.inbox.rx.close();
	}

	fn cancel(&mut self, reason: &str) {
		self.state = ListenerState::Cancelled;
		tracing::info!(reason, "wallet request cancelled");
		self.callbacks.on_finish = None;
		if let Some(on_cancel) = self.callbacks.on_cancel.take() {
			on_cancel();
		}
		self.inbox.rx.close();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{Arc, Mutex};

	use serde_json::json;

	use super::*;
	use crate::stacks_tx::fixtures;

	const ORIGIN: &str = "https://wallet.example.com";

	fn recording() -> (Callbacks, Arc<Mutex<Vec<FinishedTx>>>, Arc<Mutex<u32>>) {
		let finished = Arc::new(Mutex::new(Vec::new()));
		let cancelled = Arc::new(Mutex::new(0));
		let (f, c) = (finished.clone(), cancelled.clone());
		let callbacks = Callbacks::new()
			.on_finish(move |tx| f.lock().unwrap().push(tx))
			.on_cancel(move || *c.lock().unwrap() += 1);
		(callbacks, finished, cancelled)
	}

	fn valid_message() -> Value {
		json!({ "txRaw": format!("0x{}", hex::encode(fixtures::token_transfer())) })
	}

	#[test]
	fn delivers_once_for_two_valid_messages() {
		let (port, inbox) = Inbox::new(ORIGIN);
		let (callbacks, finished, cancelled) = recording();
		let mut listener = ResponseListener::new(inbox, callbacks);

		assert_eq!(
			listener.handle(ChannelEvent::Message(crate::popup::WindowMessage {
				origin: ORIGIN.into(),
				data: valid_message(),
			})),
			ListenerState::Delivered
		);
		assert_eq!(
			listener.handle(ChannelEvent::Message(crate::popup::WindowMessage {
				origin: ORIGIN.into(),
				data: valid_message(),
			})),
			ListenerState::Delivered
		);
		assert_eq!(finished.lock().unwrap().len(), 1);
		assert_eq!(*cancelled.lock().unwrap(), 0);
		assert!(port.is_closed());
	}

	#[test]
	fn foreign_origin_never_delivers() {
		let (_port, inbox) = Inbox::new(ORIGIN);
		let (callbacks, finished, _) = recording();
		let mut listener = ResponseListener::new(inbox, callbacks);

		let state = listener.handle(ChannelEvent::Message(crate::popup::WindowMessage {
			origin: "https://evil.example.com".into(),
			data: valid_message(),
		}));
		assert_eq!(state, ListenerState::Waiting);
		assert!(finished.lock().unwrap().is_empty());
	}

	#[test]
	fn malformed_messages_keep_waiting() {
		let (_port, inbox) = Inbox::new(ORIGIN);
		let (callbacks, finished, _) = recording();
		let mut listener = ResponseListener::new(inbox, callbacks);

		for data in [
			json!("just a string"),
			json!({ "somethingElse": true }),
			json!({ "txRaw": 42 }),
			json!({ "txRaw": "0xnothex" }),
			json!({ "txRaw": "0x0000" }),
		] {
			let state = listener.handle(ChannelEvent::Message(crate::popup::WindowMessage {
				origin: ORIGIN.into(),
				data,
			}));
			assert_eq!(state, ListenerState::Waiting);
		}
		assert!(finished.lock().unwrap().is_empty());

		assert_eq!(
			listener.handle(ChannelEvent::Message(crate::popup::WindowMessage {
				origin: ORIGIN.into(),
				data: valid_message(),
			})),
			ListenerState::Delivered
		);
	}

	#[test]
	fn close_before_response_cancels() {
		let (_port, inbox) = Inbox::new(ORIGIN);
		let (callbacks, finished, cancelled) = recording();
		let mut listener = ResponseListener::new(inbox, callbacks);

		assert_eq!(listener.handle(ChannelEvent::Closed), ListenerState::Cancelled);
		assert_eq!(
			listener.handle(ChannelEvent::Message(crate::popup::WindowMessage {
				origin: ORIGIN.into(),
				data: valid_message(),
			})),
			ListenerState::Cancelled
		);
		assert!(finished.lock().unwrap().is_empty());
		assert_eq!(*cancelled.lock().unwrap(), 1);
	}

	#[test]
	fn response_is_enriched() {
		let mut data = valid_message();
		data["walletVersion"] = json!("6.0.0");
		let tx = FinishedTx::from_message(data).unwrap();

		assert!(tx.tx_id.starts_with("0x"));
		assert_eq!(tx.extra["walletVersion"], "6.0.0");

		let json = serde_json::to_value(&tx).unwrap();
		assert!(json.get("stacksTransaction").is_some());
		assert_eq!(json["walletVersion"], "6.0.0");
		assert_eq!(json["txRaw"], tx.tx_raw.as_str());
	}

	#[test]
	fn wallet_supplied_txid_is_kept() {
		let mut data = valid_message();
		data["txId"] = json!("0xabc");
		assert_eq!(FinishedTx::from_message(data).unwrap().tx_id, "0xabc");
	}

	#[test]
	fn decoded_transaction_replaces_wallet_field() {
		let mut data = valid_message();
		data["stacksTransaction"] = json!("not the decoded one");
		let tx = FinishedTx::from_message(data).unwrap();
		assert!(!tx.extra.contains_key("stacksTransaction"));

		let out = serde_json::to_string(&tx).unwrap();
		assert_eq!(out.matches("\"stacksTransaction\"").count(), 1);
		let json: Value = serde_json::from_str(&out).unwrap();
		assert_eq!(json["stacksTransaction"]["chainId"], 0x8000_0000u32);
	}

	#[test]
	fn non_string_txid_is_recomputed() {
		let mut data = valid_message();
		data["txId"] = json!(5);
		let tx = FinishedTx::from_message(data).unwrap();
		assert_eq!(tx.tx_id, stacks_tx::txid(&fixtures::token_transfer()));
		assert!(!tx.extra.contains_key("txId"));

		let out = serde_json::to_string(&tx).unwrap();
		assert_eq!(out.matches("\"txId\"").count(), 1);
	}

	#[tokio::test]
	async fn run_ends_when_ports_are_dropped() {
		let (port, inbox) = Inbox::new(ORIGIN);
		let (callbacks, _, cancelled) = recording();
		let handle = ResponseListener::new(inbox, callbacks).spawn();
		drop(port);
		assert_eq!(handle.await.unwrap(), ListenerState::Cancelled);
		assert_eq!(*cancelled.lock().unwrap(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn optional_timeout_cancels() {
		let (_port, inbox) = Inbox::new(ORIGIN);
		let (callbacks, finished, cancelled) = recording();
		let state = ResponseListener::new(inbox, callbacks)
			.with_timeout(Some(Duration::from_secs(30)))
			.run()
			.await;
		assert_eq!(state, ListenerState::Cancelled);
		assert!(finished.lock().unwrap().is_empty());
		assert_eq!(*cancelled.lock().unwrap(), 1);
	}

	#[tokio::test]
	async fn run_delivers_posted_message() {
		let (port, inbox) = Inbox::new(ORIGIN);
		let (callbacks, finished, _) = recording();
		let handle = ResponseListener::new(inbox, callbacks).spawn();

		assert!(port.post("https://evil.example.com", valid_message()));
		assert!(port.post(ORIGIN, valid_message()));
		assert_eq!(handle.await.unwrap(), ListenerState::Delivered);
		assert_eq!(finished.lock().unwrap().len(), 1);
		assert!(!port.post(ORIGIN, valid_message()));
	}
}
