pub mod browser;

pub use browser::BrowserOpener;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{ConnectError, Result};
use crate::listener::ListenerState;

pub const DEFAULT_WIDTH: u32 = 440;
pub const DEFAULT_HEIGHT: u32 = 560;

/// Finds the installed wallet's endpoint.  `None` means no wallet.
#[async_trait::async_trait]
pub trait ProviderLocator: Send + Sync {
	async fn provider_url(&self) -> Option<Url>;
}

/// A provider known up front (from config or the environment).
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
	url: Option<Url>,
}

impl StaticProvider {
	pub fn new(url: Option<Url>) -> Self {
		Self { url }
	}
}

#[async_trait::async_trait]
impl ProviderLocator for StaticProvider {
	async fn provider_url(&self) -> Option<Url> {
		self.url.clone()
	}
}

/// Shows a URL to the user in a new top-level window.
pub trait WindowOpener: Send + Sync {
	fn open(&self, url: &Url, features: &WindowFeatures) -> Result<()>;
}

/// The area new windows are centered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
	pub left: i32,
	pub top: i32,
	pub width: u32,
	pub height: u32,
}

impl Default for ScreenGeometry {
	fn default() -> Self {
		Self {
			left: 0,
			top: 0,
			width: 1920,
			height: 1080,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFeatures {
	pub width: u32,
	pub height: u32,
	pub left: i32,
	pub top: i32,
}

impl WindowFeatures {
	/// A `width` x `height` window centered on `screen`.
	pub fn centered(screen: ScreenGeometry, width: u32, height: u32) -> Self {
		let left = center_offset(screen.left, screen.width, width);
		let top = center_offset(screen.top, screen.height, height);
		Self { width, height, left, top }
	}

	/// The `window.open` feature string for these dimensions.
	pub fn to_feature_string(&self) -> String {
		format!(
			"scrollbars=yes, width={}, height={}, top={}, left={}",
			self.width, self.height, self.top, self.left
		)
	}
}

/// Start coordinate that centers `size` within `span`, clamped to `i32`.
fn center_offset(start: i32, span: u32, size: u32) -> i32 {
	let pos = i64::from(start) + (i64::from(span) - i64::from(size)) / 2;
	i32::try_from(pos).unwrap_or(if pos < 0 { i32::MIN } else { i32::MAX })
}

/// `scheme://host[:port]` of `url`.  Works for extension schemes too, which
/// the WHATWG origin algorithm treats as opaque.
pub fn origin_of(url: &Url) -> Result<String> {
	let host = url
		.host_str()
		.ok_or_else(|| ConnectError::Window(format!("provider URL {url} has no host")))?;
	Ok(match url.port() {
		Some(port) => format!("{}://{host}:{port}", url.scheme()),
		None => format!("{}://{host}", url.scheme()),
	})
}

/// `<origin>/index.html#/transaction?request=<token>`.
pub fn request_url(provider: &Url, token: &str) -> Result<Url> {
	let query = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("request", token)
		.finish();
	let raw = format!("{}/index.html#/transaction?{query}", origin_of(provider)?);
	Url::parse(&raw).map_err(|e| ConnectError::Window(format!("bad request URL {raw}: {e}")))
}

/// A message posted from the wallet window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMessage {
	pub origin: String,
	pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
	Message(WindowMessage),
	Closed,
}

/// Sending side of a channel.  Whatever hosts the wallet window posts its
/// messages and its close event here.
#[derive(Debug, Clone)]
pub struct MessagePort {
	tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl MessagePort {
	/// Returns `false` once the receiving listener has finished.
	pub fn post(&self, origin: impl Into<String>, data: Value) -> bool {
		self.post_message(WindowMessage {
			origin: origin.into(),
			data,
		})
	}

	pub fn post_message(&self, message: WindowMessage) -> bool {
		self.tx.send(ChannelEvent::Message(message)).is_ok()
	}

	/// Report that the window was closed.
	pub fn close(&self) -> bool {
		self.tx.send(ChannelEvent::Closed).is_ok()
	}

	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Receiving side of a channel, owned by exactly one listener.
#[derive(Debug)]
pub struct Inbox {
	pub(crate) origin: String,
	pub(crate) rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl Inbox {
	/// A fresh port/inbox pair expecting messages from `origin`.
	pub fn new(origin: impl Into<String>) -> (MessagePort, Self) {
		let (tx, rx) = mpsc::unbounded_channel();
		(
			MessagePort { tx },
			Self {
				origin: origin.into(),
				rx,
			},
		)
	}

	pub fn origin(&self) -> &str {
		&self.origin
	}
}

/// Handle to an opened wallet window.  One per request.
#[derive(Debug)]
pub struct Channel {
	origin: String,
	request_url: Url,
	features: WindowFeatures,
	port: MessagePort,
	listener: Option<JoinHandle<ListenerState>>,
}

impl Channel {
	pub fn origin(&self) -> &str {
		&self.origin
	}

	pub fn request_url(&self) -> &Url {
		&self.request_url
	}

	pub fn features(&self) -> &WindowFeatures {
		&self.features
	}

	pub fn port(&self) -> MessagePort {
		self.port.clone()
	}

	/// Close the window, cancelling the request if it is still waiting.
	pub fn close(&self) {
		self.port.close();
	}

	pub(crate) fn with_listener(mut self, handle: JoinHandle<ListenerState>) -> Self {
		self.listener = Some(handle);
		self
	}

	/// Wait for the request's listener to reach a terminal state.
	pub async fn settled(self) -> ListenerState {
		let Some(handle) = self.listener else {
			return ListenerState::Cancelled;
		};
		match handle.await {
			Ok(state) => state,
			Err(e) => {
				tracing::error!(error = %e, "response listener task failed");
				ListenerState::Cancelled
			}
		}
	}
}

/// Opens the wallet's signing UI for a token.
#[derive(Clone)]
pub struct PopupChannel {
	locator: Arc<dyn ProviderLocator>,
	opener: Arc<dyn WindowOpener>,
	screen: ScreenGeometry,
	width: u32,
	height: u32,
}

impl PopupChannel {
	pub fn new(locator: Arc<dyn ProviderLocator>, opener: Arc<dyn WindowOpener>) -> Self {
		Self {
			locator,
			opener,
			screen: ScreenGeometry::default(),
			width: DEFAULT_WIDTH,
			height: DEFAULT_HEIGHT,
		}
	}

	pub fn with_size(mut self, width: u32, height: u32) -> Self {
		self.width = width;
		self.height = height;
		self
	}

	pub fn with_screen(mut self, screen: ScreenGeometry) -> Self {
		self.screen = screen;
		self
	}

	/// Open a window for `token` and return immediately; the returned inbox
	/// receives whatever the window posts back.
	pub async fn open(&self, token: &str) -> Result<(Channel, Inbox)> {
		let provider = self
			.locator
			.provider_url()
			.await
			.ok_or(ConnectError::ProviderNotInstalled)?;

		let origin = origin_of(&provider)?;
		let url = request_url(&provider, token)?;
		let features = WindowFeatures::centered(self.screen, self.width, self.height);

		let (port, inbox) = Inbox::new(origin.clone());
		self.opener.open(&url, &features)?;
		tracing::info!(%origin, width = features.width, height = features.height, "opened wallet window");

		let channel = Channel {
			origin,
			request_url: url,
			features,
			port,
			listener: None,
		};
		Ok((channel, inbox))
	}
}
