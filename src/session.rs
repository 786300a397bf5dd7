use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::crypto;
use crate::error::{ConnectError, Result};

/// Permission an app session asks the wallet for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
	StoreWrite,
	PublishData,
	Email,
}

/// Identity of the requesting app: the scopes it holds and the origin it
/// runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
	pub scopes: Vec<Scope>,
	pub app_domain: String,
}

impl AppConfig {
	pub fn new(scopes: Vec<Scope>, app_domain: &Url) -> Self {
		Self {
			scopes,
			app_domain: app_domain.origin().ascii_serialization(),
		}
	}

	/// The smallest useful config: write-only storage rooted at `app_domain`.
	pub fn store_write(app_domain: &Url) -> Self {
		Self::new(vec![Scope::StoreWrite], app_domain)
	}
}

/// What a signed-in session knows about the user.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
	pub app_private_key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identity_address: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl UserData {
	pub fn new(app_private_key: impl Into<String>) -> Self {
		Self {
			app_private_key: app_private_key.into(),
			identity_address: None,
			created_at: Utc::now(),
		}
	}
}

impl fmt::Debug for UserData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UserData")
			.field("identity_address", &self.identity_address)
			.field("created_at", &self.created_at)
			.finish_non_exhaustive()
	}
}

/// Backing storage for session user data, keyed by app origin.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
	async fn load(&self, app_domain: &str) -> Result<Option<UserData>>;

	async fn save(&self, app_domain: &str, data: UserData) -> Result<()>;
}

/// Sessions kept in process memory.
#[derive(Default)]
pub struct MemorySessionStore {
	sessions: Mutex<HashMap<String, UserData>>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session(app_domain: &Url, data: UserData) -> Self {
		let store = Self::new();
		if let Ok(mut sessions) = store.sessions.lock() {
			sessions.insert(app_domain.origin().ascii_serialization(), data);
		}
		store
	}
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
	async fn load(&self, app_domain: &str) -> Result<Option<UserData>> {
		let sessions = self
			.sessions
			.lock()
			.map_err(|_| ConnectError::SessionUnavailable("session store poisoned".into()))?;
		Ok(sessions.get(app_domain).cloned())
	}

	async fn save(&self, app_domain: &str, data: UserData) -> Result<()> {
		let mut sessions = self
			.sessions
			.lock()
			.map_err(|_| ConnectError::SessionUnavailable("session store poisoned".into()))?;
		sessions.insert(app_domain.to_owned(), data);
		Ok(())
	}
}

/// Sessions persisted as a JSON map in a single file.
pub struct FileSessionStore {
	path: PathBuf,
}

impl FileSessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &std::path::Path {
		&self.path
	}

	async fn read_all(&self) -> Result<HashMap<String, UserData>> {
		match tokio::fs::read_to_string(&self.path).await {
			Ok(content) => serde_json::from_str(&content).map_err(|e| {
				ConnectError::SessionUnavailable(format!("corrupt session file {}: {e}", self.path.display()))
			}),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
			Err(e) => Err(e.into()),
		}
	}
}

#[async_trait::async_trait]
impl SessionStore for FileSessionStore {
	async fn load(&self, app_domain: &str) -> Result<Option<UserData>> {
		Ok(self.read_all().await?.remove(app_domain))
	}

	async fn save(&self, app_domain: &str, data: UserData) -> Result<()> {
		let mut all = self.read_all().await?;
		all.insert(app_domain.to_owned(), data);
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(&self.path, serde_json::to_string_pretty(&all)?).await?;
		Ok(())
	}
}

/// An app's session with the wallet.  Always passed explicitly; there is
/// no process-wide default.
#[derive(Clone)]
pub struct UserSession {
	app_config: AppConfig,
	store: Arc<dyn SessionStore>,
}

impl UserSession {
	pub fn new(app_config: AppConfig, store: Arc<dyn SessionStore>) -> Self {
		Self { app_config, store }
	}

	pub fn app_config(&self) -> &AppConfig {
		&self.app_config
	}

	/// Load the signed-in user's data, failing if nobody is signed in.
	pub async fn load_user_data(&self) -> Result<UserData> {
		self.store
			.load(&self.app_config.app_domain)
			.await?
			.ok_or_else(|| {
				ConnectError::SessionUnavailable(format!("no user signed in for {}", self.app_config.app_domain))
			})
	}

	pub async fn sign_in(&self, data: UserData) -> Result<()> {
		self.store.save(&self.app_config.app_domain, data).await
	}
}

impl fmt::Debug for UserSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UserSession")
			.field("app_config", &self.app_config)
			.finish_non_exhaustive()
	}
}

/// The app key pair a request is signed with.
#[derive(Clone)]
pub struct KeyPair {
	private_key: String,
	public_key: String,
}

impl KeyPair {
	pub fn private_key(&self) -> &str {
		&self.private_key
	}

	/// Compressed secp256k1 public key, hex.
	pub fn public_key(&self) -> &str {
		&self.public_key
	}
}

impl fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyPair")
			.field("public_key", &self.public_key)
			.finish_non_exhaustive()
	}
}

/// Resolves the signing key pair for a request, falling back to a minimal
/// store-write session for its own app domain when the caller supplies none.
#[derive(Clone)]
pub struct KeyResolver {
	app_domain: Url,
	store: Arc<dyn SessionStore>,
}

impl KeyResolver {
	pub fn new(app_domain: Url, store: Arc<dyn SessionStore>) -> Self {
		Self { app_domain, store }
	}

	pub fn app_domain(&self) -> &Url {
		&self.app_domain
	}

	/// A fresh session scoped to write-only storage at the app's origin.
	pub fn default_session(&self) -> UserSession {
		UserSession::new(AppConfig::store_write(&self.app_domain), self.store.clone())
	}

	pub async fn resolve(&self, session: Option<&UserSession>) -> Result<KeyPair> {
		let fallback;
		let session = match session {
			Some(s) => s,
			None => {
				tracing::debug!(app_domain = %self.app_domain, "no session supplied, using default");
				fallback = self.default_session();
				&fallback
			}
		};

		let data = session.load_user_data().await?;
		let public_key = crypto::derive_public_key(&data.app_private_key)?;
		Ok(KeyPair {
			private_key: data.app_private_key,
			public_key,
		})
	}
}
