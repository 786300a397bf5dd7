use url::Url;

use super::{WindowFeatures, WindowOpener};
use crate::error::{ConnectError, Result};

/// Opens the wallet's signing page in the user's default browser.
///
/// Browsers give no control over placement from outside, so the requested
/// geometry is only logged.  With `launch` off nothing is opened and the
/// caller is expected to show the URL itself.
#[derive(Debug, Clone)]
pub struct BrowserOpener {
	launch: bool,
}

impl BrowserOpener {
	pub fn new() -> Self {
		Self { launch: true }
	}

	/// Do not launch anything; the user opens the URL by hand.
	pub fn manual() -> Self {
		Self { launch: false }
	}
}

impl Default for BrowserOpener {
	fn default() -> Self {
		Self::new()
	}
}

impl WindowOpener for BrowserOpener {
	fn open(&self, url: &Url, features: &WindowFeatures) -> Result<()> {
		tracing::debug!(features = %features.to_feature_string(), "requested window geometry");
		if !self.launch {
			return Ok(());
		}
		opener::open_browser(url.as_str()).map_err(|e| ConnectError::Window(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::popup::ScreenGeometry;

	#[test]
	fn manual_mode_never_launches() {
		let url = Url::parse("https://wallet.example.com/index.html#/transaction?request=x").unwrap();
		let features = WindowFeatures::centered(ScreenGeometry::default(), 440, 560);
		assert!(BrowserOpener::manual().open(&url, &features).is_ok());
	}
}
