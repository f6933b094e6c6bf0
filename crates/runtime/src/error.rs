//! Error types for the DevTools driver.

use thiserror::Error;

/// Errors raised while launching, connecting to, or driving Chromium.
#[derive(Debug, Error)]
pub enum Error {
	/// The browser rejected a command or sent something unparsable.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// A bounded operation did not complete in time.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// The page, session, or browser went away mid-command.
	#[error("Target closed: {0}")]
	TargetClosed(String),

	/// The connection loop ended before a response arrived.
	#[error("Connection closed")]
	ChannelClosed,

	/// Script evaluation threw inside the page.
	#[error("Evaluation failed: {0}")]
	Evaluation(String),

	/// No element matched a selector that had to be present.
	#[error("Element not found: {0}")]
	ElementNotFound(String),

	/// The browser process could not be started or never exposed its endpoint.
	#[error("Browser launch failed: {0}")]
	BrowserLaunch(String),

	/// WebSocket level failure.
	#[error("Transport error: {0}")]
	Transport(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns `true` when the target can no longer accept commands.
	pub fn is_disposed(&self) -> bool {
		matches!(self, Error::TargetClosed(_) | Error::ChannelClosed)
	}
}

/// Result alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;
