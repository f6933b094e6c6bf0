//! Error types for the activation core.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures. Business outcomes (no numbers, extraction failure,
/// timeout) are [`ActivationResult`](crate::ActivationResult) values, not errors.
#[derive(Debug, Error)]
pub enum Error {
	#[error("controller not initialized; call init() first")]
	NotRunning,

	#[error("interrupted by stop()")]
	Stopped,

	#[error("country index {index} out of range (catalog has {len} entries)")]
	UnknownCountry { index: usize, len: usize },

	#[error("country name must not be empty")]
	InvalidCountry,

	#[error("browser launch failed: {0}")]
	BrowserLaunch(String),

	#[error("navigation to {url} failed: {source}")]
	Navigation {
		url: String,
		#[source]
		source: komodo_runtime::Error,
	},

	#[error("selector {selector} did not appear within {ms}ms")]
	SelectorTimeout { selector: String, ms: u64 },

	#[error("session file {path}: {message}")]
	Session { path: PathBuf, message: String },

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Driver(#[from] komodo_runtime::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns `true` when the page or browser was already torn down.
	pub fn is_disposed(&self) -> bool {
		match self {
			Error::Driver(e) | Error::Navigation { source: e, .. } => e.is_disposed(),
			_ => false,
		}
	}
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
