//! Controller configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration. Durations are stored in milliseconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_ORIGIN: &str = "https://app.smsvirtual.org";

/// Top-level configuration for [`Komodo`](crate::Komodo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KomodoConfig {
	/// Service origin navigated to on restore and before every activation.
	pub origin: String,
	/// Stored session (`cookies` + `localStorage`) restored by `init`.
	pub session_path: PathBuf,
	/// Directory receiving diagnostic screenshots.
	pub capture_dir: PathBuf,
	pub headless: bool,
	/// Label of the messaging-channel entry point.
	pub channel_label: String,
	/// Label of the activation button.
	pub activate_label: String,
	pub launch: LaunchConfig,
	pub timings: Timings,
}

impl Default for KomodoConfig {
	fn default() -> Self {
		Self {
			origin: DEFAULT_ORIGIN.to_string(),
			session_path: PathBuf::from("session.json"),
			capture_dir: PathBuf::from("capturas"),
			headless: true,
			channel_label: "Whatsapp".to_string(),
			activate_label: "Activate".to_string(),
			launch: LaunchConfig::default(),
			timings: Timings::default(),
		}
	}
}

/// Browser launch or attach settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchConfig {
	/// Browser executable; discovered on `PATH` when unset.
	pub executable: Option<PathBuf>,
	pub args: Vec<String>,
	/// Remote-debugging port; `0` picks a free port.
	pub port: u16,
	pub user_data_dir: Option<PathBuf>,
	/// Attach to this `ws://` endpoint instead of launching.
	pub cdp_endpoint: Option<String>,
}

/// Bounded waits and settle delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
	pub navigation_ms: u64,
	pub selector_ms: u64,
	pub country_settle_ms: u64,
	pub activate_settle_ms: u64,
	pub error_signal_ms: u64,
	pub number_signal_ms: u64,
	pub number_settle_ms: u64,
	pub poll_interval_ms: u64,
	pub screenshot_settle_ms: u64,
	/// Upper bound on a single diagnostic screenshot.
	pub capture_ms: u64,
}

impl Default for Timings {
	fn default() -> Self {
		Self {
			navigation_ms: 30_000,
			selector_ms: 7_000,
			country_settle_ms: 1_000,
			activate_settle_ms: 1_200,
			error_signal_ms: 6_000,
			number_signal_ms: 9_000,
			number_settle_ms: 800,
			poll_interval_ms: 2_000,
			screenshot_settle_ms: 1_500,
			capture_ms: 10_000,
		}
	}
}

impl Timings {
	pub fn navigation(&self) -> Duration {
		Duration::from_millis(self.navigation_ms)
	}

	pub fn selector(&self) -> Duration {
		Duration::from_millis(self.selector_ms)
	}

	pub fn country_settle(&self) -> Duration {
		Duration::from_millis(self.country_settle_ms)
	}

	pub fn activate_settle(&self) -> Duration {
		Duration::from_millis(self.activate_settle_ms)
	}

	pub fn error_signal(&self) -> Duration {
		Duration::from_millis(self.error_signal_ms)
	}

	pub fn number_signal(&self) -> Duration {
		Duration::from_millis(self.number_signal_ms)
	}

	pub fn number_settle(&self) -> Duration {
		Duration::from_millis(self.number_settle_ms)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn screenshot_settle(&self) -> Duration {
		Duration::from_millis(self.screenshot_settle_ms)
	}

	pub fn capture(&self) -> Duration {
		Duration::from_millis(self.capture_ms)
	}
}

impl KomodoConfig {
	/// Reads configuration from `path`; a missing file yields defaults.
	pub fn load(path: &Path) -> Result<Self> {
		let content = match std::fs::read_to_string(path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "komodo.config", path = %path.display(), "config file not found; using defaults");
				return Ok(Self::default());
			}
			Err(e) => return Err(e.into()),
		};
		let config: Self = serde_json::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		let origin = url::Url::parse(&self.origin).map_err(|e| Error::Config(format!("origin {:?}: {}", self.origin, e)))?;
		if !matches!(origin.scheme(), "http" | "https") {
			return Err(Error::Config(format!("origin must be http(s), got {}", origin.scheme())));
		}
		if self.channel_label.trim().is_empty() || self.activate_label.trim().is_empty() {
			return Err(Error::Config("channel and activate labels must not be empty".into()));
		}
		Ok(())
	}

	pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
		self.origin = origin.into();
		self
	}

	pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.session_path = path.into();
		self
	}

	pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.capture_dir = dir.into();
		self
	}

	pub fn with_headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}

	pub fn with_cdp_endpoint(mut self, endpoint: Option<String>) -> Self {
		self.launch.cdp_endpoint = endpoint;
		self
	}

	pub fn with_timings(mut self, timings: Timings) -> Self {
		self.timings = timings;
		self
	}
}
