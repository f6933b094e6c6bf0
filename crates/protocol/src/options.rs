//! Navigation and capture options shared by the driver and its callers.

use serde::{Deserialize, Serialize};

/// When a navigation is considered complete.
///
/// Maps onto Chromium's main-frame lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
	/// The `load` event fired.
	Load,
	/// The `DOMContentLoaded` event fired.
	#[serde(rename = "domcontentloaded")]
	DomContentLoaded,
	/// No more than two network connections for at least 500 ms.
	#[default]
	#[serde(rename = "networkidle2")]
	NetworkAlmostIdle,
	/// No network connections for at least 500 ms.
	#[serde(rename = "networkidle")]
	NetworkIdle,
}

impl WaitUntil {
	/// Lifecycle event name reported by `Page.lifecycleEvent`.
	pub fn lifecycle_name(self) -> &'static str {
		match self {
			WaitUntil::Load => "load",
			WaitUntil::DomContentLoaded => "DOMContentLoaded",
			WaitUntil::NetworkAlmostIdle => "networkAlmostIdle",
			WaitUntil::NetworkIdle => "networkIdle",
		}
	}
}

/// Screenshot capture options.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotOptions {
	/// Capture the full scrollable page instead of just the viewport.
	pub full_page: bool,
}
