//! Best-effort diagnostic screenshots.

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::DriverError;
use crate::config::KomodoConfig;
use crate::driver::PageDriver;
use crate::events::EventEmitter;

/// Why a screenshot was taken; becomes the file-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
	Error,
	NoNumber,
	Timeout,
}

impl CaptureKind {
	pub fn prefix(self) -> &'static str {
		match self {
			CaptureKind::Error => "error",
			CaptureKind::NoNumber => "no_number",
			CaptureKind::Timeout => "timeout",
		}
	}
}

impl fmt::Display for CaptureKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.prefix())
	}
}

/// `<capture_dir>/<kind>_<country>.png`, with path separators in the
/// country label replaced.
pub fn capture_path(config: &KomodoConfig, kind: CaptureKind, country: &str) -> PathBuf {
	let country: String = country
		.chars()
		.map(|c| if matches!(c, '/' | '\\' | ':') || c.is_control() { '_' } else { c })
		.collect();
	config.capture_dir.join(format!("{}_{}.png", kind.prefix(), country))
}

/// Waits the screenshot settle delay and captures the full page, giving
/// up after `timings.capture`.
///
/// Never fails: errors are reported as a `screenshot-failed` log event.
pub(crate) async fn capture(page: &dyn PageDriver, config: &KomodoConfig, events: &EventEmitter, kind: CaptureKind, country: &str) -> Option<PathBuf> {
	let path = capture_path(config, kind, country);
	let result = async {
		tokio::fs::create_dir_all(&config.capture_dir).await?;
		tokio::time::sleep(config.timings.screenshot_settle()).await;
		let limit = config.timings.capture();
		tokio::time::timeout(limit, page.screenshot(&path, true))
			.await
			.map_err(|_| DriverError::Timeout(format!("screenshot exceeded {}ms", limit.as_millis())))??;
		Ok::<_, crate::Error>(())
	}
	.await;

	match result {
		Ok(()) => {
			events.log(format!("screenshot:{}", path.display()));
			Some(path)
		}
		Err(e) => {
			warn!(target = "komodo.capture", path = %path.display(), error = %e, "screenshot failed");
			events.log("screenshot-failed");
			None
		}
	}
}
