//! Browser process launch with remote debugging enabled.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::probe::{CdpVersionInfo, fetch_version_info};

const PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Fully resolved launch request.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
	pub executable: PathBuf,
	pub port: u16,
	pub user_data_dir: PathBuf,
	pub headless: bool,
	pub extra_args: Vec<String>,
	pub probe_attempts: u32,
}

impl LaunchPlan {
	pub fn args(&self) -> Vec<String> {
		let mut args = vec![
			format!("--remote-debugging-port={}", self.port),
			format!("--user-data-dir={}", self.user_data_dir.display()),
			"--no-first-run".to_string(),
			"--no-default-browser-check".to_string(),
			"--no-sandbox".to_string(),
			"--disable-setuid-sandbox".to_string(),
		];
		if self.headless {
			args.push("--headless=new".to_string());
		}
		args.extend(self.extra_args.iter().cloned());
		args.push("about:blank".to_string());
		args
	}
}

/// Spawns the browser and waits for its debugging endpoint.
///
/// The child is killed when the endpoint never appears.
pub async fn launch_chrome(plan: &LaunchPlan) -> Result<(Child, CdpVersionInfo)> {
	let mut cmd = Command::new(&plan.executable);
	cmd.args(plan.args()).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

	#[cfg(unix)]
	std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

	let mut child = cmd
		.spawn()
		.map_err(|e| Error::BrowserLaunch(format!("failed to spawn {}: {}", plan.executable.display(), e)))?;
	debug!(target = "komodo.launch", pid = child.id(), port = plan.port, "browser spawned");

	let mut last_error = "endpoint not reachable".to_string();
	for _ in 0..plan.probe_attempts {
		tokio::time::sleep(PROBE_INTERVAL).await;

		if let Ok(Some(status)) = child.try_wait() {
			return Err(Error::BrowserLaunch(format!(
				"browser exited before its debugging endpoint became available (status: {status})"
			)));
		}

		match fetch_version_info(plan.port).await {
			Ok(info) => return Ok((child, info)),
			Err(e) => last_error = e.to_string(),
		}
	}

	let _ = child.kill();
	let _ = child.wait();
	Err(Error::BrowserLaunch(format!(
		"debugging endpoint not available on port {} after {} attempts: {}",
		plan.port, plan.probe_attempts, last_error
	)))
}

/// Per-launch profile directory under the system temp dir.
pub fn scratch_profile_dir(port: u16) -> PathBuf {
	std::env::temp_dir().join(format!("komodo-profile-{}-{}", std::process::id(), port))
}

/// Removes a scratch profile, ignoring failures.
pub fn remove_profile_dir(dir: &Path) {
	if let Err(e) = std::fs::remove_dir_all(dir) {
		debug!(target = "komodo.launch", path = %dir.display(), error = %e, "profile cleanup skipped");
	}
}
