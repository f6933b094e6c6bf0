//! Browser handle: launch or attach, open pages, shut down.

use std::path::PathBuf;
use std::process::Child;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::connection::{Connection, spawn_loop};
use crate::error::{Error, Result};
use crate::finder::find_chrome_executable;
use crate::launcher::{LaunchPlan, launch_chrome, remove_profile_dir, scratch_profile_dir};
use crate::page::Page;
use crate::process::free_port;
use crate::transport::WebSocketTransport;

/// Options for [`Browser::launch`].
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	pub executable: Option<PathBuf>,
	pub headless: bool,
	/// Remote-debugging port; `0` picks a free one.
	pub port: u16,
	/// Profile directory; a scratch directory is used (and removed) when unset.
	pub user_data_dir: Option<PathBuf>,
	pub args: Vec<String>,
	pub launch_timeout: Duration,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			port: 0,
			user_data_dir: None,
			args: Vec::new(),
			launch_timeout: Duration::from_secs(15),
		}
	}
}

impl LaunchOptions {
	pub fn headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}

	pub fn executable(mut self, executable: impl Into<PathBuf>) -> Self {
		self.executable = Some(executable.into());
		self
	}

	pub fn port(mut self, port: u16) -> Self {
		self.port = port;
		self
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}
}

struct OwnedProcess {
	child: Child,
	scratch_profile: Option<PathBuf>,
}

/// A connected Chromium instance.
///
/// A browser started with [`Browser::launch`] owns its process and kills it
/// on [`close`](Browser::close). One attached with [`Browser::connect`] is
/// only disconnected.
pub struct Browser {
	connection: Arc<Connection>,
	ws_endpoint: String,
	version: Option<String>,
	process: Mutex<Option<OwnedProcess>>,
	loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Browser {
	/// Spawns a local browser with remote debugging and connects to it.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let executable = find_chrome_executable(options.executable.as_deref()).ok_or_else(|| {
			Error::BrowserLaunch(match &options.executable {
				Some(path) => format!("browser executable not found at {}", path.display()),
				None => "could not find a Chrome/Chromium executable; install one or set launch.executable".to_string(),
			})
		})?;

		let port = if options.port == 0 { free_port()? } else { options.port };
		let (user_data_dir, scratch_profile) = match &options.user_data_dir {
			Some(dir) => (dir.clone(), None),
			None => {
				let dir = scratch_profile_dir(port);
				(dir.clone(), Some(dir))
			}
		};

		let plan = LaunchPlan {
			executable,
			port,
			user_data_dir,
			headless: options.headless,
			extra_args: options.args.clone(),
			probe_attempts: (options.launch_timeout.as_millis() / 250).max(1) as u32,
		};
		info!(
			target = "komodo.launch",
			executable = %plan.executable.display(),
			port,
			headless = plan.headless,
			"launching browser"
		);

		let (child, info) = match launch_chrome(&plan).await {
			Ok(launched) => launched,
			Err(e) => {
				if let Some(dir) = &scratch_profile {
					remove_profile_dir(dir);
				}
				return Err(e);
			}
		};

		let mut process = OwnedProcess { child, scratch_profile };
		match Self::attach(&info.web_socket_debugger_url, info.browser).await {
			Ok(browser) => {
				*browser.process.lock() = Some(process);
				Ok(browser)
			}
			Err(e) => {
				let _ = process.child.kill();
				let _ = process.child.wait();
				if let Some(dir) = &process.scratch_profile {
					remove_profile_dir(dir);
				}
				Err(e)
			}
		}
	}

	/// Attaches to an already running browser at `ws_endpoint`.
	pub async fn connect(ws_endpoint: &str) -> Result<Self> {
		Self::attach(ws_endpoint, None).await
	}

	async fn attach(ws_endpoint: &str, version: Option<String>) -> Result<Self> {
		let (transport, message_rx) = WebSocketTransport::connect(ws_endpoint).await?;
		let connection = Arc::new(Connection::new(transport.into_transport_parts(message_rx)));
		let handle = spawn_loop(&connection);
		debug!(target = "komodo.cdp", endpoint = %ws_endpoint, "browser connection established");

		Ok(Self {
			connection,
			ws_endpoint: ws_endpoint.to_string(),
			version,
			process: Mutex::new(None),
			loop_handle: Mutex::new(Some(handle)),
		})
	}

	pub fn ws_endpoint(&self) -> &str {
		&self.ws_endpoint
	}

	/// Product string reported by `/json/version`, when launched locally.
	pub fn version(&self) -> Option<&str> {
		self.version.as_deref()
	}

	pub fn owns_process(&self) -> bool {
		self.process.lock().is_some()
	}

	/// Opens a new tab and attaches a flattened session to it.
	pub async fn new_page(&self) -> Result<Page> {
		let created = self
			.connection
			.send_message(None, "Target.createTarget", json!({ "url": "about:blank" }))
			.await?;
		let target_id = created["targetId"]
			.as_str()
			.ok_or_else(|| Error::ProtocolError("Target.createTarget returned no targetId".into()))?
			.to_string();

		let attached = self
			.connection
			.send_message(None, "Target.attachToTarget", json!({ "targetId": target_id, "flatten": true }))
			.await?;
		let session_id = attached["sessionId"]
			.as_str()
			.ok_or_else(|| Error::ProtocolError("Target.attachToTarget returned no sessionId".into()))?
			.to_string();

		Page::attach(Arc::clone(&self.connection), target_id, session_id).await
	}

	/// Closes the browser (or disconnects from an attached one).
	pub async fn close(&self) -> Result<()> {
		let process = self.process.lock().take();
		let result = match process {
			Some(mut process) => {
				let graceful = tokio::time::timeout(
					Duration::from_secs(3),
					self.connection.send_message(None, "Browser.close", json!({})),
				)
				.await;
				if !matches!(graceful, Ok(Ok(_))) {
					debug!(target = "komodo.launch", "graceful close failed; killing process");
				}
				let _ = process.child.kill();
				let waited = process.child.wait().map(|_| ()).map_err(Error::from);
				if let Some(dir) = &process.scratch_profile {
					remove_profile_dir(dir);
				}
				waited
			}
			None => Ok(()),
		};

		if let Some(handle) = self.loop_handle.lock().take() {
			handle.abort();
		}
		result
	}
}

impl std::fmt::Debug for Browser {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Browser")
			.field("ws_endpoint", &self.ws_endpoint)
			.field("version", &self.version)
			.field("owns_process", &self.owns_process())
			.finish()
	}
}
