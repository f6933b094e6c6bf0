//! Chromium adapter over `komodo_runtime`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use komodo_protocol::{Cookie, ScreenshotOptions, WaitUntil};
use komodo_runtime::{Browser, LaunchOptions, Page, Result as DriverResult};
use serde_json::Value;
use tracing::info;

use super::{AutomationDriver, DriverLauncher, PageDriver, Selector};
use crate::config::KomodoConfig;
use crate::error::{Error, Result};

/// Launches a local Chromium, or attaches when `launch.cdpEndpoint` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
	fn launch_options(config: &KomodoConfig) -> LaunchOptions {
		let launch = &config.launch;
		let mut options = LaunchOptions::default().headless(config.headless).port(launch.port);
		if let Some(executable) = &launch.executable {
			options = options.executable(executable);
		}
		options.user_data_dir = launch.user_data_dir.clone();
		for arg in &launch.args {
			options = options.arg(arg);
		}
		options
	}
}

#[async_trait]
impl DriverLauncher for ChromiumLauncher {
	async fn launch(&self, config: &KomodoConfig) -> Result<Arc<dyn AutomationDriver>> {
		let browser = match &config.launch.cdp_endpoint {
			Some(endpoint) => {
				info!(target = "komodo.driver", %endpoint, "attaching to running browser");
				Browser::connect(endpoint).await
			}
			None => Browser::launch(&Self::launch_options(config)).await,
		}
		.map_err(|e| Error::BrowserLaunch(e.to_string()))?;

		info!(
			target = "komodo.driver",
			version = browser.version().unwrap_or("unknown"),
			endpoint = browser.ws_endpoint(),
			owned = browser.owns_process(),
			"browser ready"
		);
		Ok(Arc::new(ChromiumDriver { browser }))
	}
}

struct ChromiumDriver {
	browser: Browser,
}

#[async_trait]
impl AutomationDriver for ChromiumDriver {
	async fn new_page(&self) -> DriverResult<Arc<dyn PageDriver>> {
		let page = self.browser.new_page().await?;
		Ok(Arc::new(ChromiumPage { page }))
	}

	async fn close(&self) -> DriverResult<()> {
		self.browser.close().await
	}
}

struct ChromiumPage {
	page: Page,
}

#[async_trait]
impl PageDriver for ChromiumPage {
	async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> DriverResult<()> {
		self.page.goto(url, wait_until, timeout).await
	}

	async fn wait_for_selector(&self, selector: &Selector, timeout: Duration) -> DriverResult<bool> {
		self.page.wait_for_selector(selector, timeout).await
	}

	async fn click(&self, selector: &Selector) -> DriverResult<()> {
		self.page.click(selector).await
	}

	async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
		self.page.evaluate(expression).await
	}

	async fn call_function(&self, function_declaration: &str, args: &[Value]) -> DriverResult<Value> {
		self.page.call_function(function_declaration, args).await
	}

	async fn screenshot(&self, path: &Path, full_page: bool) -> DriverResult<()> {
		self.page.screenshot(path, ScreenshotOptions { full_page }).await
	}

	async fn set_cookie(&self, cookie: &Cookie) -> DriverResult<()> {
		self.page.set_cookie(cookie).await
	}

	async fn cookies(&self) -> DriverResult<Vec<Cookie>> {
		self.page.cookies().await
	}

	async fn close(&self) -> DriverResult<()> {
		self.page.close().await
	}
}
