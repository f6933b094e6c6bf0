//! Browser-driver seam.
//!
//! The workflow, listener, and controller only talk to these traits. The
//! production adapter in [`chromium`] wraps the runtime's `Browser`/`Page`;
//! tests substitute scripted fakes. Methods return the runtime's error type
//! so callers can still distinguish timeouts and torn-down targets.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use komodo_protocol::{Cookie, WaitUntil};
use komodo_runtime::Result as DriverResult;
use serde_json::Value;

use crate::config::KomodoConfig;
use crate::error::Result;

pub mod chromium;

pub use chromium::ChromiumLauncher;
pub use komodo_runtime::Selector;

/// Starts (or attaches to) a browser for a controller.
#[async_trait]
pub trait DriverLauncher: Send + Sync {
	async fn launch(&self, config: &KomodoConfig) -> Result<Arc<dyn AutomationDriver>>;
}

/// A running browser.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
	async fn new_page(&self) -> DriverResult<Arc<dyn PageDriver>>;

	async fn close(&self) -> DriverResult<()>;
}

/// The page operations the activation flow needs.
#[async_trait]
pub trait PageDriver: Send + Sync {
	async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> DriverResult<()>;

	/// `Ok(false)` when the selector did not match within `timeout`.
	async fn wait_for_selector(&self, selector: &Selector, timeout: Duration) -> DriverResult<bool>;

	async fn click(&self, selector: &Selector) -> DriverResult<()>;

	async fn evaluate(&self, expression: &str) -> DriverResult<Value>;

	async fn call_function(&self, function_declaration: &str, args: &[Value]) -> DriverResult<Value>;

	async fn screenshot(&self, path: &Path, full_page: bool) -> DriverResult<()>;

	async fn set_cookie(&self, cookie: &Cookie) -> DriverResult<()>;

	async fn cookies(&self) -> DriverResult<Vec<Cookie>>;

	async fn close(&self) -> DriverResult<()>;
}
