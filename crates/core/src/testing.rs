//! Scripted in-memory driver for unit tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use komodo_protocol::{Cookie, WaitUntil};
use komodo_runtime::{Error as DriverError, Result as DriverResult};
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::KomodoConfig;
use crate::driver::{AutomationDriver, DriverLauncher, PageDriver, Selector};
use crate::error::{Error, Result};
use crate::listener::CODE_SELECTOR;

/// One scripted read of the `<pre>` block.
#[derive(Debug, Clone)]
pub enum PreRead {
	Missing,
	Text(String),
	Fail,
	Disposed,
}

#[derive(Default)]
struct PageState {
	appear_after: HashMap<String, Duration>,
	responses: HashMap<String, Value>,
	pre: VecDeque<PreRead>,
	pre_reads: usize,
	gotos: Vec<(String, WaitUntil)>,
	clicks: Vec<String>,
	waits: Vec<String>,
	cookies: Vec<Cookie>,
	calls: Vec<Vec<Value>>,
	screenshots: Vec<PathBuf>,
	fail_goto: bool,
	fail_screenshots: bool,
	hang_screenshots: bool,
}

/// Page whose selectors appear after scripted delays.
///
/// Selectors never scripted with [`FakePage::appear`] never appear.
#[derive(Default)]
pub struct FakePage {
	state: Mutex<PageState>,
	closed: AtomicBool,
}

impl FakePage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn appear(&self, selector: impl Into<Selector>, after: Duration) {
		self.state.lock().appear_after.insert(selector.into().to_string(), after);
	}

	/// Fixed result for `evaluate(expression)`.
	pub fn respond(&self, expression: impl Into<String>, value: Value) {
		self.state.lock().responses.insert(expression.into(), value);
	}

	pub fn script_pre(&self, reads: impl IntoIterator<Item = PreRead>) {
		self.state.lock().pre.extend(reads);
	}

	pub fn fail_goto(&self) {
		self.state.lock().fail_goto = true;
	}

	pub fn fail_screenshots(&self) {
		self.state.lock().fail_screenshots = true;
	}

	/// Screenshots never complete.
	pub fn hang_screenshots(&self) {
		self.state.lock().hang_screenshots = true;
	}

	pub fn pre_reads(&self) -> usize {
		self.state.lock().pre_reads
	}

	pub fn gotos(&self) -> Vec<(String, WaitUntil)> {
		self.state.lock().gotos.clone()
	}

	pub fn clicks(&self) -> Vec<String> {
		self.state.lock().clicks.clone()
	}

	pub fn waits(&self) -> Vec<String> {
		self.state.lock().waits.clone()
	}

	pub fn set_cookies(&self) -> Vec<Cookie> {
		self.state.lock().cookies.clone()
	}

	pub fn function_calls(&self) -> Vec<Vec<Value>> {
		self.state.lock().calls.clone()
	}

	pub fn screenshots(&self) -> Vec<PathBuf> {
		self.state.lock().screenshots.clone()
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn ensure_open(&self) -> DriverResult<()> {
		if self.is_closed() {
			return Err(DriverError::TargetClosed("page closed".into()));
		}
		Ok(())
	}
}

#[async_trait]
impl PageDriver for FakePage {
	async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> DriverResult<()> {
		self.ensure_open()?;
		let fail = {
			let mut state = self.state.lock();
			state.gotos.push((url.to_string(), wait_until));
			state.fail_goto
		};
		if fail {
			return Err(DriverError::Timeout(format!("navigation to {url} exceeded {}ms", timeout.as_millis())));
		}
		Ok(())
	}

	async fn wait_for_selector(&self, selector: &Selector, timeout: Duration) -> DriverResult<bool> {
		self.ensure_open()?;
		let after = {
			let mut state = self.state.lock();
			state.waits.push(selector.to_string());
			state.appear_after.get(&selector.to_string()).copied()
		};
		match after {
			Some(after) if after <= timeout => {
				tokio::time::sleep(after).await;
				self.ensure_open()?;
				Ok(true)
			}
			_ => {
				tokio::time::sleep(timeout).await;
				Ok(false)
			}
		}
	}

	async fn click(&self, selector: &Selector) -> DriverResult<()> {
		self.ensure_open()?;
		let mut state = self.state.lock();
		if !state.appear_after.contains_key(&selector.to_string()) {
			return Err(DriverError::ElementNotFound(selector.to_string()));
		}
		state.clicks.push(selector.to_string());
		Ok(())
	}

	async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
		self.ensure_open()?;
		let mut state = self.state.lock();
		if expression == Selector::css(CODE_SELECTOR).inner_text_expression() {
			state.pre_reads += 1;
			return match state.pre.pop_front().unwrap_or(PreRead::Missing) {
				PreRead::Missing => Ok(Value::Null),
				PreRead::Text(text) => Ok(Value::String(text)),
				PreRead::Fail => Err(DriverError::Evaluation("Execution context was destroyed".into())),
				PreRead::Disposed => Err(DriverError::TargetClosed("Target closed".into())),
			};
		}
		Ok(state.responses.get(expression).cloned().unwrap_or(Value::Null))
	}

	async fn call_function(&self, _function_declaration: &str, args: &[Value]) -> DriverResult<Value> {
		self.ensure_open()?;
		self.state.lock().calls.push(args.to_vec());
		Ok(Value::Null)
	}

	async fn screenshot(&self, path: &Path, _full_page: bool) -> DriverResult<()> {
		self.ensure_open()?;
		let hang = {
			let mut state = self.state.lock();
			if state.fail_screenshots {
				return Err(DriverError::ProtocolError("capture failed".into()));
			}
			state.screenshots.push(path.to_path_buf());
			state.hang_screenshots
		};
		if hang {
			std::future::pending::<()>().await;
		}
		Ok(())
	}

	async fn set_cookie(&self, cookie: &Cookie) -> DriverResult<()> {
		self.ensure_open()?;
		self.state.lock().cookies.push(cookie.clone());
		Ok(())
	}

	async fn cookies(&self) -> DriverResult<Vec<Cookie>> {
		self.ensure_open()?;
		Ok(self.state.lock().cookies.clone())
	}

	async fn close(&self) -> DriverResult<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Err(DriverError::TargetClosed("page already closed".into()));
		}
		Ok(())
	}
}

/// Browser handing out a single shared [`FakePage`].
pub struct FakeDriver {
	pub page: Arc<FakePage>,
	closed: AtomicBool,
	fail_close: AtomicBool,
}

impl FakeDriver {
	pub fn new(page: Arc<FakePage>) -> Self {
		Self {
			page,
			closed: AtomicBool::new(false),
			fail_close: AtomicBool::new(false),
		}
	}

	pub fn fail_close(&self) {
		self.fail_close.store(true, Ordering::SeqCst);
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl AutomationDriver for FakeDriver {
	async fn new_page(&self) -> DriverResult<Arc<dyn PageDriver>> {
		Ok(self.page.clone())
	}

	async fn close(&self) -> DriverResult<()> {
		self.closed.store(true, Ordering::SeqCst);
		if self.fail_close.load(Ordering::SeqCst) {
			return Err(DriverError::Transport("socket reset".into()));
		}
		Ok(())
	}
}

/// Launcher returning a prepared [`FakeDriver`] or a launch failure.
pub struct FakeLauncher {
	pub driver: Arc<FakeDriver>,
	fail: bool,
	delay: Duration,
	launches: AtomicUsize,
}

impl FakeLauncher {
	pub fn new(driver: Arc<FakeDriver>) -> Self {
		Self {
			driver,
			fail: false,
			delay: Duration::ZERO,
			launches: AtomicUsize::new(0),
		}
	}

	/// Launch takes `delay` before handing out the driver.
	pub fn slow(driver: Arc<FakeDriver>, delay: Duration) -> Self {
		Self {
			delay,
			..Self::new(driver)
		}
	}

	pub fn failing(driver: Arc<FakeDriver>) -> Self {
		Self {
			fail: true,
			..Self::new(driver)
		}
	}

	pub fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl DriverLauncher for FakeLauncher {
	async fn launch(&self, _config: &KomodoConfig) -> Result<Arc<dyn AutomationDriver>> {
		self.launches.fetch_add(1, Ordering::SeqCst);
		tokio::time::sleep(self.delay).await;
		if self.fail {
			return Err(Error::BrowserLaunch("no chromium executable found".into()));
		}
		Ok(self.driver.clone())
	}
}
