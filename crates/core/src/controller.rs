//! Lifecycle controller: browser startup, session restore, shutdown.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use komodo_protocol::{Cookie, SessionState, WaitUntil};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::KomodoConfig;
use crate::country::{CountryCatalog, CountrySelector};
use crate::driver::{AutomationDriver, ChromiumLauncher, DriverLauncher, PageDriver};
use crate::error::{Error, Result};
use crate::events::{Event, EventEmitter};
use crate::listener::SmsListener;
use crate::session::{JsonSessionStore, SessionStore};
use crate::workflow::{ActivationResult, ActivationWorkflow};

const APPLY_LOCAL_STORAGE: &str = "(storage) => { for (const key in storage) localStorage.setItem(key, storage[key]); }";

const DUMP_LOCAL_STORAGE: &str = "(() => { const out = {}; for (let i = 0; i < localStorage.length; i++) { const key = localStorage.key(i); out[key] = localStorage.getItem(key); } return out; })()";

/// Resources that live between a successful `init` and `stop`.
struct WorkflowSession {
	driver: Arc<dyn AutomationDriver>,
	page: Arc<dyn PageDriver>,
	listener: SmsListener,
}

/// Drives one browser session against the number-activation service.
///
/// Create with [`Komodo::new`], which also returns the receiving end of the
/// event channel. Call [`init`](Komodo::init) before activating and
/// [`stop`](Komodo::stop) when done; `stop` never fails.
pub struct Komodo {
	config: KomodoConfig,
	catalog: CountryCatalog,
	launcher: Arc<dyn DriverLauncher>,
	store: Arc<dyn SessionStore>,
	events: EventEmitter,
	running: AtomicBool,
	session: tokio::sync::Mutex<Option<WorkflowSession>>,
	listener: Mutex<Option<SmsListener>>,
	/// Cancelled by `stop` to interrupt an activation in flight.
	shutdown: Mutex<CancellationToken>,
	last_number: Mutex<Option<String>>,
}

impl Komodo {
	pub fn new(config: KomodoConfig) -> (Self, UnboundedReceiver<Event>) {
		Self::with_launcher(config, Arc::new(ChromiumLauncher))
	}

	pub fn with_launcher(config: KomodoConfig, launcher: Arc<dyn DriverLauncher>) -> (Self, UnboundedReceiver<Event>) {
		let (events, rx) = EventEmitter::channel();
		let komodo = Self {
			config,
			catalog: CountryCatalog::default(),
			launcher,
			store: Arc::new(JsonSessionStore),
			events,
			running: AtomicBool::new(false),
			session: tokio::sync::Mutex::new(None),
			listener: Mutex::new(None),
			shutdown: Mutex::new(CancellationToken::new()),
			last_number: Mutex::new(None),
		};
		(komodo, rx)
	}

	pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
		self.store = store;
		self
	}

	pub fn with_catalog(mut self, catalog: CountryCatalog) -> Self {
		self.catalog = catalog;
		self
	}

	pub fn config(&self) -> &KomodoConfig {
		&self.config
	}

	pub fn catalog(&self) -> &CountryCatalog {
		&self.catalog
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}

	/// Number extracted by the last successful activation.
	pub fn last_number(&self) -> Option<String> {
		self.last_number.lock().clone()
	}

	pub fn is_listening(&self) -> bool {
		self.listener.lock().as_ref().is_some_and(SmsListener::is_running)
	}

	/// Launches the browser and restores the stored session if one exists.
	///
	/// The controller is running only once this returns `Ok`. A second call
	/// while running is a no-op.
	pub async fn init(&self) -> Result<()> {
		let mut slot = self.session.lock().await;
		if slot.is_some() {
			debug!(target = "komodo.controller", "init called while running");
			return Ok(());
		}

		match self.start_session().await {
			Ok(session) => {
				*self.listener.lock() = Some(session.listener.clone());
				*self.shutdown.lock() = CancellationToken::new();
				*slot = Some(session);
				self.running.store(true, Ordering::SeqCst);
				info!(target = "komodo.controller", "ready");
				self.events.ready();
				Ok(())
			}
			Err(e) => {
				self.events.error(&e);
				Err(e)
			}
		}
	}

	async fn start_session(&self) -> Result<WorkflowSession> {
		self.config.validate()?;
		let driver = self.launcher.launch(&self.config).await?;
		self.events.log("browser-launched");

		let page = match self.open_and_restore(&driver).await {
			Ok(page) => page,
			Err(e) => {
				if let Err(close_err) = driver.close().await {
					debug!(target = "komodo.controller", error = %close_err, "close after failed init");
				}
				return Err(e);
			}
		};

		let listener = SmsListener::new(page.clone(), self.events.clone(), self.config.timings.poll_interval());
		Ok(WorkflowSession { driver, page, listener })
	}

	async fn open_and_restore(&self, driver: &Arc<dyn AutomationDriver>) -> Result<Arc<dyn PageDriver>> {
		let page = driver.new_page().await?;
		let path = &self.config.session_path;

		let Some(state) = self.store.load(path).await? else {
			self.events.log(format!("session.json not found at {}", path.display()));
			return Ok(page);
		};

		for cookie in &state.cookies {
			page.set_cookie(&self.scoped_cookie(cookie)).await?;
		}
		self.goto_origin(&page).await?;
		page.call_function(APPLY_LOCAL_STORAGE, &[json!(state.local_storage)]).await?;
		info!(
			target = "komodo.controller",
			cookies = state.cookies.len(),
			local_storage = state.local_storage.len(),
			"session restored"
		);
		self.events.log("session-loaded");
		Ok(page)
	}

	/// Cookies without a domain or url are bound to the service origin.
	fn scoped_cookie(&self, cookie: &Cookie) -> Cookie {
		if cookie.domain.is_some() || cookie.url.is_some() {
			return cookie.clone();
		}
		cookie.clone().with_url(self.config.origin.clone())
	}

	async fn goto_origin(&self, page: &Arc<dyn PageDriver>) -> Result<()> {
		let origin = &self.config.origin;
		page.goto(origin, WaitUntil::DomContentLoaded, self.config.timings.navigation())
			.await
			.map_err(|source| Error::Navigation {
				url: origin.clone(),
				source,
			})
	}

	/// Stops the listener and releases page and browser. Never fails and is
	/// safe to call repeatedly or before `init`.
	///
	/// An activation in flight is interrupted and returns [`Error::Stopped`].
	/// An `init` in flight is allowed to finish and is then torn down.
	pub async fn stop(&self) {
		self.running.store(false, Ordering::SeqCst);
		self.shutdown.lock().cancel();
		if let Some(listener) = self.listener.lock().take() {
			listener.stop();
		}

		let session = {
			let mut slot = self.session.lock().await;
			// A concurrent init may have completed while we waited.
			self.running.store(false, Ordering::SeqCst);
			self.listener.lock().take();
			slot.take()
		};
		if let Some(session) = session {
			session.listener.stop();
			if let Err(e) = session.page.close().await {
				warn!(target = "komodo.controller", error = %e, "page close failed");
			}
			if let Err(e) = session.driver.close().await {
				warn!(target = "komodo.controller", error = %e, "browser close failed");
			}
		}
		self.events.log("komodo-stopped");
	}

	/// Requests a number for `country` (catalog index or literal label).
	///
	/// Fails with [`Error::NotRunning`] before `init`, and with a country
	/// error for an unresolvable selector; neither touches the page. A
	/// concurrent [`stop`](Komodo::stop) interrupts the run with
	/// [`Error::Stopped`].
	pub async fn activate_country(&self, country: impl Into<CountrySelector>) -> Result<ActivationResult> {
		if !self.is_running() {
			return Err(Error::NotRunning);
		}
		let label = self.catalog.resolve(&country.into()).inspect_err(|e| self.events.error(e))?;

		let guard = self.session.lock().await;
		let session = guard.as_ref().ok_or(Error::NotRunning)?;
		let shutdown = self.shutdown.lock().clone();
		let workflow = ActivationWorkflow {
			page: &session.page,
			config: &self.config,
			events: &self.events,
			listener: &session.listener,
		};
		let result = tokio::select! {
			biased;
			_ = shutdown.cancelled() => {
				info!(target = "komodo.controller", country = %label, "activation interrupted by stop");
				return Err(Error::Stopped);
			}
			result = workflow.run(&label) => result?,
		};

		if let Some(number) = result.phone_number() {
			*self.last_number.lock() = Some(number.to_string());
		}
		Ok(result)
	}

	/// Opens the service origin in the controlled page.
	pub async fn open_origin(&self) -> Result<()> {
		let guard = self.session.lock().await;
		let session = guard.as_ref().ok_or(Error::NotRunning)?;
		self.goto_origin(&session.page).await
	}

	/// Persists the page's cookies and `localStorage` to the session path.
	pub async fn save_session(&self) -> Result<SessionState> {
		let guard = self.session.lock().await;
		let session = guard.as_ref().ok_or(Error::NotRunning)?;

		let cookies = session.page.cookies().await?;
		let local_storage = string_map(session.page.evaluate(DUMP_LOCAL_STORAGE).await?);
		let state = SessionState { cookies, local_storage };
		self.store.save(&self.config.session_path, &state).await?;

		self.events.log(format!("session-saved:{}", self.config.session_path.display()));
		Ok(state)
	}
}

impl std::fmt::Debug for Komodo {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Komodo")
			.field("origin", &self.config.origin)
			.field("running", &self.is_running())
			.field("last_number", &self.last_number())
			.finish()
	}
}

/// String-valued entries of a JSON object.
fn string_map(value: Value) -> BTreeMap<String, String> {
	let Value::Object(map) = value else {
		return BTreeMap::new();
	};
	map.into_iter()
		.filter_map(|(key, value)| match value {
			Value::String(s) => Some((key, s)),
			_ => None,
		})
		.collect()
}
