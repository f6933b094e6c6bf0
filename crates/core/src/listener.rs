//! Background verification-code listener.
//!
//! Polls the first `<pre>` block of the page, classifies its text, and
//! emits at most one [`Event::Code`](crate::Event::Code) per run. The loop
//! checks a [`CancellationToken`] between iterations and while sleeping; a
//! read that is already in flight when [`SmsListener::stop`] is called is
//! abandoned, not awaited.

use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::{PageDriver, Selector};
use crate::events::EventEmitter;

/// Element holding the delivered message text.
pub const CODE_SELECTOR: &str = "pre";

const CODE_MARKERS: [&str; 2] = ["codigo", "whatsapp"];

static DIGIT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{3,8}").expect("DIGIT_RUN_RE should compile"));

/// Returns `true` when `text` looks like a delivered code.
///
/// Matches either marker (case-insensitive) or any run of 3 to 8 digits;
/// longer runs match through their first 3..8 digit window.
pub fn classify_code(text: &str) -> bool {
	let text = text.trim();
	if text.is_empty() {
		return false;
	}
	let lower = text.to_lowercase();
	CODE_MARKERS.iter().any(|marker| lower.contains(marker)) || DIGIT_RUN_RE.is_match(text)
}

struct ListenerState {
	page: Arc<dyn PageDriver>,
	events: EventEmitter,
	poll_interval: Duration,
	running: AtomicBool,
	cancel: Mutex<CancellationToken>,
	last_code: Mutex<Option<String>>,
}

/// Single-loop poller bound to one page.
#[derive(Clone)]
pub struct SmsListener {
	state: Arc<ListenerState>,
}

impl SmsListener {
	pub fn new(page: Arc<dyn PageDriver>, events: EventEmitter, poll_interval: Duration) -> Self {
		Self {
			state: Arc::new(ListenerState {
				page,
				events,
				poll_interval,
				running: AtomicBool::new(false),
				cancel: Mutex::new(CancellationToken::new()),
				last_code: Mutex::new(None),
			}),
		}
	}

	/// Spawns the polling loop unless one is already running.
	pub fn start(&self) {
		if self.state.running.swap(true, Ordering::SeqCst) {
			debug!(target = "komodo.listener", "listener already running");
			return;
		}
		let token = CancellationToken::new();
		*self.state.cancel.lock() = token.clone();
		self.state.events.log("sms-listener-started");
		tokio::spawn(run(Arc::clone(&self.state), token));
	}

	/// Cancels the loop. Safe to call when not running.
	pub fn stop(&self) {
		self.state.running.store(false, Ordering::SeqCst);
		self.state.cancel.lock().cancel();
	}

	pub fn is_running(&self) -> bool {
		self.state.running.load(Ordering::SeqCst)
	}

	/// Text of the code found by the last run, if any.
	pub fn last_code(&self) -> Option<String> {
		self.state.last_code.lock().clone()
	}
}

impl std::fmt::Debug for SmsListener {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SmsListener")
			.field("running", &self.is_running())
			.field("poll_interval", &self.state.poll_interval)
			.finish()
	}
}

async fn run(state: Arc<ListenerState>, token: CancellationToken) {
	let expression = Selector::css(CODE_SELECTOR).inner_text_expression();
	loop {
		let read = tokio::select! {
			biased;
			_ = token.cancelled() => break,
			read = state.page.evaluate(&expression) => read,
		};

		match read {
			Ok(Value::String(text)) if classify_code(&text) => {
				*state.last_code.lock() = Some(text.clone());
				state.events.code(text);
				break;
			}
			Ok(_) => {}
			Err(e) if e.is_disposed() => {
				debug!(target = "komodo.listener", error = %e, "page gone; listener exiting");
				break;
			}
			Err(e) => {
				debug!(target = "komodo.listener", error = %e, "poll failed");
				state.events.log("sms-listen-eval-error");
			}
		}

		tokio::select! {
			biased;
			_ = token.cancelled() => break,
			_ = tokio::time::sleep(state.poll_interval) => {}
		}
	}

	// A cancelled token means stop() already cleared the flag, possibly
	// followed by a fresh start() that must not be undone here.
	if !token.is_cancelled() {
		state.running.store(false, Ordering::SeqCst);
	}
	state.events.log("sms-listener-stopped");
}
