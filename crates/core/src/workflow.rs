//! The activation state machine.
//!
//! `Idle -> Navigated -> ServiceSelected -> CountrySelected -> Activated`,
//! then a bounded race between the error and phone-number markers decides
//! the [`ActivationResult`]. Every call runs the whole sequence from the
//! start; nothing is resumed.

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use komodo_protocol::WaitUntil;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::capture::{CaptureKind, capture};
use crate::config::KomodoConfig;
use crate::driver::{PageDriver, Selector};
use crate::error::{Error, Result};
use crate::events::EventEmitter;
use crate::listener::SmsListener;

/// Any of these markers means the service refused the activation.
pub const ERROR_SELECTOR: &str = r#"[class*="Error"], [class*="error"], [data-open="entercard"], .modal, [class*="Modal"]"#;

/// Container of an activated phone number.
pub const NUMBER_SELECTOR: &str = r#"[class*="PhoneNumber__Wrapper"]"#;

static PHONE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+\d[\d\s]+").expect("PHONE_NUMBER_RE should compile"));

/// Terminal outcome of one activation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationResult {
	Active {
		#[serde(rename = "phoneNumber")]
		phone_number: String,
	},
	NoAvailableNumbers,
	NumberNotExtracted,
	Timeout,
}

impl ActivationResult {
	pub fn phone_number(&self) -> Option<&str> {
		match self {
			ActivationResult::Active { phone_number } => Some(phone_number),
			_ => None,
		}
	}

	pub fn is_active(&self) -> bool {
		matches!(self, ActivationResult::Active { .. })
	}
}

impl fmt::Display for ActivationResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ActivationResult::Active { phone_number } => write!(f, "active {phone_number}"),
			ActivationResult::NoAvailableNumbers => f.write_str("no available numbers"),
			ActivationResult::NumberNotExtracted => f.write_str("number not extracted"),
			ActivationResult::Timeout => f.write_str("timeout"),
		}
	}
}

/// Finds the first `+<digits/spaces>` run and strips the whitespace.
pub fn extract_phone_number(text: &str) -> Option<String> {
	let found = PHONE_NUMBER_RE.find(text)?;
	Some(found.as_str().chars().filter(|c| !c.is_whitespace()).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
	Error,
	Number,
	Neither,
}

pub(crate) struct ActivationWorkflow<'a> {
	pub page: &'a Arc<dyn PageDriver>,
	pub config: &'a KomodoConfig,
	pub events: &'a EventEmitter,
	pub listener: &'a SmsListener,
}

impl ActivationWorkflow<'_> {
	/// Runs the full sequence for `country`.
	///
	/// Unexpected failures are emitted as [`Event::Error`](crate::Event::Error)
	/// and returned; business outcomes are returned as data.
	pub async fn run(&self, country: &str) -> Result<ActivationResult> {
		match self.drive(country).await {
			Ok(result) => {
				info!(target = "komodo.workflow", %country, %result, "activation finished");
				Ok(result)
			}
			Err(e) => {
				self.events.error(&e);
				Err(e)
			}
		}
	}

	async fn drive(&self, country: &str) -> Result<ActivationResult> {
		let timings = &self.config.timings;
		let origin = self.config.origin.as_str();

		self.page
			.goto(origin, WaitUntil::NetworkAlmostIdle, timings.navigation())
			.await
			.map_err(|source| Error::Navigation {
				url: origin.to_string(),
				source,
			})?;
		debug!(target = "komodo.workflow", %origin, "navigated");

		self.select(&Selector::text(&self.config.channel_label)).await?;
		self.events.log(format!("clicked-{}", self.config.channel_label.to_lowercase()));

		self.select(&Selector::text(country)).await?;
		self.events.log(format!("country-selected:{country}"));
		tokio::time::sleep(timings.country_settle()).await;

		self.select(&Selector::text(&self.config.activate_label)).await?;
		self.events.log("activate-clicked");
		tokio::time::sleep(timings.activate_settle()).await;

		match self.race().await {
			Signal::Error => {
				self.events.error(&"NO AVAILABLE NUMBERS");
				capture(&**self.page, self.config, self.events, CaptureKind::Error, country).await;
				Ok(ActivationResult::NoAvailableNumbers)
			}
			Signal::Number => {
				tokio::time::sleep(timings.number_settle()).await;
				let text = self.page.evaluate(&Selector::css(NUMBER_SELECTOR).inner_text_expression()).await?;
				match text.as_str().and_then(extract_phone_number) {
					Some(phone_number) => {
						self.events.number(phone_number.clone());
						self.listener.start();
						Ok(ActivationResult::Active { phone_number })
					}
					None => {
						capture(&**self.page, self.config, self.events, CaptureKind::NoNumber, country).await;
						self.events.error(&"NO_NUMBER_EXTRACTED");
						Ok(ActivationResult::NumberNotExtracted)
					}
				}
			}
			Signal::Neither => {
				self.events.log("no result after activation");
				capture(&**self.page, self.config, self.events, CaptureKind::Timeout, country).await;
				Ok(ActivationResult::Timeout)
			}
		}
	}

	/// Waits for a required element and clicks it; absence is fatal.
	async fn select(&self, selector: &Selector) -> Result<()> {
		let timeout = self.config.timings.selector();
		if !self.page.wait_for_selector(selector, timeout).await? {
			return Err(Error::SelectorTimeout {
				selector: selector.to_string(),
				ms: timeout.as_millis() as u64,
			});
		}
		self.page.click(selector).await?;
		Ok(())
	}

	/// First marker to appear wins. A branch that times out only drops out
	/// of the race; the other keeps waiting until its own deadline. The
	/// losing wait is dropped on return.
	async fn race(&self) -> Signal {
		let timings = &self.config.timings;
		let error_selector = Selector::css(ERROR_SELECTOR);
		let number_selector = Selector::css(NUMBER_SELECTOR);
		let error = self.signal(&error_selector, timings.error_signal());
		let number = self.signal(&number_selector, timings.number_signal());
		tokio::pin!(error, number);

		let (mut error_done, mut number_done) = (false, false);
		loop {
			tokio::select! {
				present = &mut error, if !error_done => {
					if present {
						return Signal::Error;
					}
					error_done = true;
				}
				present = &mut number, if !number_done => {
					if present {
						return Signal::Number;
					}
					number_done = true;
				}
				else => return Signal::Neither,
			}
		}
	}

	async fn signal(&self, selector: &Selector, timeout: Duration) -> bool {
		match self.page.wait_for_selector(selector, timeout).await {
			Ok(present) => present,
			Err(e) => {
				debug!(target = "komodo.workflow", %selector, error = %e, "signal wait failed");
				false
			}
		}
	}
}
