//! Observer channel.
//!
//! Components report upward through an [`EventEmitter`]. Emission never
//! blocks and never fails: the channel is unbounded and a dropped receiver
//! is ignored. Each event is mirrored to `tracing`.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Signals emitted by the controller, workflow, and listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	/// Diagnostic progress marker (`browser-launched`, `clicked-whatsapp`, ...).
	Log(String),
	/// `init` completed; the controller is running.
	Ready,
	/// A phone number was activated.
	Number(String),
	/// Raw text of a delivered verification message.
	Code(String),
	/// A failure, fatal or business-level, rendered as text.
	Error(String),
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Event::Log(message) => write!(f, "log: {message}"),
			Event::Ready => f.write_str("ready"),
			Event::Number(number) => write!(f, "number: {number}"),
			Event::Code(code) => write!(f, "code: {code}"),
			Event::Error(error) => write!(f, "error: {error}"),
		}
	}
}

/// Fire-and-forget sender half of the observer channel.
#[derive(Debug, Clone)]
pub struct EventEmitter {
	tx: mpsc::UnboundedSender<Event>,
}

impl EventEmitter {
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	pub fn emit(&self, event: Event) {
		match &event {
			Event::Log(message) => debug!(target = "komodo.events", %message, "log"),
			Event::Ready => info!(target = "komodo.events", "ready"),
			Event::Number(number) => info!(target = "komodo.events", %number, "number"),
			Event::Code(code) => info!(target = "komodo.events", %code, "code"),
			Event::Error(error) => warn!(target = "komodo.events", %error, "error"),
		}
		let _ = self.tx.send(event);
	}

	pub fn log(&self, message: impl Into<String>) {
		self.emit(Event::Log(message.into()));
	}

	pub fn ready(&self) {
		self.emit(Event::Ready);
	}

	pub fn number(&self, number: impl Into<String>) {
		self.emit(Event::Number(number.into()));
	}

	pub fn code(&self, code: impl Into<String>) {
		self.emit(Event::Code(code.into()));
	}

	pub fn error(&self, error: &dyn fmt::Display) {
		self.emit(Event::Error(error.to_string()));
	}
}
