//! JSON-RPC connection layer for the DevTools protocol
//!
//! This module implements request/response correlation on top of a
//! transport. It handles:
//! - Generating sequential request IDs
//! - Correlating responses with pending requests
//! - Distinguishing events from responses
//! - Fanning events out to subscribers (pages waiting on lifecycle events)
//!
//! # Message Flow
//!
//! 1. Caller invokes `send_message()` with an optional session, method, and params
//! 2. Connection allocates an ID and parks a oneshot sender under it
//! 3. Request is serialized and sent via the transport
//! 4. The `run()` loop receives the response and completes the oneshot
//! 5. Events are published on a broadcast channel
//!
//! When the transport ends, every pending request fails with
//! [`Error::ChannelClosed`] and later sends fail immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use komodo_protocol::{CdpErrorPayload, CdpEvent, CdpMessage, CdpRequest};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

const EVENT_CAPACITY: usize = 1024;

type Pending = HashMap<u32, oneshot::Sender<Result<Value>>>;

/// Connection to a DevTools browser endpoint.
///
/// Shared across tasks behind an `Arc`; concurrent requests are supported.
pub struct Connection {
	last_id: AtomicU32,
	callbacks: Mutex<Pending>,
	sender: tokio::sync::Mutex<Box<dyn Transport>>,
	receiver: Mutex<Option<(Box<dyn TransportReceiver>, mpsc::UnboundedReceiver<Value>)>>,
	events: broadcast::Sender<CdpEvent>,
	closed: AtomicBool,
}

impl Connection {
	pub fn new(parts: TransportParts) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			last_id: AtomicU32::new(0),
			callbacks: Mutex::new(HashMap::new()),
			sender: tokio::sync::Mutex::new(parts.sender),
			receiver: Mutex::new(Some((parts.receiver, parts.message_rx))),
			events,
			closed: AtomicBool::new(false),
		}
	}

	/// Subscribes to browser events received after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
		self.events.subscribe()
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Sends `method` (scoped to `session_id` when given) and awaits its result.
	pub async fn send_message(&self, session_id: Option<&str>, method: &str, params: Value) -> Result<Value> {
		if self.is_closed() {
			return Err(Error::ChannelClosed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);

		let request = CdpRequest {
			id,
			method: method.to_string(),
			params,
			session_id: session_id.map(str::to_string),
		};
		trace!(target = "komodo.cdp", id, method, "send");

		let sent = match serde_json::to_value(&request) {
			Ok(value) => self.sender.lock().await.send(value).await,
			Err(e) => Err(e.into()),
		};
		if let Err(e) = sent {
			self.callbacks.lock().remove(&id);
			return Err(e);
		}

		rx.await.map_err(|_| Error::ChannelClosed).and_then(|result| result)
	}

	/// Runs the dispatch loop until the transport closes.
	///
	/// Must be spawned exactly once; later calls return immediately.
	pub async fn run(&self) {
		let Some((receiver, mut message_rx)) = self.receiver.lock().take() else {
			error!(target = "komodo.cdp", "connection loop already started");
			return;
		};

		let transport_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				error!(target = "komodo.cdp", error = %e, "transport error");
			}
		});

		while let Some(value) = message_rx.recv().await {
			match serde_json::from_value::<CdpMessage>(value.clone()) {
				Ok(message) => {
					if let Err(e) = self.dispatch(message) {
						debug!(target = "komodo.cdp", error = %e, "dispatch failed");
					}
				}
				Err(e) => error!(target = "komodo.cdp", error = %e, message = %value, "failed to parse message"),
			}
		}

		debug!(target = "komodo.cdp", "message loop ended (transport closed)");
		self.closed.store(true, Ordering::SeqCst);
		self.callbacks.lock().clear();
		let _ = transport_handle.await;
	}

	fn dispatch(&self, message: CdpMessage) -> Result<()> {
		match message {
			CdpMessage::Response(response) => {
				let callback = self
					.callbacks
					.lock()
					.remove(&response.id)
					.ok_or_else(|| Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id)))?;

				let result = match response.error {
					Some(payload) => Err(parse_protocol_error(payload)),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = callback.send(result);
				Ok(())
			}
			CdpMessage::Event(event) => {
				trace!(target = "komodo.cdp", method = %event.method, "event");
				let _ = self.events.send(event);
				Ok(())
			}
		}
	}
}

impl std::fmt::Debug for Connection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Connection")
			.field("last_id", &self.last_id.load(Ordering::SeqCst))
			.field("closed", &self.is_closed())
			.finish()
	}
}

/// Maps a DevTools error payload onto the driver error type.
fn parse_protocol_error(payload: CdpErrorPayload) -> Error {
	let message = match payload.data {
		Some(data) => format!("{} ({})", payload.message, data),
		None => payload.message,
	};
	let lower = message.to_ascii_lowercase();
	if lower.contains("target closed") || lower.contains("no target with given id") || lower.contains("session with given id not found") {
		Error::TargetClosed(message)
	} else {
		Error::ProtocolError(message)
	}
}

/// Spawns `connection.run()` on the current runtime.
pub fn spawn_loop(connection: &Arc<Connection>) -> tokio::task::JoinHandle<()> {
	let conn = Arc::clone(connection);
	tokio::spawn(async move { conn.run().await })
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use serde_json::json;

	use super::*;
	use crate::fake_transport::FakeTransportBuilder;

	async fn started() -> (Arc<Connection>, crate::fake_transport::FakeTransportController, tokio::task::JoinHandle<()>) {
		let (parts, controller) = FakeTransportBuilder::new().build();
		let connection = Arc::new(Connection::new(parts));
		let handle = spawn_loop(&connection);
		tokio::time::sleep(Duration::from_millis(10)).await;
		(connection, controller, handle)
	}

	#[tokio::test]
	async fn send_captures_request_and_resolves_response() {
		let (connection, controller, _handle) = started().await;

		let send_fut = connection.send_message(Some("S1"), "Page.navigate", json!({"url": "https://a.example"}));
		controller.inject_response(0, json!({"frameId": "F1"}));
		let result = send_fut.await.unwrap();
		assert_eq!(result["frameId"], "F1");

		let sent = controller.take_sent();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0]["id"], 0);
		assert_eq!(sent[0]["method"], "Page.navigate");
		assert_eq!(sent[0]["sessionId"], "S1");
		assert_eq!(sent[0]["params"]["url"], "https://a.example");
	}

	#[tokio::test]
	async fn responses_correlate_out_of_order() {
		let (connection, controller, _handle) = started().await;

		let conn1 = Arc::clone(&connection);
		let conn2 = Arc::clone(&connection);
		let fut1 = tokio::spawn(async move { conn1.send_message(None, "Runtime.evaluate", json!({"expression": "1"})).await });
		tokio::time::sleep(Duration::from_millis(10)).await;
		let fut2 = tokio::spawn(async move { conn2.send_message(None, "Runtime.evaluate", json!({"expression": "2"})).await });
		tokio::time::sleep(Duration::from_millis(10)).await;

		controller.inject_response(1, json!({"v": 2}));
		controller.inject_response(0, json!({"v": 1}));

		assert_eq!(fut1.await.unwrap().unwrap()["v"], 1);
		assert_eq!(fut2.await.unwrap().unwrap()["v"], 2);
	}

	#[tokio::test]
	async fn protocol_errors_are_mapped() {
		let (connection, controller, _handle) = started().await;

		let fut = connection.send_message(None, "Target.closeTarget", json!({"targetId": "T9"}));
		controller.inject_error(0, -32602, "No target with given id found");
		let err = fut.await.unwrap_err();
		assert!(matches!(err, Error::TargetClosed(_)));
		assert!(err.is_disposed());
	}

	#[tokio::test]
	async fn events_reach_subscribers() {
		let (connection, controller, _handle) = started().await;
		let mut events = connection.subscribe();

		controller.inject_event(Some("S1"), "Page.lifecycleEvent", json!({"frameId": "F1", "name": "load"}));

		let event = tokio::time::timeout(Duration::from_secs(1), events.recv()).await.unwrap().unwrap();
		assert_eq!(event.method, "Page.lifecycleEvent");
		assert_eq!(event.session_id.as_deref(), Some("S1"));
	}

	#[tokio::test]
	async fn pending_requests_fail_when_transport_closes() {
		let (connection, controller, handle) = started().await;

		let conn = Arc::clone(&connection);
		let pending = tokio::spawn(async move { conn.send_message(None, "Browser.getVersion", json!({})).await });
		tokio::time::sleep(Duration::from_millis(10)).await;

		controller.disconnect();
		handle.await.unwrap();

		assert!(matches!(pending.await.unwrap(), Err(Error::ChannelClosed)));
		assert!(connection.is_closed());
		assert!(matches!(
			connection.send_message(None, "Browser.getVersion", json!({})).await,
			Err(Error::ChannelClosed)
		));
	}

	#[test]
	fn unknown_response_id_is_an_error() {
		let (parts, _controller) = FakeTransportBuilder::new().build();
		let connection = Connection::new(parts);
		let message: CdpMessage = serde_json::from_value(json!({"id": 999, "result": {}})).unwrap();
		match connection.dispatch(message).unwrap_err() {
			Error::ProtocolError(msg) => assert!(msg.contains("Cannot find request")),
			other => panic!("expected ProtocolError, got {other:?}"),
		}
	}
}
