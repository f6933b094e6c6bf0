//! Message transports between the connection and the browser endpoint.
//!
//! A transport is split into a sending half (owned by the connection and
//! called per request) and a receiving half (run once as a background task
//! that forwards parsed JSON into an unbounded channel).

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Sending half of a transport.
pub trait Transport: Send {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport, consumed by its read loop.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Everything a [`Connection`](crate::connection::Connection) needs from a transport.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport to a DevTools browser endpoint.
pub struct WebSocketTransport {
	sink: SplitSink<WsStream, Message>,
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl WebSocketTransport {
	/// Opens a WebSocket to `url` (normally `webSocketDebuggerUrl`).
	pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
		let (ws, _) = tokio_tungstenite::connect_async(url)
			.await
			.map_err(|e| Error::Transport(format!("failed to connect to {url}: {e}")))?;
		debug!(target = "komodo.cdp", %url, "websocket connected");
		let (sink, stream) = ws.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		Ok((Self { sink, stream, message_tx }, message_rx))
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		TransportParts {
			sender: Box::new(WebSocketTransportSender { sink: self.sink }),
			receiver: Box::new(WebSocketTransportReceiver {
				stream: self.stream,
				message_tx: self.message_tx,
			}),
			message_rx,
		}
	}
}

struct WebSocketTransportSender {
	sink: SplitSink<WsStream, Message>,
}

impl Transport for WebSocketTransportSender {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink.send(Message::Text(text)).await.map_err(|e| Error::Transport(e.to_string()))
		})
	}
}

struct WebSocketTransportReceiver {
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl TransportReceiver for WebSocketTransportReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(frame) = self.stream.next().await {
				let text = match frame.map_err(|e| Error::Transport(e.to_string()))? {
					Message::Text(text) => text,
					Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
					Message::Close(_) => break,
					_ => continue,
				};

				match serde_json::from_str::<Value>(&text) {
					Ok(value) => {
						if self.message_tx.send(value).is_err() {
							break;
						}
					}
					Err(e) => warn!(target = "komodo.cdp", error = %e, "dropping unparsable frame"),
				}
			}
			debug!(target = "komodo.cdp", "websocket stream ended");
			Ok(())
		})
	}
}
