//! Session-scoped page operations.
//!
//! Every method issues commands on the page's flattened DevTools session.
//! Waits are bounded; `wait_for_selector` reports absence as `Ok(false)`
//! so callers can race several conditions without treating a timeout as a
//! failure.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use komodo_protocol::{Cookie, EvaluateResult, LifecycleEvent, ScreenshotOptions, WaitUntil};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::selector::Selector;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A browser tab with an attached session.
#[derive(Clone)]
pub struct Page {
	connection: Arc<Connection>,
	target_id: String,
	session_id: String,
	main_frame_id: String,
}

impl Page {
	pub(crate) async fn attach(connection: Arc<Connection>, target_id: String, session_id: String) -> Result<Self> {
		for method in ["Page.enable", "Runtime.enable", "Network.enable"] {
			connection.send_message(Some(&session_id), method, json!({})).await?;
		}
		connection
			.send_message(Some(&session_id), "Page.setLifecycleEventsEnabled", json!({ "enabled": true }))
			.await?;

		let tree = connection.send_message(Some(&session_id), "Page.getFrameTree", json!({})).await?;
		let main_frame_id = tree["frameTree"]["frame"]["id"]
			.as_str()
			.ok_or_else(|| Error::ProtocolError("Page.getFrameTree returned no main frame".into()))?
			.to_string();

		debug!(target = "komodo.cdp", %target_id, %session_id, "page attached");
		Ok(Self {
			connection,
			target_id,
			session_id,
			main_frame_id,
		})
	}

	async fn send(&self, method: &str, params: Value) -> Result<Value> {
		self.connection.send_message(Some(&self.session_id), method, params).await
	}

	/// Navigates the main frame and waits for the `wait_until` lifecycle event.
	pub async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> Result<()> {
		let mut events = self.connection.subscribe();
		let navigated = self.send("Page.navigate", json!({ "url": url })).await?;

		if let Some(error_text) = navigated["errorText"].as_str().filter(|t| !t.is_empty()) {
			return Err(Error::ProtocolError(format!("navigation to {url} failed: {error_text}")));
		}
		let loader_id = navigated["loaderId"].as_str().map(str::to_string);
		let wanted = wait_until.lifecycle_name();

		let waiting = async {
			loop {
				let event = match events.recv().await {
					Ok(event) => event,
					Err(RecvError::Lagged(skipped)) => {
						trace!(target = "komodo.cdp", skipped, "lifecycle subscriber lagged");
						continue;
					}
					Err(RecvError::Closed) => return Err(Error::ChannelClosed),
				};
				if event.method != "Page.lifecycleEvent" || event.session_id.as_deref() != Some(self.session_id.as_str()) {
					continue;
				}
				let Ok(lifecycle) = serde_json::from_value::<LifecycleEvent>(event.params) else {
					continue;
				};
				let same_load = match (&loader_id, &lifecycle.loader_id) {
					(Some(expected), Some(actual)) => expected == actual,
					_ => true,
				};
				if lifecycle.frame_id == self.main_frame_id && lifecycle.name == wanted && same_load {
					return Ok(());
				}
			}
		};

		tokio::time::timeout(timeout, waiting)
			.await
			.map_err(|_| Error::Timeout(format!("navigation to {url} did not reach {wanted} within {}ms", timeout.as_millis())))?
	}

	/// Evaluates `expression` and returns its JSON value.
	pub async fn evaluate(&self, expression: &str) -> Result<Value> {
		let raw = self
			.send(
				"Runtime.evaluate",
				json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": true,
					"userGesture": true,
				}),
			)
			.await?;
		let evaluated: EvaluateResult = serde_json::from_value(raw)?;
		if let Some(details) = evaluated.exception_details {
			return Err(Error::Evaluation(details.message()));
		}
		Ok(evaluated.result.value.unwrap_or(Value::Null))
	}

	/// Calls `function_declaration` with JSON-serialized `args`.
	pub async fn call_function(&self, function_declaration: &str, args: &[Value]) -> Result<Value> {
		let args = args.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
		self.evaluate(&format!("({function_declaration})({args})")).await
	}

	/// Polls until `selector` matches or `timeout` elapses.
	///
	/// Returns `Ok(false)` on timeout, including when a poll itself gets no
	/// answer before the deadline (a page blocked by a dialog, say).
	/// Evaluation failures during a poll (for instance while a navigation
	/// swaps the execution context) are retried; only a closed target is
	/// reported as an error.
	pub async fn wait_for_selector(&self, selector: &Selector, timeout: Duration) -> Result<bool> {
		let deadline = Instant::now() + timeout;
		let expression = selector.exists_expression();
		loop {
			let Ok(polled) = tokio::time::timeout_at(deadline, self.evaluate(&expression)).await else {
				debug!(target = "komodo.cdp", %selector, "selector poll unanswered at deadline");
				return Ok(false);
			};
			match polled {
				Ok(Value::Bool(true)) => return Ok(true),
				Ok(_) => {}
				Err(e) if e.is_disposed() => return Err(e),
				Err(e) => trace!(target = "komodo.cdp", %selector, error = %e, "selector poll failed"),
			}
			if Instant::now() >= deadline {
				return Ok(false);
			}
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	}

	/// Clicks the centre of the element matching `selector`.
	pub async fn click(&self, selector: &Selector) -> Result<()> {
		let center = self.evaluate(&selector.center_expression()).await?;
		let (Some(x), Some(y)) = (center["x"].as_f64(), center["y"].as_f64()) else {
			return Err(Error::ElementNotFound(selector.to_string()));
		};

		self.send("Input.dispatchMouseEvent", json!({ "type": "mouseMoved", "x": x, "y": y }))
			.await?;
		for kind in ["mousePressed", "mouseReleased"] {
			self.send(
				"Input.dispatchMouseEvent",
				json!({ "type": kind, "x": x, "y": y, "button": "left", "clickCount": 1 }),
			)
			.await?;
		}
		Ok(())
	}

	/// Captures a PNG screenshot into `path`, creating parent directories.
	pub async fn screenshot(&self, path: &Path, options: ScreenshotOptions) -> Result<()> {
		let captured = self
			.send(
				"Page.captureScreenshot",
				json!({ "format": "png", "captureBeyondViewport": options.full_page }),
			)
			.await?;
		let data = captured["data"]
			.as_str()
			.ok_or_else(|| Error::ProtocolError("Page.captureScreenshot returned no data".into()))?;
		let bytes = STANDARD
			.decode(data)
			.map_err(|e| Error::ProtocolError(format!("invalid screenshot payload: {e}")))?;

		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(path, bytes).await?;
		Ok(())
	}

	pub async fn set_cookie(&self, cookie: &Cookie) -> Result<()> {
		let mut params = serde_json::to_value(cookie)?;
		if cookie.is_session() {
			if let Some(map) = params.as_object_mut() {
				map.remove("expires");
			}
		}
		let result = self.send("Network.setCookie", params).await?;
		if result["success"] == Value::Bool(false) {
			return Err(Error::ProtocolError(format!("browser rejected cookie {}", cookie.name)));
		}
		Ok(())
	}

	/// Returns every cookie visible to the browser.
	pub async fn cookies(&self) -> Result<Vec<Cookie>> {
		let result = self.send("Network.getAllCookies", json!({})).await?;
		Ok(serde_json::from_value(result["cookies"].clone())?)
	}

	pub async fn close(&self) -> Result<()> {
		self.connection
			.send_message(None, "Target.closeTarget", json!({ "targetId": self.target_id }))
			.await
			.map(|_| ())
	}
}

impl std::fmt::Debug for Page {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Page")
			.field("target_id", &self.target_id)
			.field("session_id", &self.session_id)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::connection::spawn_loop;
	use crate::fake_transport::{FakeTransportBuilder, FakeTransportController};

	fn page_over_fake() -> (Page, FakeTransportController) {
		let (parts, controller) = FakeTransportBuilder::new().build();
		let connection = Arc::new(Connection::new(parts));
		spawn_loop(&connection);
		let page = Page {
			connection,
			target_id: "T1".into(),
			session_id: "S1".into(),
			main_frame_id: "F1".into(),
		};
		(page, controller)
	}

	async fn settle() {
		tokio::time::sleep(Duration::from_millis(10)).await;
	}

	#[tokio::test]
	async fn evaluate_returns_value_by_value() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.evaluate("1 + 1").await });
		settle().await;
		controller.inject_response(0, json!({ "result": { "type": "number", "value": 2 } }));
		assert_eq!(fut.await.unwrap().unwrap(), json!(2));

		let sent = controller.take_sent();
		assert_eq!(sent[0]["sessionId"], "S1");
		assert_eq!(sent[0]["params"]["returnByValue"], true);
	}

	#[tokio::test]
	async fn evaluate_surfaces_exceptions() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.evaluate("boom()").await });
		settle().await;
		controller.inject_response(
			0,
			json!({
				"result": { "type": "object", "subtype": "error" },
				"exceptionDetails": { "text": "Uncaught", "exception": { "type": "object", "description": "ReferenceError: boom is not defined" } }
			}),
		);
		match fut.await.unwrap().unwrap_err() {
			Error::Evaluation(msg) => assert!(msg.contains("boom is not defined")),
			other => panic!("expected Evaluation, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn call_function_serializes_arguments() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.call_function("(s) => Object.keys(s).length", &[json!({"a": "1"})]).await });
		settle().await;
		let sent = controller.take_sent();
		assert_eq!(sent[0]["params"]["expression"], r#"((s) => Object.keys(s).length)({"a":"1"})"#);
		controller.inject_response(0, json!({ "result": { "type": "number", "value": 1 } }));
		assert_eq!(fut.await.unwrap().unwrap(), json!(1));
	}

	#[tokio::test]
	async fn goto_waits_for_matching_lifecycle_event() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.goto("https://a.example", WaitUntil::Load, Duration::from_secs(5)).await });
		settle().await;
		controller.inject_response(0, json!({ "frameId": "F1", "loaderId": "L2" }));
		settle().await;

		controller.inject_event(Some("S1"), "Page.lifecycleEvent", json!({ "frameId": "F1", "loaderId": "L1", "name": "load" }));
		controller.inject_event(Some("S2"), "Page.lifecycleEvent", json!({ "frameId": "F1", "loaderId": "L2", "name": "load" }));
		controller.inject_event(Some("S1"), "Page.lifecycleEvent", json!({ "frameId": "F1", "loaderId": "L2", "name": "DOMContentLoaded" }));
		settle().await;
		assert!(!fut.is_finished());

		controller.inject_event(Some("S1"), "Page.lifecycleEvent", json!({ "frameId": "F1", "loaderId": "L2", "name": "load" }));
		fut.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn goto_reports_navigation_error_text() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.goto("https://bad.example", WaitUntil::Load, Duration::from_secs(5)).await });
		settle().await;
		controller.inject_response(0, json!({ "frameId": "F1", "errorText": "net::ERR_NAME_NOT_RESOLVED" }));
		let err = fut.await.unwrap().unwrap_err();
		assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
	}

	#[tokio::test]
	async fn click_without_match_is_element_not_found() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.click(&Selector::text("Activate")).await });
		settle().await;
		controller.inject_response(0, json!({ "result": { "type": "object", "subtype": "null", "value": null } }));
		match fut.await.unwrap().unwrap_err() {
			Error::ElementNotFound(sel) => assert_eq!(sel, "text/Activate"),
			other => panic!("expected ElementNotFound, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn click_dispatches_press_and_release_at_center() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.click(&Selector::css("button")).await });
		settle().await;
		controller.inject_response(0, json!({ "result": { "type": "object", "value": { "x": 10.0, "y": 20.0 } } }));
		for id in 1..=3 {
			settle().await;
			controller.inject_response(id, json!({}));
		}
		fut.await.unwrap().unwrap();

		let sent = controller.take_sent();
		let kinds: Vec<_> = sent[1..].iter().map(|m| m["params"]["type"].as_str().unwrap().to_string()).collect();
		assert_eq!(kinds, vec!["mouseMoved", "mousePressed", "mouseReleased"]);
		assert_eq!(sent[2]["params"]["x"], 10.0);
	}

	#[tokio::test]
	async fn set_cookie_drops_session_expiry() {
		let (page, controller) = page_over_fake();
		let mut cookie = Cookie::new("sid", "abc").with_domain(".example.com");
		cookie.expires = Some(-1.0);
		let fut = tokio::spawn(async move { page.set_cookie(&cookie).await });
		settle().await;
		let sent = controller.take_sent();
		assert_eq!(sent[0]["method"], "Network.setCookie");
		assert!(sent[0]["params"].get("expires").is_none());
		controller.inject_response(0, json!({ "success": true }));
		fut.await.unwrap().unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn wait_for_selector_is_bounded_when_unanswered() {
		let (page, controller) = page_over_fake();
		let started = Instant::now();

		let found = page.wait_for_selector(&Selector::css(".modal"), Duration::from_millis(500)).await.unwrap();

		assert!(!found);
		assert!(started.elapsed() < Duration::from_secs(1));
		assert_eq!(controller.take_sent().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn wait_for_selector_polls_until_match() {
		let (page, controller) = page_over_fake();
		let fut = tokio::spawn(async move { page.wait_for_selector(&Selector::css(".ok"), Duration::from_secs(5)).await });
		settle().await;
		controller.inject_response(0, json!({ "result": { "type": "boolean", "value": false } }));
		tokio::time::sleep(POLL_INTERVAL + Duration::from_millis(10)).await;
		controller.inject_response(1, json!({ "result": { "type": "boolean", "value": true } }));
		assert!(fut.await.unwrap().unwrap());
	}

	#[tokio::test]
	async fn screenshot_writes_decoded_png() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("nested").join("shot.png");
		let (page, controller) = page_over_fake();
		let target = path.clone();
		let fut = tokio::spawn(async move { page.screenshot(&target, ScreenshotOptions { full_page: true }).await });
		settle().await;
		assert_eq!(controller.take_sent()[0]["params"]["captureBeyondViewport"], true);
		controller.inject_response(0, json!({ "data": STANDARD.encode(b"\x89PNG") }));
		fut.await.unwrap().unwrap();
		assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
	}
}
