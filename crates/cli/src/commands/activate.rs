//! `komodo activate`: one activation, then wait for the code.

use std::time::Duration;

use anyhow::Result;
use komodo::{ActivationResult, CountrySelector, Event, Komodo, KomodoConfig};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::info;

pub async fn execute(config: KomodoConfig, country: &str, wait_code: u64, json: bool) -> Result<()> {
	let selector: CountrySelector = country.parse()?;
	let (komodo, mut events) = Komodo::new(config);

	let outcome = run(&komodo, &mut events, selector, wait_code, json).await;
	komodo.stop().await;
	print_pending(&mut events);
	outcome
}

async fn run(komodo: &Komodo, events: &mut UnboundedReceiver<Event>, selector: CountrySelector, wait_code: u64, json: bool) -> Result<()> {
	komodo.init().await?;
	print_pending(events);

	info!(target = "komodo", country = %selector, "activating");
	let result = komodo.activate_country(selector).await;
	print_pending(events);
	let result = result?;

	if json {
		println!("{}", serde_json::to_string(&result)?);
	} else {
		println!("{result}");
	}

	if let ActivationResult::Active { .. } = result {
		match wait_for_code(events, Duration::from_secs(wait_code)).await {
			Some(code) => info!(target = "komodo", %code, "code received"),
			None => println!("no code within {wait_code}s"),
		}
	}
	Ok(())
}

/// Prints events until a code arrives, the deadline passes, or Ctrl-C.
async fn wait_for_code(events: &mut UnboundedReceiver<Event>, wait: Duration) -> Option<String> {
	let deadline = Instant::now() + wait;
	loop {
		tokio::select! {
			event = events.recv() => {
				let event = event?;
				println!("{event}");
				if let Event::Code(code) = event {
					return Some(code);
				}
			}
			_ = tokio::time::sleep_until(deadline) => return None,
			_ = tokio::signal::ctrl_c() => {
				println!("interrupted");
				return None;
			}
		}
	}
}

fn print_pending(events: &mut UnboundedReceiver<Event>) {
	while let Ok(event) = events.try_recv() {
		println!("{event}");
	}
}
