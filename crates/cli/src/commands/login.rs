//! `komodo login`: manual sign-in followed by a session save.

use std::time::Duration;

use anyhow::Result;
use komodo::{Komodo, KomodoConfig};
use tracing::info;

pub async fn execute(config: KomodoConfig, wait_secs: u64) -> Result<()> {
	let session_path = config.session_path.clone();
	let (komodo, _events) = Komodo::new(config);

	let outcome = async {
		komodo.init().await?;
		komodo.open_origin().await?;

		println!("Browser opened at: {}", komodo.config().origin);
		println!();
		println!("Sign in, then press Enter to save the session.");
		println!("(Or wait {wait_secs} seconds for auto-save)");

		let enter = tokio::task::spawn_blocking(|| {
			let mut input = String::new();
			std::io::stdin().read_line(&mut input).ok();
		});
		tokio::select! {
			_ = enter => println!("Saving session..."),
			_ = tokio::time::sleep(Duration::from_secs(wait_secs)) => println!("\nTimeout reached, saving session..."),
			_ = tokio::signal::ctrl_c() => println!("\nInterrupted, saving session..."),
		}

		let state = komodo.save_session().await?;
		info!(target = "komodo", path = %session_path.display(), cookies = state.cookies.len(), "session saved");
		println!(
			"Saved {} cookies and {} localStorage entries to {}",
			state.cookies.len(),
			state.local_storage.len(),
			session_path.display()
		);
		anyhow::Ok(())
	}
	.await;

	komodo.stop().await;
	outcome
}
