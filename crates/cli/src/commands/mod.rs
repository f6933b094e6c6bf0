mod activate;
mod countries;
mod login;

use std::path::PathBuf;

use anyhow::{Context, Result};
use komodo::KomodoConfig;
use tracing::debug;

use crate::cli::{Cli, Commands};

pub async fn dispatch(cli: Cli) -> Result<()> {
	match cli.command {
		Commands::Countries => {
			countries::execute();
			Ok(())
		}
		Commands::Activate {
			ref country,
			wait_code,
			json,
		} => {
			let config = resolve_config(&cli)?;
			activate::execute(config, country, wait_code, json).await
		}
		Commands::Login { wait } => {
			let config = resolve_config(&cli)?.with_headless(false);
			login::execute(config, wait).await
		}
	}
}

/// `~/.config/komodo/config.json` (platform equivalent).
fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("komodo").join("config.json"))
}

/// Loads the config file, then applies command-line overrides.
fn resolve_config(cli: &Cli) -> Result<KomodoConfig> {
	let mut config = match cli.config.clone().or_else(default_config_path) {
		Some(path) => {
			debug!(target = "komodo", path = %path.display(), "loading config");
			KomodoConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
		}
		None => KomodoConfig::default(),
	};

	if let Some(session) = &cli.session {
		config = config.with_session_path(session);
	}
	if let Some(dir) = &cli.capture_dir {
		config = config.with_capture_dir(dir);
	}
	if cli.headful {
		config = config.with_headless(false);
	}
	if cli.cdp_endpoint.is_some() {
		config = config.with_cdp_endpoint(cli.cdp_endpoint.clone());
	}
	config.validate()?;
	Ok(config)
}

#[cfg(test)]
mod tests {
	use clap::Parser;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn flags_override_config_file() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("config.json");
		std::fs::write(&path, r#"{ "sessionPath": "from-file.json", "captureDir": "shots" }"#).unwrap();

		let cli = Cli::try_parse_from([
			"komodo",
			"--config",
			path.to_str().unwrap(),
			"--session",
			"from-flag.json",
			"--headful",
			"countries",
		])
		.unwrap();
		let config = resolve_config(&cli).unwrap();

		assert_eq!(config.session_path, PathBuf::from("from-flag.json"));
		assert_eq!(config.capture_dir, PathBuf::from("shots"));
		assert!(!config.headless);
	}

	#[test]
	fn invalid_config_file_is_reported() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("config.json");
		std::fs::write(&path, r#"{ "origin": "ftp://example.com" }"#).unwrap();

		let cli = Cli::try_parse_from(["komodo", "--config", path.to_str().unwrap(), "countries"]).unwrap();
		assert!(resolve_config(&cli).is_err());
	}
}
