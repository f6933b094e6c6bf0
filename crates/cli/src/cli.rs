use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "komodo")]
#[command(about = "Activate disposable numbers and wait for verification codes")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Configuration file (JSON); defaults to the user config directory
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Stored session to restore (cookies, localStorage)
	#[arg(long, global = true, value_name = "FILE")]
	pub session: Option<PathBuf>,

	/// Show the browser window
	#[arg(long, global = true)]
	pub headful: bool,

	/// Directory for diagnostic screenshots
	#[arg(long, global = true, value_name = "DIR")]
	pub capture_dir: Option<PathBuf>,

	/// Attach to a running browser instead of launching one
	#[arg(long, global = true, value_name = "WS_URL")]
	pub cdp_endpoint: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List the country catalog with its indices
	Countries,

	/// Activate a number for a country and wait for the code
	#[command(alias = "act")]
	Activate {
		/// Catalog index or literal country label
		country: String,
		/// Seconds to wait for the verification code after activation
		#[arg(long, default_value = "300", value_name = "SECS")]
		wait_code: u64,
		/// Print the outcome as JSON
		#[arg(long)]
		json: bool,
	},

	/// Open the service for manual sign-in, then save the session
	Login {
		/// Seconds to wait before saving (Enter saves early)
		#[arg(long, default_value = "120", value_name = "SECS")]
		wait: u64,
	},
}
