use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Installs the global subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `-v` enables info and `-vv` debug
/// for the komodo targets.
pub fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "komodo=warn",
		1 => "komodo=info",
		_ => "komodo=debug",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

	let _ = fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).try_init();
}
