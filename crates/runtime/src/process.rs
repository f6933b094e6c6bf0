//! Local port helpers for remote-debugging launches.

use std::net::TcpListener;

/// Asks the OS for an unused localhost port.
///
/// The port is released before returning, so a racing process could claim
/// it; launch retries surface that as a probe failure.
pub fn free_port() -> std::io::Result<u16> {
	let listener = TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}
