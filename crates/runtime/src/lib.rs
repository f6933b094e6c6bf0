//! komodo runtime - Chromium lifecycle and DevTools protocol driver
//!
//! This crate provides the browser-facing half of komodo:
//!
//! - **Discovery**: Locating a Chromium-family executable
//! - **Launch**: Spawning it with remote debugging and probing `/json/version`
//! - **Transport**: WebSocket framing of JSON messages
//! - **Connection**: JSON-RPC request/response correlation and event fan-out
//! - **Browser / Page**: Target management and the page operations the
//!   activation workflow consumes (navigate, wait, click, evaluate,
//!   screenshot, cookies)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  komodo-rs  │  Workflow, listener, controller
//! └──────┬──────┘
//!        │ adapts Browser/Page to its driver traits
//! ┌──────▼──────┐
//! │   runtime   │  This crate
//! │  ┌────────┐ │
//! │  │ Page   │ │  Session-scoped commands
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Conn   │ │  JSON-RPC correlation
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Trans  │ │  WebSocket transport
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod browser;
pub mod connection;
pub mod error;
pub mod finder;
pub mod launcher;
pub mod page;
pub mod probe;
pub mod process;
pub mod selector;
pub mod transport;

#[cfg(test)]
mod fake_transport;

/// Default timeout in milliseconds for navigation and other bounded driver calls.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub use browser::{Browser, LaunchOptions};
pub use connection::Connection;
pub use error::{Error, Result};
pub use page::Page;
pub use probe::CdpVersionInfo;
pub use selector::Selector;
pub use transport::{Transport, TransportParts, TransportReceiver, WebSocketTransport};
