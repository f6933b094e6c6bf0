//! komodo - disposable-number activation over a driven browser
//!
//! [`Komodo`] launches (or attaches to) a Chromium browser, restores a
//! stored login session, and runs the activation flow for a country: open
//! the service, pick the messaging channel and country, press activate,
//! then race the "no numbers" markers against the phone-number panel.
//! A successful activation starts an [`SmsListener`] that watches the page
//! for the verification message in the background.
//!
//! Progress is reported on an unbounded [`Event`] channel returned by
//! [`Komodo::new`]; business outcomes come back as [`ActivationResult`]
//! values and only genuine failures as [`Error`].
//!
//! ```ignore
//! let (komodo, mut events) = Komodo::new(KomodoConfig::default());
//! komodo.init().await?;
//! let result = komodo.activate_country("Kenya").await?;
//! while let Some(event) = events.recv().await {
//!     if let Event::Code(text) = event { println!("{text}"); break; }
//! }
//! komodo.stop().await;
//! ```

pub mod capture;
pub mod config;
pub mod controller;
pub mod country;
pub mod driver;
pub mod error;
pub mod events;
pub mod listener;
pub mod session;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use capture::CaptureKind;
pub use config::{DEFAULT_ORIGIN, KomodoConfig, LaunchConfig, Timings};
pub use controller::Komodo;
pub use country::{CountryCatalog, CountrySelector, DEFAULT_COUNTRIES};
pub use driver::{AutomationDriver, ChromiumLauncher, DriverLauncher, PageDriver, Selector};
pub use error::{Error, Result};
pub use events::{Event, EventEmitter};
pub use komodo_protocol::{Cookie, SessionState, WaitUntil};
pub use komodo_runtime::{Error as DriverError, Result as DriverResult};
pub use listener::{SmsListener, classify_code};
pub use session::{JsonSessionStore, SessionStore};
pub use workflow::{ActivationResult, extract_phone_number};
