//! Wire and persistence types for the komodo browser driver.
//!
//! This crate contains the serde-serializable types exchanged with Chromium
//! over the DevTools protocol and the on-disk session format restored at
//! startup. These types represent the "protocol layer" - the shapes of data
//! as they appear on the wire or on disk.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with the wire: Field names follow the DevTools protocol and the
//!   `session.json` layout written by browser tooling
//! * Stable: Changes only when the wire or file format changes
//!
//! Driver behavior is built on top of these types in `komodo-runtime`.

pub mod cdp;
pub mod cookie;
pub mod options;
pub mod storage;

pub use cdp::*;
pub use cookie::*;
pub use options::*;
pub use storage::*;
