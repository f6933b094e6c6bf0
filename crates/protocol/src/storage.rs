//! Persisted browser session: cookies plus origin `localStorage` entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cookie::Cookie;

/// On-disk session layout.
///
/// ```json
/// { "cookies": [ { "name": "sid", "value": "..." } ], "localStorage": { "token": "..." } }
/// ```
///
/// Either field may be absent and defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
	#[serde(default)]
	pub cookies: Vec<Cookie>,
	#[serde(default, rename = "localStorage")]
	pub local_storage: BTreeMap<String, String>,
}

impl SessionState {
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty() && self.local_storage.is_empty()
	}
}
