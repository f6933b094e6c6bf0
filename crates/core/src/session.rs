//! Stored-session persistence.
//!
//! A session file is the JSON form of [`SessionState`]: a `cookies` array
//! in DevTools shape plus a flat `localStorage` map.

use std::path::Path;

use async_trait::async_trait;
use komodo_protocol::SessionState;
use tracing::debug;

use crate::error::{Error, Result};

/// Loads and saves stored sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
	/// `Ok(None)` when nothing is stored at `path`.
	async fn load(&self, path: &Path) -> Result<Option<SessionState>>;

	async fn save(&self, path: &Path, state: &SessionState) -> Result<()>;
}

/// Pretty-printed JSON files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSessionStore;

#[async_trait]
impl SessionStore for JsonSessionStore {
	async fn load(&self, path: &Path) -> Result<Option<SessionState>> {
		let content = match tokio::fs::read_to_string(path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => {
				return Err(Error::Session {
					path: path.to_path_buf(),
					message: e.to_string(),
				});
			}
		};
		let state: SessionState = serde_json::from_str(&content).map_err(|e| Error::Session {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;
		debug!(
			target = "komodo.session",
			path = %path.display(),
			cookies = state.cookies.len(),
			local_storage = state.local_storage.len(),
			"session read"
		);
		Ok(Some(state))
	}

	async fn save(&self, path: &Path, state: &SessionState) -> Result<()> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await?;
		}
		let json = serde_json::to_string_pretty(state)?;
		tokio::fs::write(path, json).await?;
		debug!(target = "komodo.session", path = %path.display(), cookies = state.cookies.len(), "session written");
		Ok(())
	}
}
