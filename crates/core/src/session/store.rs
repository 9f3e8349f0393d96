//! Session token persistence.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::token::Session;
use crate::error::{Error, Result};

const STORE_SCHEMA_VERSION: u32 = 1;

/// Persistence for the single session token, so it survives restarts.
pub trait TokenStore: Send + Sync {
	/// Returns the stored session, `None` when nothing is stored.
	fn load(&self) -> Result<Option<Session>>;

	/// Replaces the stored session.
	fn save(&self, session: &Session) -> Result<()>;

	/// Removes the stored session. Returns whether anything was removed.
	fn clear(&self) -> Result<bool>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
	schema_version: u32,
	#[serde(flatten)]
	session: Session,
}

/// JSON file backed token store.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
	path: PathBuf,
}

impl FileTokenStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl TokenStore for FileTokenStore {
	fn load(&self) -> Result<Option<Session>> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err.into()),
		};
		let stored: StoredSession =
			serde_json::from_str(&content).map_err(|e| Error::Store(format!("corrupt session file {}: {e}", self.path.display())))?;
		if stored.schema_version != STORE_SCHEMA_VERSION {
			return Err(Error::Store(format!(
				"unsupported session file schema {} in {}",
				stored.schema_version,
				self.path.display()
			)));
		}
		Ok(Some(stored.session))
	}

	fn save(&self, session: &Session) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}
		let stored = StoredSession {
			schema_version: STORE_SCHEMA_VERSION,
			session: session.clone(),
		};
		fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
		Ok(())
	}

	fn clear(&self) -> Result<bool> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}
}

/// In-memory token store; the session lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
	session: Mutex<Option<Session>>,
}

impl MemoryTokenStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session(session: Session) -> Self {
		Self {
			session: Mutex::new(Some(session)),
		}
	}
}

impl TokenStore for MemoryTokenStore {
	fn load(&self) -> Result<Option<Session>> {
		Ok(self.session.lock().clone())
	}

	fn save(&self, session: &Session) -> Result<()> {
		*self.session.lock() = Some(session.clone());
		Ok(())
	}

	fn clear(&self) -> Result<bool> {
		Ok(self.session.lock().take().is_some())
	}
}
