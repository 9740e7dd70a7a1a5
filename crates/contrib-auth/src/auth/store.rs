/*
[INPUT]:  Session values and a storage location
[OUTPUT]: Durable session slots surviving restarts
[POS]:    Auth layer - session persistence boundary
[UPDATE]: When slot layout or file format changes
*/

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::auth::Session;
use crate::http::{ContribError, Result};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const WALLET_ADDRESS_KEY: &str = "wallet_address";

/// Raw persisted slots, keyed by slot name
pub type SessionSlots = BTreeMap<String, String>;

/// Durable key-value storage for the three session slots.
///
/// Implementations are synchronous so that a write completes inside the same
/// task step as the in-memory update that follows it. Writes run while the
/// authenticator holds its state lock and block the calling worker thread,
/// so implementations should be small local writes, never network calls.
pub trait SessionStore: Send + Sync + Debug {
    fn read_slots(&self) -> Result<SessionSlots>;

    fn write_slots(&self, slots: &SessionSlots) -> Result<()>;

    /// Load the persisted session; incomplete slots are treated as absent
    fn load(&self) -> Result<Option<Session>> {
        Ok(session_from_slots(&self.read_slots()?))
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.write_slots(&slots_from_session(session))
    }

    fn clear(&self) -> Result<()> {
        self.write_slots(&SessionSlots::new())
    }
}

pub fn session_from_slots(slots: &SessionSlots) -> Option<Session> {
    let wallet_address = slots.get(WALLET_ADDRESS_KEY)?;
    let access_token = slots.get(ACCESS_TOKEN_KEY)?;
    let refresh_token = slots.get(REFRESH_TOKEN_KEY)?;
    Session::new(
        wallet_address.as_str(),
        access_token.as_str(),
        refresh_token.as_str(),
    )
}

pub fn slots_from_session(session: &Session) -> SessionSlots {
    SessionSlots::from([
        (ACCESS_TOKEN_KEY.to_string(), session.access_token.clone()),
        (REFRESH_TOKEN_KEY.to_string(), session.refresh_token.clone()),
        (WALLET_ADDRESS_KEY.to_string(), session.wallet_address.clone()),
    ])
}

/// Process-lifetime store, mostly for tests and ephemeral clients
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: Mutex<SessionSlots>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a session
    pub fn with_session(session: &Session) -> Self {
        Self {
            slots: Mutex::new(slots_from_session(session)),
        }
    }

    /// Overwrite one slot directly, bypassing session validation
    pub fn set_slot(&self, key: &str, value: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(key.to_string(), value.to_string());
    }
}

impl SessionStore for MemorySessionStore {
    fn read_slots(&self) -> Result<SessionSlots> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slots.clone())
    }

    fn write_slots(&self, slots: &SessionSlots) -> Result<()> {
        let mut guard = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        *guard = slots.clone();
        Ok(())
    }
}

/// JSON file store, owner read/write only
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn read_slots(&self) -> Result<SessionSlots> {
        if !self.path.exists() {
            return Ok(SessionSlots::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SessionSlots::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ContribError::Config(format!(
                "Corrupt session file {}: {e}",
                self.path.display()
            ))
        })
    }

    fn write_slots(&self, slots: &SessionSlots) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let encoded = serde_json::to_string_pretty(slots)?;
        let tmp_path = self.path.with_extension("tmp");
        write_private(&tmp_path, encoded.as_bytes())?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}

/// Create `path` owner-only from the first byte, replacing any stale file
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => return Err(err),
        _ => {}
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
