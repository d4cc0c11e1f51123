// Persisted credential — one well-known file standing in for the browser's
// local storage slot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::auth::provider::Credential;
use crate::config::CREDENTIAL_STORAGE_KEY;

pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    /// Create the state directory if needed and bind to the credential file
    /// inside it.
    pub fn new(state_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(state_dir)?;
        Ok(Self {
            path: state_dir.join(CREDENTIAL_STORAGE_KEY),
        })
    }

    /// Read the persisted credential. Missing or empty files read as absent.
    pub fn load(&self) -> Option<Credential> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }
        Some(Credential::new(token))
    }

    pub fn store(&self, credential: &Credential) -> io::Result<()> {
        fs::write(&self.path, credential.token())
    }

    /// Remove the persisted credential. Already-absent is not an error.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
