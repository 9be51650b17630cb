//! Persisted secret state
//!
//! Four 32-bit generator seeds plus the token signing secret. Generated once
//! on first boot, written to a JSON file, and reloaded unchanged on every
//! later start so issued tokens and per-session tunings survive restarts.
//!
//! # File format
//!
//! ```json
//! {"seeds":[123,456,789,1011],"jwtSecret":"<base64 of 256 random bytes>"}
//! ```
//!
//! # Operational caveat
//!
//! If the file cannot be written, the process can keep running on the freshly
//! generated in-memory state, but a restart will produce new seeds: every
//! previously issued token stops verifying and every session's target tuning
//! changes. [`load_or_create`] reports this through [`StateOrigin::Ephemeral`]
//! so the caller can log it or refuse to start.

use std::fmt;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{Error, Result};

/// Number of random bytes behind the signing secret
const SIGNING_SECRET_BYTES: usize = 256;

/// Process-wide secret material
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretState {
    /// Seeds mixed into every oracle generator state
    pub seeds: [u32; 4],

    /// HMAC key for session tokens (base64 text, used as raw UTF-8 bytes)
    #[serde(rename = "jwtSecret")]
    pub signing_secret: String,
}

/// Where the secret state in use came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOrigin {
    /// Read from an existing state file
    Loaded,
    /// Freshly generated and written to disk
    Created,
    /// Freshly generated but the write failed; lost on restart
    Ephemeral,
}

impl SecretState {
    /// Generate new secret state from the OS random source
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let seeds = [
            rng.next_u32(),
            rng.next_u32(),
            rng.next_u32(),
            rng.next_u32(),
        ];

        let mut secret = vec![0u8; SIGNING_SECRET_BYTES];
        rng.fill_bytes(&mut secret);

        Self {
            seeds,
            signing_secret: STANDARD.encode(secret),
        }
    }

    /// Key bytes used for token signatures
    pub fn signing_key(&self) -> &[u8] {
        self.signing_secret.as_bytes()
    }

    /// Read secret state from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let state: SecretState = serde_json::from_str(&content)?;
        if state.signing_secret.is_empty() {
            return Err(Error::Config(format!(
                "Empty signing secret in {}",
                path.display()
            )));
        }
        Ok(state)
    }

    /// Write secret state to a JSON file (temp file + rename)
    pub fn persist(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, json)
            .map_err(|e| Error::Persist(format!("{}: {}", tmp_path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| Error::Persist(format!("{}: {}", tmp_path.display(), e)))?;
        }

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Error::Persist(format!("{}: {}", path.display(), e))
        })
    }
}

impl fmt::Debug for SecretState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretState")
            .field("seeds", &"[redacted]")
            .field("signing_secret", &"[redacted]")
            .finish()
    }
}

/// Load the secret state file, or generate and persist a new one
///
/// A missing or unparsable file is replaced with fresh state. When the write
/// fails, `strict` decides between returning [`Error::Persist`] and carrying
/// on with [`StateOrigin::Ephemeral`] state.
pub fn load_or_create(path: &Path, strict: bool) -> Result<(SecretState, StateOrigin)> {
    match SecretState::load(path) {
        Ok(state) => {
            info!("Loaded secret state from {}", path.display());
            return Ok((state, StateOrigin::Loaded));
        }
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No secret state at {}, generating", path.display());
        }
        Err(e) => {
            warn!(
                "Secret state at {} unreadable ({}), generating replacement",
                path.display(),
                e
            );
        }
    }

    let state = SecretState::generate();
    match state.persist(path) {
        Ok(()) => {
            info!("Wrote new secret state to {}", path.display());
            Ok((state, StateOrigin::Created))
        }
        Err(e) if strict => Err(e),
        Err(e) => {
            error!(
                "Failed to persist secret state ({}); tokens and tunings will reset on restart",
                e
            );
            Ok((state, StateOrigin::Ephemeral))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_produces_long_secret() {
        let state = SecretState::generate();
        let raw = STANDARD.decode(&state.signing_secret).unwrap();
        assert_eq!(raw.len(), SIGNING_SECRET_BYTES);
        assert_ne!(SecretState::generate(), state);
    }

    #[test]
    fn test_json_shape_uses_jwt_secret_key() {
        let state = SecretState {
            seeds: [1, 2, 3, 4],
            signing_secret: "abc".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"seeds":[1,2,3,4],"jwtSecret":"abc"}"#);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let state = SecretState {
            seeds: [11, 22, 33, 44],
            signing_secret: "super-secret".to_string(),
        };
        let debug = format!("{:?}", state);
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("33"));
    }

    #[test]
    fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let state = SecretState::generate();

        state.persist(&path).unwrap();
        assert!(!dir.path().join("state.json.tmp").exists());
        assert_eq!(SecretState::load(&path).unwrap(), state);
    }

    #[cfg(unix)]
    #[test]
    fn test_persisted_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        SecretState::generate().persist(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_rejects_empty_secret() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"seeds":[1,2,3,4],"jwtSecret":""}"#).unwrap();
        assert!(matches!(SecretState::load(&path), Err(Error::Config(_))));
    }
}
