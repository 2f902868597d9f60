//! On-disk credential store.

use crate::error::IdentityError;
use rcgen::KeyPair;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const KEY_FILE: &str = "device.key";
const CERT_FILE: &str = "device.crt";

/// Directory-backed store for the device key pair and its certificate.
///
/// The private key is a P-256 pair generated on first use and persisted as
/// `device.key`; every later open reuses it, so the device keeps one identity
/// across restarts. The key never leaves the store except as signing input
/// for CSR construction and as TLS client material. The issued certificate
/// lives next to it as `device.crt`.
#[derive(Debug, Clone)]
pub struct CryptoStore {
    dir: PathBuf,
}

impl CryptoStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, IdentityError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    fn certificate_path(&self) -> PathBuf {
        self.dir.join(CERT_FILE)
    }

    /// Load the device key, generating and persisting a fresh pair on first
    /// use.
    pub fn device_key(&self) -> Result<KeyPair, IdentityError> {
        let path = self.key_path();
        if path.exists() {
            let pem = fs::read_to_string(&path)?;
            let key = KeyPair::from_pem(&pem)?;
            debug!(path = %path.display(), "loaded device key");
            return Ok(key);
        }
        let key = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
        fs::write(&path, key.serialize_pem())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        info!(path = %path.display(), "generated new device key");
        Ok(key)
    }

    /// PEM of the device key, generating the pair on first use.
    pub fn device_key_pem(&self) -> Result<String, IdentityError> {
        Ok(self.device_key()?.serialize_pem())
    }

    /// Whether an issued certificate is stored.
    pub fn has_certificate(&self) -> bool {
        self.certificate_path().exists()
    }

    /// Persist the issued certificate PEM.
    pub fn store_certificate(&self, pem: &str) -> Result<(), IdentityError> {
        let path = self.certificate_path();
        fs::write(&path, pem)?;
        info!(path = %path.display(), "stored device certificate");
        Ok(())
    }

    /// Stored certificate PEM, if any.
    pub fn certificate_pem(&self) -> Result<Option<String>, IdentityError> {
        let path = self.certificate_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// Drop the stored certificate so the next provisioning starts clean.
    ///
    /// The private key is kept; a new CSR signed with the same key is enough
    /// to obtain a fresh certificate.
    pub fn clear_certificate(&self) -> Result<(), IdentityError> {
        let path = self.certificate_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
