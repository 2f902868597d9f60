//! Identity and credential errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Certificate input was neither valid PEM nor valid base64 DER.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),
    /// Key generation, key parsing or CSR construction failed.
    #[error("key material error: {0}")]
    KeyMaterial(#[from] rcgen::Error),
    /// Reading or writing the credential directory failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
