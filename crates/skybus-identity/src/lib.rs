//! Device identity and certificate provisioning.
//!
//! Everything a device needs to prove who it is: a stable device id derived
//! from hardware, a private key generated once and kept in the credential
//! store, a CSR built from that key for the platform to sign, and decoding
//! of the certificate the platform hands back. The issued key and certificate
//! become the transport's TLS client material.
//!
//! Provisioning is deliberately dumb about transport: exchanging the CSR for
//! a certificate is the caller's job (usually over the platform's pairing
//! API), this crate only produces and stores the artifacts.

pub mod certificate;
pub mod csr;
pub mod device_id;
pub mod error;
pub mod store;

pub use certificate::{certificate_to_pem, import_certificate};
pub use csr::generate_csr;
pub use device_id::derive_device_id;
pub use error::IdentityError;
pub use store::CryptoStore;
