//! Pairing service seam.

use crate::error::DeviceError;
use async_trait::async_trait;

/// The platform operations the device core depends on for provisioning.
///
/// Implementations usually wrap an HTTP client against the platform's
/// pairing API; the HTTP plumbing itself does not belong to the device core.
/// Of the two operations only [`exchange_csr`](Self::exchange_csr) is called
/// by the core (during certificate provisioning); registration happens
/// before a device is ever built and is exposed here so one implementation
/// covers the whole pairing surface.
#[async_trait]
pub trait PairingService: Send + Sync {
    /// Register the device with the platform, trading a registration JWT
    /// for the credentials secret used by later pairing calls.
    async fn register_device(&self, device_id: &str, jwt: &str) -> Result<String, DeviceError>;

    /// Exchange a CSR (PEM) for an issued certificate.
    ///
    /// The returned string may be PEM or bare base64 DER; the device layer
    /// normalizes it before storing.
    async fn exchange_csr(&self, csr_pem: &str) -> Result<String, DeviceError>;
}
