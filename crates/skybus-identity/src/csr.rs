//! Certificate signing request construction.

use crate::error::IdentityError;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

/// Build a PEM CSR for `realm`/`device_id`, signed with the device key.
///
/// The subject is `O=Devices, CN=<realm>/<device id>`; the platform reads
/// realm and device id back out of the CN when issuing the certificate, so
/// the exact format matters. The CSR is never persisted, it is rebuilt from
/// the stored key whenever provisioning runs.
pub fn generate_csr(key: &KeyPair, realm: &str, device_id: &str) -> Result<String, IdentityError> {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "Devices");
    dn.push(DnType::CommonName, format!("{realm}/{device_id}"));
    params.distinguished_name = dn;
    let request = params.serialize_request(key)?;
    Ok(request.pem()?)
}
