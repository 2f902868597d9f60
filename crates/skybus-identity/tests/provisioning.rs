//! Provisioning round trips against a real on-disk store.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use skybus_identity::{certificate_to_pem, generate_csr, import_certificate, CryptoStore};

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

#[test]
fn device_key_is_generated_once_and_reused() {
    let dir = tempfile::tempdir().unwrap();
    let store = CryptoStore::open(dir.path()).unwrap();

    let first = store.device_key().unwrap().serialize_pem();
    assert!(dir.path().join("device.key").exists());
    assert!(first.contains("BEGIN PRIVATE KEY"));

    let second = store.device_key().unwrap().serialize_pem();
    assert_eq!(first, second);

    // A reopened store sees the same key.
    let reopened = CryptoStore::open(dir.path()).unwrap();
    assert_eq!(reopened.device_key().unwrap().serialize_pem(), first);
}

#[test]
fn csr_carries_the_expected_subject() {
    let dir = tempfile::tempdir().unwrap();
    let store = CryptoStore::open(dir.path()).unwrap();
    let key = store.device_key().unwrap();

    let pem = generate_csr(&key, "test-realm", "29400a5e-79a5-4e0a-9e02-a34ad2af3e2d").unwrap();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
    for line in pem.lines() {
        assert!(line.len() <= 64, "PEM line too long: {line}");
    }

    // The subject strings are ASCII and appear verbatim in the DER.
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = BASE64.decode(body.as_bytes()).unwrap();
    assert!(contains(&der, b"Devices"));
    assert!(contains(
        &der,
        b"test-realm/29400a5e-79a5-4e0a-9e02-a34ad2af3e2d"
    ));
}

#[test]
fn csr_is_rebuilt_from_the_stored_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = CryptoStore::open(dir.path()).unwrap();
    let key = store.device_key().unwrap();

    // Signatures are randomized, so byte equality is not expected; both
    // requests must still parse and carry the same subject.
    let first = generate_csr(&key, "realm", "device").unwrap();
    let second = generate_csr(&key, "realm", "device").unwrap();
    for pem in [&first, &second] {
        let body: String = pem
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .collect();
        let der = BASE64.decode(body.as_bytes()).unwrap();
        assert!(contains(&der, b"realm/device"));
    }
}

#[test]
fn certificate_imports_from_pem_and_from_bare_base64() {
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let cert = rcgen::CertificateParams::default().self_signed(&key).unwrap();

    let from_pem = import_certificate(&cert.pem()).unwrap();
    assert_eq!(from_pem.as_ref(), cert.der().as_ref());

    let bare = BASE64.encode(cert.der());
    let from_bare = import_certificate(&bare).unwrap();
    assert_eq!(from_bare.as_ref(), cert.der().as_ref());

    // Issuers wrap base64 at 64 columns; whitespace must not matter.
    let wrapped: String = bare
        .as_bytes()
        .chunks(64)
        .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
        .collect();
    let from_wrapped = import_certificate(&wrapped).unwrap();
    assert_eq!(from_wrapped.as_ref(), cert.der().as_ref());
}

#[test]
fn pem_armor_round_trips() {
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let cert = rcgen::CertificateParams::default().self_signed(&key).unwrap();

    let pem = certificate_to_pem(cert.der());
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
    assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
    for line in pem.lines() {
        assert!(line.len() <= 64, "PEM line too long: {line}");
    }

    let reimported = import_certificate(&pem).unwrap();
    assert_eq!(reimported.as_ref(), cert.der().as_ref());
}

#[test]
fn stored_certificate_survives_reopen_and_clears() {
    let dir = tempfile::tempdir().unwrap();
    let store = CryptoStore::open(dir.path()).unwrap();
    assert!(!store.has_certificate());
    assert_eq!(store.certificate_pem().unwrap(), None);

    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let cert = rcgen::CertificateParams::default().self_signed(&key).unwrap();
    store.store_certificate(&cert.pem()).unwrap();
    assert!(store.has_certificate());

    let reopened = CryptoStore::open(dir.path()).unwrap();
    assert_eq!(reopened.certificate_pem().unwrap(), Some(cert.pem()));

    store.clear_certificate().unwrap();
    assert!(!store.has_certificate());
    store.clear_certificate().unwrap();
}
