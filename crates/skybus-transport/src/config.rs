//! Transport connection configuration.

use crate::error::TransportError;
use std::time::Duration;
use url::Url;

/// Where and how a session connects.
///
/// Built once by the device layer and owned by the session; each link is
/// created from the configuration current at that moment, so refreshed TLS
/// material applies from the next link onwards.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    broker_url: Url,
    realm: String,
    device_id: String,
    keep_alive: Duration,
    username: Option<String>,
    password: Option<String>,
    client_certificate_pem: Option<String>,
    private_key_pem: Option<String>,
    ca_certificate_pem: Option<String>,
}

impl ConnectionConfig {
    /// Parse the broker endpoint and bind it to a realm and device id.
    ///
    /// Accepted schemes are `mqtt` (plain TCP, default port 1883) and
    /// `mqtts` (TLS, default port 8883).
    pub fn new(
        broker_url: &str,
        realm: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let url = Url::parse(broker_url)
            .map_err(|err| TransportError::Endpoint(format!("{broker_url}: {err}")))?;
        match url.scheme() {
            "mqtt" | "mqtts" => {}
            other => {
                return Err(TransportError::Endpoint(format!(
                    "unsupported scheme {other:?}, expected mqtt or mqtts"
                )));
            }
        }
        if url.host_str().is_none() {
            return Err(TransportError::Endpoint(format!(
                "{broker_url}: missing host"
            )));
        }
        Ok(Self {
            broker_url: url,
            realm: realm.into(),
            device_id: device_id.into(),
            keep_alive: Duration::from_secs(60),
            username: None,
            password: None,
            client_certificate_pem: None,
            private_key_pem: None,
            ca_certificate_pem: None,
        })
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Username/password pair for brokers that use password auth.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Mutual-TLS client material: certificate chain and private key, both PEM.
    pub fn with_client_tls(
        mut self,
        certificate_pem: impl Into<String>,
        key_pem: impl Into<String>,
    ) -> Self {
        self.set_client_tls(certificate_pem, key_pem);
        self
    }

    /// Replace the mutual-TLS client material in place.
    pub fn set_client_tls(
        &mut self,
        certificate_pem: impl Into<String>,
        key_pem: impl Into<String>,
    ) {
        self.client_certificate_pem = Some(certificate_pem.into());
        self.private_key_pem = Some(key_pem.into());
    }

    /// CA bundle (PEM) trusted instead of the system roots.
    pub fn with_ca_certificate(mut self, ca_pem: impl Into<String>) -> Self {
        self.ca_certificate_pem = Some(ca_pem.into());
        self
    }

    pub fn broker_url(&self) -> &Url {
        &self.broker_url
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn client_certificate_pem(&self) -> Option<&str> {
        self.client_certificate_pem.as_deref()
    }

    pub fn private_key_pem(&self) -> Option<&str> {
        self.private_key_pem.as_deref()
    }

    pub fn ca_certificate_pem(&self) -> Option<&str> {
        self.ca_certificate_pem.as_deref()
    }

    pub fn is_tls(&self) -> bool {
        self.broker_url.scheme() == "mqtts"
    }

    /// Root of every topic this device touches: `<realm>/<device id>`.
    pub fn client_id(&self) -> String {
        format!("{}/{}", self.realm, self.device_id)
    }

    /// Host and port, falling back to the scheme's default port.
    pub fn host_port(&self) -> (String, u16) {
        let host = self.broker_url.host_str().unwrap_or_default().to_string();
        let default_port = if self.is_tls() { 8883 } else { 1883 };
        (host, self.broker_url.port().unwrap_or(default_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_is_realm_slash_device() {
        let config = ConnectionConfig::new("mqtt://broker.local", "acme", "dev-1").unwrap();
        assert_eq!(config.client_id(), "acme/dev-1");
    }

    #[test]
    fn default_ports_follow_the_scheme() {
        let plain = ConnectionConfig::new("mqtt://broker.local", "r", "d").unwrap();
        assert_eq!(plain.host_port(), ("broker.local".to_string(), 1883));
        assert!(!plain.is_tls());

        let tls = ConnectionConfig::new("mqtts://broker.local", "r", "d").unwrap();
        assert_eq!(tls.host_port(), ("broker.local".to_string(), 8883));
        assert!(tls.is_tls());

        let custom = ConnectionConfig::new("mqtts://broker.local:18883", "r", "d").unwrap();
        assert_eq!(custom.host_port().1, 18883);
    }

    #[test]
    fn non_mqtt_schemes_are_rejected() {
        let err = ConnectionConfig::new("http://broker.local", "r", "d").unwrap_err();
        assert!(matches!(err, TransportError::Endpoint(_)));
        let err = ConnectionConfig::new("not a url", "r", "d").unwrap_err();
        assert!(matches!(err, TransportError::Endpoint(_)));
    }

    #[test]
    fn tls_material_can_be_swapped_in_place() {
        let mut config = ConnectionConfig::new("mqtts://broker.local", "r", "d").unwrap();
        assert!(config.client_certificate_pem().is_none());
        config.set_client_tls("CERT", "KEY");
        assert_eq!(config.client_certificate_pem(), Some("CERT"));
        assert_eq!(config.private_key_pem(), Some("KEY"));
    }
}
