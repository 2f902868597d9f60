//! rumqttc-backed link.

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::link::{LinkFactory, TransportLink};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use rustls::{ClientConfig, RootCertStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Default factory: real MQTT links.
#[derive(Debug, Clone, Default)]
pub struct MqttLinkFactory;

impl LinkFactory for MqttLinkFactory {
    fn create(&self, config: &ConnectionConfig) -> Box<dyn TransportLink> {
        Box::new(MqttLink::new(config.clone()))
    }
}

/// A single MQTT connection.
///
/// `connect` drives the event loop by hand until the broker answers, then
/// hands it to a background task that keeps the connection alive and flips
/// the shared connected flag when it drops.
pub struct MqttLink {
    config: ConnectionConfig,
    client: Option<AsyncClient>,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    poll_task: Option<JoinHandle<()>>,
}

impl MqttLink {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            closing: Arc::new(AtomicBool::new(false)),
            poll_task: None,
        }
    }
}

#[async_trait]
impl TransportLink for MqttLink {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let options = build_options(&self.config)?;
        let (client, mut eventloop) = AsyncClient::new(options, 64);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        debug!(
                            session_present = ack.session_present,
                            "broker accepted connection"
                        );
                        break;
                    }
                    return Err(TransportError::ConnectionRefused(ack.code));
                }
                Ok(_) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        self.connected.store(true, Ordering::SeqCst);
        self.closing.store(false, Ordering::SeqCst);
        let connected = self.connected.clone();
        let closing = self.closing.clone();
        self.poll_task = Some(tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        info!("broker closed the connection");
                        connected.store(false, Ordering::SeqCst);
                        break;
                    }
                    Ok(event) => trace!(?event, "mqtt event"),
                    Err(err) => {
                        if closing.load(Ordering::SeqCst) {
                            debug!("event loop stopped after local disconnect");
                        } else {
                            warn!(error = %err, "mqtt connection lost");
                        }
                        connected.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        }));
        self.client = Some(client);
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        client.publish(topic, qos, retain, payload).await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.closing.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if let Some(client) = self.client.take() {
            // The request channel is gone when the connection already died;
            // either way this link is finished.
            if let Err(err) = client.disconnect().await {
                debug!(error = %err, "disconnect on a dead connection");
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for MqttLink {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

fn build_options(config: &ConnectionConfig) -> Result<MqttOptions, TransportError> {
    let (host, port) = config.host_port();
    let mut options = MqttOptions::new(config.client_id(), host, port);
    options.set_keep_alive(config.keep_alive());
    options.set_clean_session(true);
    if let (Some(username), Some(password)) = (config.username(), config.password()) {
        options.set_credentials(username, password);
    }
    if config.is_tls() {
        let tls = build_tls(config)?;
        options.set_transport(Transport::Tls(TlsConfiguration::Rustls(Arc::new(tls))));
    }
    Ok(options)
}

/// Assemble the rustls client configuration.
///
/// Roots come from the configured CA bundle when present, otherwise from the
/// platform store. Client material turns on mutual TLS; without it the
/// connection is server-authenticated only.
fn build_tls(config: &ConnectionConfig) -> Result<ClientConfig, TransportError> {
    let mut roots = RootCertStore::empty();
    match config.ca_certificate_pem() {
        Some(pem) => {
            let mut reader = pem.as_bytes();
            for cert in rustls_pemfile::certs(&mut reader) {
                let cert = cert
                    .map_err(|err| TransportError::Tls(format!("bad CA certificate: {err}")))?;
                roots
                    .add(cert)
                    .map_err(|err| TransportError::Tls(err.to_string()))?;
            }
        }
        None => {
            let native = rustls_native_certs::load_native_certs()
                .map_err(|err| TransportError::Tls(format!("native roots: {err}")))?;
            for cert in native {
                // Platform stores sometimes carry entries rustls rejects.
                if let Err(err) = roots.add(cert) {
                    debug!(error = %err, "skipping unusable native root");
                }
            }
        }
    }
    if roots.is_empty() {
        return Err(TransportError::Tls("no usable root certificates".to_string()));
    }

    let builder = ClientConfig::builder().with_root_certificates(roots);
    let tls = match (config.client_certificate_pem(), config.private_key_pem()) {
        (Some(cert_pem), Some(key_pem)) => {
            let mut reader = cert_pem.as_bytes();
            let certs = rustls_pemfile::certs(&mut reader)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| TransportError::Tls(format!("bad client certificate: {err}")))?;
            let mut reader = key_pem.as_bytes();
            let key = rustls_pemfile::private_key(&mut reader)
                .map_err(|err| TransportError::Tls(format!("bad private key: {err}")))?
                .ok_or_else(|| TransportError::Tls("no private key in PEM".to_string()))?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|err| TransportError::Tls(err.to_string()))?
        }
        _ => builder.with_no_client_auth(),
    };
    Ok(tls)
}
