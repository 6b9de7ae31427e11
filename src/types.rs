// src/types.rs
use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const MODEL: &str = "PC";
pub const LOCALE: &str = "de_DE";

/// One-time key material handed out by the key endpoint. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"[redacted]")
            .finish()
    }
}

/// Synthetic client identifiers, generated fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub install_id: String,
    pub fcm_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegistrationRequest {
    pub key: String,
    pub install_id: String,
    pub fcm_token: String,
    pub tos: String,
    pub model: String,
    pub serial_number: String,
    pub locale: String,
}

impl RegistrationRequest {
    /// Builds the payload, stamping `tos` with the current time.
    pub fn new(public_key: &str, install_id: &str, fcm_token: &str) -> Self {
        Self {
            key: public_key.to_owned(),
            install_id: install_id.to_owned(),
            fcm_token: fcm_token.to_owned(),
            tos: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            model: MODEL.to_owned(),
            serial_number: install_id.to_owned(),
            locale: LOCALE.to_owned(),
        }
    }
}

// ---------- REGISTRATION RESPONSE ---------- //

#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub config: AccountConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub client_id: String,
    pub interface: InterfaceConfig,
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig {
    pub addresses: Addresses,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Addresses {
    pub v4: String,
    pub v6: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    pub public_key: String,
}

impl AccountRecord {
    pub fn v4(&self) -> &str {
        &self.config.interface.addresses.v4
    }

    pub fn v6(&self) -> &str {
        &self.config.interface.addresses.v6
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Public key of the first peer. Additional peers are ignored.
    pub fn peer_public_key(&self) -> Option<&str> {
        self.config.peers.first().map(|p| p.public_key.as_str())
    }
}

// ---------- ARTIFACTS ---------- //

/// Three byte values of the client id, pre-joined with a literal `%2C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedField(pub(crate) String);

impl ReservedField {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Tunnel,
    Proxy,
}

impl ArtifactKind {
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::Tunnel => "tunnel config",
            ArtifactKind::Proxy => "proxy config",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifact {
    kind: ArtifactKind,
    text: String,
}

impl ConfigArtifact {
    pub(crate) fn new(kind: ArtifactKind, text: String) -> Self {
        Self { kind, text }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Only the tunnel config is offered as a file.
    pub fn file_name(&self) -> Option<&'static str> {
        match self.kind {
            ArtifactKind::Tunnel => Some("wireguard.conf"),
            ArtifactKind::Proxy => None,
        }
    }
}

/// Both artifacts of one successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedConfig {
    pub tunnel: ConfigArtifact,
    pub proxy: ConfigArtifact,
}
