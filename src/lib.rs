//! Provisions a WARP identity and renders it as a WireGuard tunnel config and a
//! `wireguard://` proxy URI, plus the CORS relay the browser client talks to.
//!
//! ```text
//! identity ─┐
//!           ├─> register ─> synth ─> { tunnel config, proxy config }
//! keys ─────┘
//!     (both network calls go through the relay)
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod keys;
pub mod provision;
pub mod register;
pub mod relay;
pub mod synth;
pub mod types;

pub use config::{ClientConfig, RelayConfig};
pub use error::{ProvisionError, Result};
pub use provision::Provisioner;
pub use types::{AccountRecord, ArtifactKind, ConfigArtifact, Identity, KeyPair, ProvisionedConfig, ReservedField};
