// src/synth.rs
//! Pure transformation of a registered account into client configuration text.
//!
//! Nothing here performs I/O. The tunnel config layout is parsed structurally
//! by tunnel clients, so line order and field names are fixed.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{ProvisionError, Result};
use crate::types::{AccountRecord, ArtifactKind, ConfigArtifact, ProvisionedConfig, ReservedField};

pub const ENDPOINT: &str = "engage.cloudflareclient.com:2408";
pub const DNS_SERVERS: &str = "1.1.1.1, 1.0.0.1, 2606:4700:4700::1111, 2606:4700:4700::1001";
pub const TUNNEL_MTU: u16 = 1280;
pub const PROXY_MTU: u16 = 1420;
pub const PROXY_FRAGMENT: &str = "V2ray-Config";
const RESERVED_SEPARATOR: &str = "%2C";

/// Characters left unescaped by a URI component encoder.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// Lenient like a browser `atob`: padding optional, non-zero trailing bits accepted.
const CLIENT_ID_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

pub fn synthesize_tunnel_config(
    private_key: &str,
    peer_public_key: &str,
    v4: &str,
    v6: &str,
) -> String {
    format!(
        "[Interface]\n\
         PrivateKey = {private_key}\n\
         Address = {v4}/32, {v6}/128\n\
         DNS = {DNS_SERVERS}\n\
         MTU = {TUNNEL_MTU}\n\
         \n\
         [Peer]\n\
         PublicKey = {peer_public_key}\n\
         AllowedIPs = 0.0.0.0/0, ::/0\n\
         Endpoint = {ENDPOINT}\n"
    )
}

/// Builds the `wireguard://` connection string.
///
/// `reserved` is inserted as-is: its separators are already the literal text
/// `%2C` and must not be escaped a second time.
pub fn synthesize_proxy_uri(
    private_key: &str,
    peer_public_key: &str,
    v4: &str,
    v6: &str,
    reserved: &ReservedField,
) -> String {
    format!(
        "wireguard://{key}@{ENDPOINT}?address={a4},{a6}&reserved={reserved}&publickey={peer}&mtu={PROXY_MTU}#{PROXY_FRAGMENT}",
        key = encode_component(private_key),
        a4 = encode_component(&format!("{v4}/32")),
        a6 = encode_component(&format!("{v6}/128")),
        peer = encode_component(peer_public_key),
    )
}

pub fn derive_reserved(client_id: &str) -> Result<ReservedField> {
    let bytes = CLIENT_ID_B64
        .decode(client_id.trim())
        .map_err(|e| ProvisionError::MalformedInput(format!("client_id: {e}")))?;
    if bytes.len() < 3 {
        return Err(ProvisionError::MalformedInput(format!(
            "client_id decodes to {} bytes, need 3",
            bytes.len()
        )));
    }
    let joined = bytes[..3]
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(RESERVED_SEPARATOR);
    Ok(ReservedField(joined))
}

/// Derives the reserved field, then renders both artifacts.
pub fn synthesize(record: &AccountRecord, private_key: &str) -> Result<ProvisionedConfig> {
    let reserved = derive_reserved(record.client_id())?;
    let peer = record.peer_public_key().ok_or_else(|| {
        ProvisionError::MalformedResponse("missing config.peers[0].public_key".into())
    })?;

    let tunnel = synthesize_tunnel_config(private_key, peer, record.v4(), record.v6());
    let proxy = synthesize_proxy_uri(private_key, peer, record.v4(), record.v6(), &reserved);

    Ok(ProvisionedConfig {
        tunnel: ConfigArtifact::new(ArtifactKind::Tunnel, tunnel),
        proxy: ConfigArtifact::new(ArtifactKind::Proxy, proxy),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::parse_account;
    use base64::engine::general_purpose::STANDARD as B64;
    use serde_json::json;

    fn record(client_id: &str) -> AccountRecord {
        let v = json!({
            "config": {
                "client_id": client_id,
                "interface": { "addresses": { "v4": "172.16.0.2", "v6": "2606:4700::2" } },
                "peers": [{ "public_key": "PEER_PUB" }]
            }
        });
        parse_account(&serde_json::to_vec(&v).unwrap()).unwrap()
    }

    fn query_param<'a>(uri: &'a str, name: &str) -> &'a str {
        let query = uri.split_once('?').unwrap().1.split('#').next().unwrap();
        query
            .split('&')
            .find_map(|kv| kv.strip_prefix(&format!("{name}=")))
            .unwrap()
    }

    #[test]
    fn tunnel_config_exact_text() {
        let text = synthesize_tunnel_config("PRIVKEY_Y", "PEER_PUB", "172.16.0.2", "2606:4700::2");
        let expected = "[Interface]
PrivateKey = PRIVKEY_Y
Address = 172.16.0.2/32, 2606:4700::2/128
DNS = 1.1.1.1, 1.0.0.1, 2606:4700:4700::1111, 2606:4700:4700::1001
MTU = 1280

[Peer]
PublicKey = PEER_PUB
AllowedIPs = 0.0.0.0/0, ::/0
Endpoint = engage.cloudflareclient.com:2408
";
        assert_eq!(text, expected);
        assert_eq!(
            text,
            synthesize_tunnel_config("PRIVKEY_Y", "PEER_PUB", "172.16.0.2", "2606:4700::2")
        );
    }

    #[test]
    fn reserved_from_first_three_bytes() {
        let id = B64.encode([10u8, 20, 30, 40, 50]);
        assert_eq!(derive_reserved(&id).unwrap().as_str(), "10%2C20%2C30");
        assert_eq!(derive_reserved(&id).unwrap(), derive_reserved(&id).unwrap());
    }

    #[test]
    fn reserved_accepts_unpadded_ids() {
        let padded = B64.encode([200u8, 1, 2, 3]);
        let unpadded = padded.trim_end_matches('=');
        assert_eq!(derive_reserved(unpadded).unwrap().as_str(), "200%2C1%2C2");
    }

    #[test]
    fn reserved_accepts_non_canonical_trailing_bits() {
        // "KB==" carries set bits past the last whole byte.
        assert_eq!(derive_reserved("ChQeKB==").unwrap().as_str(), "10%2C20%2C30");
    }

    #[test]
    fn reserved_rejects_short_ids() {
        let id = B64.encode([1u8, 2]);
        assert!(matches!(
            derive_reserved(&id),
            Err(ProvisionError::MalformedInput(_))
        ));
        assert!(matches!(
            derive_reserved("!!!"),
            Err(ProvisionError::MalformedInput(_))
        ));
    }

    #[test]
    fn proxy_uri_encoding() {
        let reserved = derive_reserved(&B64.encode([10u8, 20, 30])).unwrap();
        let uri = synthesize_proxy_uri("a+b/c=", "PEER_PUB", "172.16.0.2", "2606:4700::2", &reserved);
        assert_eq!(
            uri,
            "wireguard://a%2Bb%2Fc%3D@engage.cloudflareclient.com:2408\
             ?address=172.16.0.2%2F32,2606%3A4700%3A%3A2%2F128\
             &reserved=10%2C20%2C30&publickey=PEER_PUB&mtu=1420#V2ray-Config"
        );
    }

    #[test]
    fn proxy_uri_params_decode_back() {
        let reserved = derive_reserved(&B64.encode([1u8, 2, 3])).unwrap();
        let peer = "bmNg+/x7Q1p3VdW4=";
        let uri = synthesize_proxy_uri("k", peer, "10.0.0.1", "fd01::1", &reserved);

        let decode = |s: &str| percent_encoding::percent_decode_str(s).decode_utf8().unwrap().into_owned();
        let address = query_param(&uri, "address");
        let (a4, a6) = address.split_once(',').unwrap();
        assert_eq!(decode(a4), "10.0.0.1/32");
        assert_eq!(decode(a6), "fd01::1/128");
        assert_eq!(decode(query_param(&uri, "publickey")), peer);
    }

    #[test]
    fn component_set_keeps_unreserved_marks() {
        assert_eq!(encode_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_component("a b,c"), "a%20b%2Cc");
    }

    #[test]
    fn synthesize_builds_both_artifacts() {
        let id = B64.encode([10u8, 20, 30, 99]);
        let out = synthesize(&record(&id), "PRIVKEY_Y").unwrap();
        assert_eq!(out.tunnel.kind(), ArtifactKind::Tunnel);
        assert!(out.proxy.text().contains("reserved=10%2C20%2C30"));
        assert!(out.proxy.text().contains("address=172.16.0.2%2F32,2606%3A4700%3A%3A2%2F128"));
    }

    #[test]
    fn synthesize_rejects_record_without_peers() {
        let mut rec = record(&B64.encode([10u8, 20, 30]));
        rec.config.peers.clear();
        assert!(matches!(
            synthesize(&rec, "k"),
            Err(ProvisionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn synthesize_propagates_short_client_id() {
        let rec = record(&B64.encode([7u8]));
        assert!(matches!(
            synthesize(&rec, "k"),
            Err(ProvisionError::MalformedInput(_))
        ));
    }
}
