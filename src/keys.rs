// src/keys.rs
use regex::Regex;
use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::types::KeyPair;

pub const PUBLIC_KEY_FIELD: &str = "PublicKey";
pub const PRIVATE_KEY_FIELD: &str = "PrivateKey";

/// Finds the first `<field>: <value>` occurrence and returns the trimmed value.
/// A value that trims to nothing counts as absent.
pub fn extract_key(text: &str, field: &str) -> Option<String> {
    let re = Regex::new(&format!(r"{}:\s(.+)", regex::escape(field))).ok()?;
    let value = re.captures(text)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

/// Parses the key endpoint body. Fails fast if either key is missing.
pub fn parse_key_response(text: &str) -> Result<KeyPair> {
    let field = |name: &str| {
        extract_key(text, name)
            .ok_or_else(|| ProvisionError::MalformedResponse(format!("missing {name}")))
    };
    Ok(KeyPair {
        public_key: field(PUBLIC_KEY_FIELD)?,
        private_key: field(PRIVATE_KEY_FIELD)?,
    })
}

pub async fn acquire_key_pair(client: &reqwest::Client, url: &str) -> Result<KeyPair> {
    let res = client
        .get(url)
        .send()
        .await
        .map_err(ProvisionError::transport)?;

    let status = res.status();
    if !status.is_success() {
        return Err(ProvisionError::UpstreamUnavailable(format!(
            "key endpoint returned {status}"
        )));
    }

    let body = res.text().await.map_err(ProvisionError::transport)?;
    let pair = parse_key_response(&body)?;
    debug!(public_key = %pair.public_key, "acquired key pair");
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "PrivateKey: cHJpdmF0ZQ==  \nPublicKey: cHVibGlj\n";

    #[test]
    fn extracts_both_keys_trimmed() {
        let pair = parse_key_response(BODY).unwrap();
        assert_eq!(pair.public_key, "cHVibGlj");
        assert_eq!(pair.private_key, "cHJpdmF0ZQ==");
    }

    #[test]
    fn first_match_wins() {
        let text = "PublicKey: first\nPublicKey: second\n";
        assert_eq!(extract_key(text, "PublicKey").as_deref(), Some("first"));
    }

    #[test]
    fn missing_field_is_none() {
        assert_eq!(extract_key("nothing here", "PublicKey"), None);
        assert_eq!(extract_key("PublicKey:", "PublicKey"), None);
    }

    #[test]
    fn whitespace_only_value_is_none() {
        assert_eq!(extract_key("PublicKey:    \n", "PublicKey"), None);
    }

    #[test]
    fn missing_private_key_fails_fast() {
        let err = parse_key_response("PublicKey: abc\n").unwrap_err();
        assert_eq!(
            err,
            ProvisionError::MalformedResponse("missing PrivateKey".into())
        );
    }
}
