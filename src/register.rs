// src/register.rs
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};

use crate::error::{ProvisionError, Result};
use crate::types::{AccountRecord, RegistrationRequest};

pub const CLIENT_USER_AGENT: &str = "okhttp/3.12.1";
pub const CLIENT_VERSION: &str = "a-6.10-2158";

fn registration_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    headers.insert("CF-Client-Version", HeaderValue::from_static(CLIENT_VERSION));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

pub async fn register(
    client: &reqwest::Client,
    url: &str,
    public_key: &str,
    install_id: &str,
    fcm_token: &str,
) -> Result<AccountRecord> {
    let req = RegistrationRequest::new(public_key, install_id, fcm_token);
    let body = serde_json::to_vec(&req)
        .map_err(|e| ProvisionError::MalformedInput(e.to_string()))?;

    let res = client
        .post(url)
        .headers(registration_headers())
        .body(body)
        .send()
        .await
        .map_err(ProvisionError::transport)?;

    let status = res.status();
    if !status.is_success() {
        warn!("registration rejected: {status}");
        return Err(ProvisionError::RegistrationRejected(status.as_u16()));
    }

    let bytes = res.bytes().await.map_err(ProvisionError::transport)?;
    let account = parse_account(&bytes)?;
    debug!(account_id = ?account.id, "registered account");
    Ok(account)
}

/// Parses and validates a registration response body.
pub fn parse_account(body: &[u8]) -> Result<AccountRecord> {
    let account: AccountRecord = serde_json::from_slice(body)
        .map_err(|e| ProvisionError::MalformedResponse(e.to_string()))?;

    let missing = |what: &str| ProvisionError::MalformedResponse(format!("missing {what}"));
    if account.v4().is_empty() {
        return Err(missing("config.interface.addresses.v4"));
    }
    if account.v6().is_empty() {
        return Err(missing("config.interface.addresses.v6"));
    }
    if account.client_id().is_empty() {
        return Err(missing("config.client_id"));
    }
    match account.peer_public_key() {
        Some(k) if !k.is_empty() => {}
        _ => return Err(missing("config.peers[0].public_key")),
    }
    Ok(account)
}
