// src/error.rs

/// Everything that can abort a provisioning attempt.
///
/// There are no retries anywhere in the flow: the first error ends the
/// attempt and no artifacts are produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    /// Transport failure or non-success status while reaching an external host.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The registration endpoint answered with a non-2xx status.
    #[error("registration rejected with status {0}")]
    RegistrationRejected(u16),

    /// An expected field was absent or unparsable in an upstream response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Locally supplied data could not be decoded (e.g. a short client id).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("provisioning attempt timed out")]
    TimedOut,

    #[error("provisioning attempt cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    pub(crate) fn transport(e: reqwest::Error) -> Self {
        ProvisionError::UpstreamUnavailable(e.to_string())
    }
}
