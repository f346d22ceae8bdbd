//! Error types for the reconciliation daemon.

use thiserror::Error;

/// Errors raised while validating startup options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Default Docker host target IP or target domain are not provided. Set either using --targetip (DPC_DEFAULT_TARGET_IP) or --targetdomain (DPC_DEFAULT_TARGET_DOMAIN).")]
    MissingTarget,

    #[error("Both default target IP and target domain are set. Only one default can be used.")]
    ConflictingTarget,

    #[error("Invalid default target IP {0:?}")]
    InvalidTargetIp(String),

    #[error("Pi-hole URL is not provided. Set it using --piholeurl or DPC_PIHOLE_URL.")]
    MissingUrl,

    #[error("Pi-hole API token is not provided. Set it using --{flag} or {env}.")]
    MissingToken {
        flag: &'static str,
        env: &'static str,
    },

    #[error("Invalid Pi-hole URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Errors talking to a DNS provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure (connect, timeout, body read)
    #[error("Pi-hole unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Pi-hole returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Payload could not be decoded
    #[error("Malformed Pi-hole response: {0}")]
    Malformed(String),

    /// Probe succeeded at HTTP level but the token was not accepted
    #[error("Pi-hole {endpoint} rejected the API token")]
    AuthRejected { endpoint: String },

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Errors from the container host.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Docker event stream ended")]
    StreamEnded,
}
