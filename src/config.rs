use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use figment::{
    providers::{Env, Serialized},
    value::{Dict, Value},
    Figment,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::types::{ProviderEndpoint, ResolvedTarget};

/// Path of the provider API below the configured base URL.
const API_PATH: &str = "/admin/api.php";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw startup options as given on the command line or in `DPC_*` variables.
///
/// Flags win over environment variables; unset flags are skipped when the
/// layers are merged so they never mask the environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Parser)]
#[command(name = "pihole-customdns")]
#[command(version, about = "Keeps Pi-hole custom DNS records in sync with Docker containers")]
pub struct Settings {
    /// Default target IP address for the Docker host
    #[arg(long = "targetip")]
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_target_ip: Option<String>,

    /// Default target domain for the Docker host
    #[arg(long = "targetdomain")]
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_target_domain: Option<String>,

    /// Pi-hole URL (e.g. http://pi.hole)
    #[arg(long = "piholeurl")]
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pihole_url: Option<String>,

    /// Pi-hole API token
    #[arg(long = "apitoken")]
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pihole_api_token: Option<String>,

    /// Second Pi-hole URL (optional)
    #[arg(long = "piholeurl2")]
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pihole_url_2: Option<String>,

    /// Second Pi-hole API token (required with --piholeurl2)
    #[arg(long = "apitoken2")]
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pihole_api_token_2: Option<String>,

    /// Per-request timeout for Pi-hole API calls in seconds, 0 disables it
    #[arg(long = "timeout")]
    #[serde(
        default,
        deserialize_with = "optional_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    /// Layers defaults, `DPC_*` environment variables and `flags`.
    pub fn figment(flags: Settings) -> Figment {
        let defaults = Settings {
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            ..Default::default()
        };
        Figment::from(Serialized::defaults(defaults))
            .merge(environment())
            .merge(Serialized::defaults(flags))
    }
}

/// `DPC_*` variables kept as raw strings. Letting figment parse them would
/// turn a token like `0123456789` into the integer `123456789`.
fn environment() -> Serialized<Dict> {
    let vars: Dict = Env::prefixed("DPC_")
        .iter()
        .map(|(key, value)| (key.as_str().to_lowercase(), Value::from(value)))
        .collect();
    Serialized::defaults(vars)
}

/// Accepts any scalar for a string option.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Str(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

/// Accepts a number or a numeric string; a blank string means unset.
fn optional_secs<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Secs {
        Num(u64),
        Str(String),
    }

    match Option::<Secs>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Secs::Num(secs)) => Ok(Some(secs)),
        Some(Secs::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Secs::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid timeout {:?}: {}", s, e))),
    }
}

/// Validated, immutable daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub target: ResolvedTarget,
    /// Primary endpoint first, optional secondary second.
    pub endpoints: Vec<ProviderEndpoint>,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Settings::figment(Settings::parse())
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let target = match (
            non_empty(settings.default_target_ip),
            non_empty(settings.default_target_domain),
        ) {
            (None, None) => return Err(ConfigError::MissingTarget),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingTarget),
            (Some(ip), None) => {
                ip.parse::<IpAddr>()
                    .map_err(|_| ConfigError::InvalidTargetIp(ip.clone()))?;
                ResolvedTarget::Address(ip)
            }
            (None, Some(domain)) => ResolvedTarget::Alias(domain),
        };

        let token = non_empty(settings.pihole_api_token).ok_or(ConfigError::MissingToken {
            flag: "apitoken",
            env: "DPC_PIHOLE_API_TOKEN",
        })?;
        let url = non_empty(settings.pihole_url).ok_or(ConfigError::MissingUrl)?;
        let mut endpoints = vec![ProviderEndpoint {
            api_url: api_url(&url)?,
            auth_token: token,
        }];

        if let Some(url) = non_empty(settings.pihole_url_2) {
            let token =
                non_empty(settings.pihole_api_token_2).ok_or(ConfigError::MissingToken {
                    flag: "apitoken2",
                    env: "DPC_PIHOLE_API_TOKEN_2",
                })?;
            endpoints.push(ProviderEndpoint {
                api_url: api_url(&url)?,
                auth_token: token,
            });
        }

        let request_timeout = match settings
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            target,
            endpoints,
            request_timeout,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Appends the API path to a base URL unless the operator already did.
fn api_url(base: &str) -> Result<String, ConfigError> {
    Url::parse(base).map_err(|e| ConfigError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    let base = base.trim_end_matches('/');
    if base.ends_with(API_PATH) {
        Ok(base.to_string())
    } else {
        Ok(format!("{}{}", base, API_PATH))
    }
}
