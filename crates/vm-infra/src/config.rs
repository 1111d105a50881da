use photon_api::{ClientOptions, PhotonClient};
use tracing::info;

use crate::{Error, Result};

/// Photon Controller connection settings and request defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotonConfig {
    pub endpoint: String,
    pub ignore_certificate: bool,
    /// Tenant used when a request does not name one.
    pub tenant: Option<String>,
    /// Project used when a request does not name one.
    pub project: Option<String>,
}

impl PhotonConfig {
    /// Load from env vars:
    ///
    /// - `PHOTON_SERVER` (required)
    /// - `PHOTON_IGNORE_CERTIFICATE` (`true`/`1`/`yes`, default: `false`)
    /// - `PHOTON_TENANT`, `PHOTON_PROJECT` (optional defaults)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = lookup("PHOTON_SERVER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::ConfigurationInvalid("PHOTON_SERVER (control plane endpoint) must be set".into())
            })?;

        let ignore_certificate = match lookup("PHOTON_IGNORE_CERTIFICATE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                Error::ConfigurationInvalid(format!("PHOTON_IGNORE_CERTIFICATE: not a boolean: {raw}"))
            })?,
            None => false,
        };

        let non_empty = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Ok(Self {
            endpoint,
            ignore_certificate,
            tenant: non_empty("PHOTON_TENANT"),
            project: non_empty("PHOTON_PROJECT"),
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            ignore_certificate: self.ignore_certificate,
            ..ClientOptions::default()
        }
    }

    /// Build a client and check the endpoint answers `GET /status`.
    pub async fn connect(&self) -> Result<PhotonClient> {
        let client = PhotonClient::new(&self.endpoint, self.client_options())?;
        let status = client.status().await?;

        info!(
            endpoint = %self.endpoint,
            status = %status.status,
            ignore_certificate = self.ignore_certificate,
            "photon controller client configured"
        );
        Ok(client)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
