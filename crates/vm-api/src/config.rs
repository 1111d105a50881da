use std::env;
use std::net::SocketAddr;

use vm_infra::PhotonConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub control_plane_api_key: String,
    pub photon: PhotonConfig,
}

impl AppConfig {
    pub fn from_env() -> vm_infra::Result<Self> {
        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".into())
            .parse()
            .map_err(|e| {
                vm_infra::Error::ConfigurationInvalid(format!("LISTEN_ADDR must be a socket address: {e}"))
            })?;

        let control_plane_api_key = env::var("CONTROL_PLANE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                vm_infra::Error::ConfigurationInvalid("CONTROL_PLANE_API_KEY must be set".into())
            })?;

        Ok(Self {
            listen_addr,
            control_plane_api_key,
            photon: PhotonConfig::from_env()?,
        })
    }
}
