//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{HostError, HostHandle, HostRegistry, SimulationHost};
use crate::game::host::generate_host_id;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hosts: Arc<HostRegistry>,
    /// Host served when `/ws` names none
    pub primary_host: String,
}

impl AppState {
    /// Create the primary host and register it. The host is returned
    /// unstarted so the caller decides where it runs.
    pub fn new(config: Config) -> Result<(Self, SimulationHost), HostError> {
        let config = Arc::new(config);
        let hosts = Arc::new(HostRegistry::new());

        let host_config = config.to_host_config();
        let mut rng = rand::thread_rng();
        let mut host = SimulationHost::new(
            generate_host_id(&mut rng, &host_config.host_id_suffix),
            host_config.clone(),
            config.to_world_config(),
        );
        let handle: HostHandle = hosts.register_host(&mut host, || {
            generate_host_id(&mut rng, &host_config.host_id_suffix)
        })?;

        Ok((
            Self {
                config,
                hosts,
                primary_host: handle.id,
            },
            host,
        ))
    }
}
