use crate::config::default_port;

use serde::{Deserialize, Serialize};

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the solve endpoint.
    #[serde(default = "default_port")]
    pub port: u16,
}
