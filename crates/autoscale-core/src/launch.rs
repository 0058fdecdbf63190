use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{AutoscaleError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchConfigurationType {
    LaunchServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    #[serde(rename = "loadBalancerId")]
    pub id: u64,
    pub port: u16,
}

/// File injected into a server when it is launched. `contents` holds base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    pub path: String,
    pub contents: String,
}

impl Personality {
    pub fn from_text(path: impl Into<String>, text: &str) -> Self {
        Self {
            path: path.into(),
            contents: STANDARD.encode(text.as_bytes()),
        }
    }

    pub fn decoded_contents(&self) -> Result<Vec<u8>> {
        STANDARD.decode(&self.contents).map_err(|e| {
            AutoscaleError::SerializationError(format!(
                "personality '{}' is not valid base64: {e}",
                self.path
            ))
        })
    }
}

/// Template for the servers a group launches.
///
/// The service nests the server fields under `args.server`; this record keeps
/// them flat and converts at the serde boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LaunchConfigurationWire", into = "LaunchConfigurationWire")]
pub struct LaunchConfiguration {
    pub launch_type: LaunchConfigurationType,
    pub server_name: String,
    pub server_image_ref: String,
    pub server_flavor_ref: String,
    pub server_disk_config: Option<String>,
    pub server_metadata: HashMap<String, String>,
    pub networks: Vec<String>,
    pub personalities: Vec<Personality>,
    pub load_balancers: Vec<LoadBalancer>,
}

#[derive(Serialize, Deserialize)]
struct LaunchConfigurationWire {
    #[serde(rename = "type")]
    launch_type: LaunchConfigurationType,
    args: LaunchArgsWire,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaunchArgsWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    load_balancers: Vec<LoadBalancer>,
    server: ServerWire,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerWire {
    name: String,
    image_ref: String,
    flavor_ref: String,
    #[serde(
        rename = "OS-DCF:diskConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    disk_config: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    networks: Vec<NetworkWire>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    personality: Vec<Personality>,
}

#[derive(Serialize, Deserialize)]
struct NetworkWire {
    uuid: String,
}

impl From<LaunchConfigurationWire> for LaunchConfiguration {
    fn from(wire: LaunchConfigurationWire) -> Self {
        let server = wire.args.server;
        Self {
            launch_type: wire.launch_type,
            server_name: server.name,
            server_image_ref: server.image_ref,
            server_flavor_ref: server.flavor_ref,
            server_disk_config: server.disk_config,
            server_metadata: server.metadata,
            networks: server.networks.into_iter().map(|n| n.uuid).collect(),
            personalities: server.personality,
            load_balancers: wire.args.load_balancers,
        }
    }
}

impl From<LaunchConfiguration> for LaunchConfigurationWire {
    fn from(config: LaunchConfiguration) -> Self {
        Self {
            launch_type: config.launch_type,
            args: LaunchArgsWire {
                load_balancers: config.load_balancers,
                server: ServerWire {
                    name: config.server_name,
                    image_ref: config.server_image_ref,
                    flavor_ref: config.server_flavor_ref,
                    disk_config: config.server_disk_config,
                    metadata: config.server_metadata,
                    networks: config
                        .networks
                        .into_iter()
                        .map(|uuid| NetworkWire { uuid })
                        .collect(),
                    personality: config.personalities,
                },
            },
        }
    }
}
