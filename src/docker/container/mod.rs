use crate::{Error, MANAGED_LABEL, MANAGED_LABEL_VALUE, Result};
use bon::Builder;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::warn;

#[cfg(test)]
mod tests;

/// Length of the short container ID used as the tracking key and rule owner.
pub const SHORT_ID_LEN: usize = 12;

/// Truncate a Docker container ID to its stable short form.
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(Error::invalid_label(
                "protocol",
                format!("unsupported protocol '{}'", other),
            )),
        }
    }
}

/// A published port: a container port with at least one host binding.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: Protocol,
    pub host_port: Option<u16>,
    pub host_ip: Option<String>,
}

#[derive(Debug, Clone, Builder)]
pub struct Container {
    pub id: String,
    pub name: String,
    #[builder(default)]
    pub labels: HashMap<String, String>,
    #[builder(default)]
    pub ports: Vec<PortMapping>,
    pub ip_address: Option<IpAddr>,
}

impl Container {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Check whether the container opted in to firewall management
    pub fn is_managed(&self) -> bool {
        self.label(MANAGED_LABEL) == Some(MANAGED_LABEL_VALUE)
    }

    pub fn from_inspect(inspect: bollard::models::ContainerInspectResponse) -> Result<Self> {
        let id = inspect
            .id
            .ok_or_else(|| Error::invalid_state("Container missing ID", "missing", "has ID"))?;

        let name = match inspect.name {
            Some(name) => name.trim_start_matches('/').to_string(),
            None => short_id(&id).to_string(),
        };

        let labels = inspect
            .config
            .as_ref()
            .and_then(|c| c.labels.clone())
            .unwrap_or_default();

        let network_mode = inspect
            .host_config
            .as_ref()
            .and_then(|hc| hc.network_mode.clone())
            .unwrap_or_default();

        let mut ports = Vec::new();
        if let Some(port_bindings) = inspect.host_config.and_then(|hc| hc.port_bindings) {
            for (port_proto, bindings) in port_bindings {
                // Exposed but unpublished ports carry no bindings
                let Some(first_binding) = bindings.as_ref().and_then(|b| b.first()) else {
                    continue;
                };

                let Some((port, proto)) = port_proto.split_once('/') else {
                    warn!(
                        container_id = %id,
                        port = %port_proto,
                        "Skipping malformed port binding"
                    );
                    continue;
                };
                let Ok(container_port) = port.parse::<u16>() else {
                    warn!(
                        container_id = %id,
                        port = %port_proto,
                        "Skipping malformed port binding"
                    );
                    continue;
                };
                let protocol = match proto.parse::<Protocol>() {
                    Ok(protocol) => protocol,
                    Err(e) => {
                        warn!(
                            container_id = %id,
                            port = %port_proto,
                            "Skipping port binding: {}", e
                        );
                        continue;
                    }
                };

                ports.push(PortMapping {
                    container_port,
                    protocol,
                    host_port: first_binding
                        .host_port
                        .as_deref()
                        .and_then(|p| p.parse().ok()),
                    host_ip: first_binding
                        .host_ip
                        .clone()
                        .filter(|ip| !ip.is_empty()),
                });
            }
        }
        ports.sort_by_key(|p| (p.container_port, p.protocol));

        let ip_address = inspect
            .network_settings
            .and_then(|ns| ns.networks)
            .and_then(|networks| {
                let address_of = |name: &str| {
                    networks
                        .get(name)
                        .and_then(|n| n.ip_address.as_deref())
                        .and_then(|ip| ip.parse::<IpAddr>().ok())
                };

                // "default" is the daemon's alias for the bridge network
                let preferred = match network_mode.as_str() {
                    "" | "default" => "bridge",
                    mode => mode,
                };

                address_of(preferred).or_else(|| {
                    let mut names: Vec<&String> = networks.keys().collect();
                    names.sort();
                    names.into_iter().find_map(|name| address_of(name.as_str()))
                })
            });

        Ok(Container {
            id,
            name,
            labels,
            ports,
            ip_address,
        })
    }
}
