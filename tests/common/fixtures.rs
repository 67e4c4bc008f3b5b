use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use ufw_docker_sync::docker::container::{Container, PortMapping, Protocol, short_id};
use ufw_docker_sync::ufw::rule::{Action, Address, OwnerTag, Rule};

/// A 64 character container ID whose short form is `seed` repeated.
pub fn full_id(seed: u8) -> String {
    format!("{:02x}", seed).repeat(32)
}

/// A running container carrying the opt-in label with the given published ports.
pub fn managed_container(seed: u8, name: &str, ports: &[(u16, Protocol)]) -> Container {
    let mut labels = HashMap::new();
    labels.insert("UFW_MANAGED".to_string(), "TRUE".to_string());

    Container::builder()
        .id(full_id(seed))
        .name(name.to_string())
        .labels(labels)
        .ports(
            ports
                .iter()
                .map(|(port, protocol)| {
                    PortMapping::builder()
                        .container_port(*port)
                        .protocol(*protocol)
                        .host_port(*port)
                        .build()
                })
                .collect(),
        )
        .ip_address(IpAddr::V4(Ipv4Addr::new(172, 17, 0, seed)))
        .build()
}

/// An installed inbound rule owned by the container built from `seed`.
pub fn owned_rule(seed: u8, name: &str, port: u16) -> Rule {
    Rule {
        action: Action::Allow,
        protocol: Some(Protocol::Tcp),
        from: Address::Any,
        to: Address::from(IpAddr::V4(Ipv4Addr::new(172, 17, 0, seed))),
        port: Some(port),
        host_port: None,
        owner: OwnerTag {
            name: name.to_string(),
            id: short_id(&full_id(seed)).to_string(),
        },
    }
}
