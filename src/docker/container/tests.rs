use super::*;
use bollard::models::{
    ContainerConfig, ContainerInspectResponse, EndpointSettings, HostConfig, NetworkSettings,
    PortBinding,
};
use std::net::{IpAddr, Ipv4Addr};

const FULL_ID: &str = "4f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566778899aabbccddeeff";

fn binding(host_port: &str) -> PortBinding {
    PortBinding {
        host_ip: Some("0.0.0.0".to_string()),
        host_port: Some(host_port.to_string()),
    }
}

fn inspect_response(
    port_bindings: HashMap<String, Option<Vec<PortBinding>>>,
    networks: HashMap<String, EndpointSettings>,
    network_mode: &str,
) -> ContainerInspectResponse {
    ContainerInspectResponse {
        id: Some(FULL_ID.to_string()),
        name: Some("/web".to_string()),
        config: Some(ContainerConfig {
            labels: Some(HashMap::from([(
                MANAGED_LABEL.to_string(),
                MANAGED_LABEL_VALUE.to_string(),
            )])),
            ..Default::default()
        }),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            network_mode: Some(network_mode.to_string()),
            ..Default::default()
        }),
        network_settings: Some(NetworkSettings {
            networks: Some(networks),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn endpoint(ip: &str) -> EndpointSettings {
    EndpointSettings {
        ip_address: Some(ip.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_short_id_truncates_to_twelve_chars() {
    assert_eq!(short_id(FULL_ID), "4f1e2d3c4b5a");
    assert_eq!(short_id("abc"), "abc");
}

#[test]
fn test_from_inspect_extracts_published_ports() {
    let inspect = inspect_response(
        HashMap::from([
            ("8080/tcp".to_string(), Some(vec![binding("80")])),
            ("53/udp".to_string(), Some(vec![binding("5353")])),
            // exposed but not published
            ("9000/tcp".to_string(), None),
            ("9001/tcp".to_string(), Some(vec![])),
        ]),
        HashMap::from([("bridge".to_string(), endpoint("172.17.0.2"))]),
        "default",
    );

    let container = Container::from_inspect(inspect).unwrap();

    assert_eq!(container.name, "web");
    assert_eq!(container.short_id(), "4f1e2d3c4b5a");
    assert!(container.is_managed());
    assert_eq!(container.ports.len(), 2);
    assert_eq!(container.ports[0].container_port, 53);
    assert_eq!(container.ports[0].protocol, Protocol::Udp);
    assert_eq!(container.ports[0].host_port, Some(5353));
    assert_eq!(container.ports[1].container_port, 8080);
    assert_eq!(container.ports[1].protocol, Protocol::Tcp);
    assert_eq!(container.ports[1].host_port, Some(80));
    assert_eq!(container.ports[1].host_ip.as_deref(), Some("0.0.0.0"));
    assert_eq!(
        container.ip_address,
        Some(IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2)))
    );
}

#[test]
fn test_from_inspect_prefers_network_mode_network() {
    let inspect = inspect_response(
        HashMap::new(),
        HashMap::from([
            ("app_default".to_string(), endpoint("172.20.0.5")),
            ("bridge".to_string(), endpoint("172.17.0.9")),
        ]),
        "app_default",
    );

    let container = Container::from_inspect(inspect).unwrap();

    assert_eq!(
        container.ip_address,
        Some(IpAddr::V4(Ipv4Addr::new(172, 20, 0, 5)))
    );
    assert!(container.ports.is_empty());
}

#[test]
fn test_from_inspect_falls_back_to_any_network() {
    let inspect = inspect_response(
        HashMap::new(),
        HashMap::from([("backend".to_string(), endpoint("10.1.0.3"))]),
        "default",
    );

    let container = Container::from_inspect(inspect).unwrap();

    assert_eq!(
        container.ip_address,
        Some(IpAddr::V4(Ipv4Addr::new(10, 1, 0, 3)))
    );
}

#[test]
fn test_from_inspect_without_address() {
    let inspect = inspect_response(
        HashMap::new(),
        HashMap::from([("host".to_string(), endpoint(""))]),
        "host",
    );

    let container = Container::from_inspect(inspect).unwrap();
    assert!(container.ip_address.is_none());
}

#[test]
fn test_from_inspect_skips_unsupported_protocols() {
    let inspect = inspect_response(
        HashMap::from([
            ("8080/tcp".to_string(), Some(vec![binding("8080")])),
            ("9999/sctp".to_string(), Some(vec![binding("9999")])),
        ]),
        HashMap::new(),
        "default",
    );

    let container = Container::from_inspect(inspect).unwrap();

    assert_eq!(container.ports.len(), 1);
    assert_eq!(container.ports[0].container_port, 8080);
    assert!(container.ip_address.is_none());
}

#[test]
fn test_from_inspect_requires_id() {
    let inspect = ContainerInspectResponse::default();
    assert!(Container::from_inspect(inspect).is_err());
}

#[test]
fn test_is_managed_requires_exact_value() {
    let container = Container::builder()
        .id(FULL_ID.to_string())
        .name("web".to_string())
        .labels(HashMap::from([(
            MANAGED_LABEL.to_string(),
            "true".to_string(),
        )]))
        .build();

    assert!(!container.is_managed());
}
