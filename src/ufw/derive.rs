//! Derivation of ufw rules from container metadata.
//!
//! Labels understood on top of the opt-in label:
//!
//! - `UFW_ALLOW_FROM=<addr>[-<port>];...` restricts inbound sources, optionally per port.
//! - `UFW_DENY_OUT=TRUE` denies routed traffic leaving the container.
//! - `UFW_ALLOW_TO=<addr|any>[-<port>[/<proto>]];...` punches holes in `UFW_DENY_OUT`.

use crate::docker::container::{Container, Protocol};
use crate::ufw::rule::{Action, Address, OwnerTag, Rule};
use crate::{ALLOW_FROM_LABEL, ALLOW_TO_LABEL, DENY_OUT_LABEL, Error, Result};
use std::net::IpAddr;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowFrom {
    pub source: Address,
    pub port: Option<u16>,
}

impl AllowFrom {
    pub fn parse(entry: &str) -> Result<Self> {
        let (addr, port) = match entry.trim().split_once('-') {
            Some((addr, port)) => (addr, Some(parse_port(ALLOW_FROM_LABEL, port)?)),
            None => (entry.trim(), None),
        };

        Ok(Self {
            source: addr.parse()?,
            port,
        })
    }

    fn applies_to(&self, container_port: u16) -> bool {
        self.port.is_none_or(|port| port == container_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowTo {
    pub destination: Address,
    pub port: Option<u16>,
    pub protocol: Option<Protocol>,
}

impl AllowTo {
    pub fn parse(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        let Some((addr, port_proto)) = entry.split_once('-') else {
            return Ok(Self {
                destination: entry.parse()?,
                port: None,
                protocol: None,
            });
        };

        let (port, protocol) = match port_proto.split_once('/') {
            Some((port, proto)) => (port, Some(proto.parse::<Protocol>()?)),
            None => (port_proto, None),
        };

        Ok(Self {
            destination: addr.parse()?,
            port: Some(parse_port(ALLOW_TO_LABEL, port)?),
            protocol,
        })
    }
}

fn parse_port(label: &str, port: &str) -> Result<u16> {
    port.trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| Error::invalid_label(label, format!("invalid port '{}'", port)))
}

/// Parse a `;`-separated label value, logging and skipping bad entries.
fn parse_entries<T>(
    container: &Container,
    label: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Option<Vec<T>> {
    let value = container.label(label)?;

    let entries = value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match parse(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(
                    container_id = %container.short_id(),
                    label = %label,
                    "Ignoring label entry '{}': {}", entry, e
                );
                None
            }
        })
        .collect();

    Some(entries)
}

/// Compute every rule a container should have, in the order they must be applied.
///
/// Rules target the container address, so a container without one yields no rules.
pub fn derive_rules(container: &Container) -> Vec<Rule> {
    let deny_out = container
        .label(DENY_OUT_LABEL)
        .is_some_and(|v| v.eq_ignore_ascii_case("TRUE"));

    if container.ports.is_empty() && !deny_out {
        return Vec::new();
    }

    let Some(ip) = container.ip_address else {
        warn!(
            container_id = %container.short_id(),
            container_name = %container.name,
            "Couldn't detect the container IP address, no rules derived"
        );
        return Vec::new();
    };

    let owner = OwnerTag::for_container(container);
    let mut rules = inbound_rules(container, ip, &owner);
    if deny_out {
        rules.extend(outbound_rules(container, ip, &owner));
    }
    rules
}

fn inbound_rules(container: &Container, ip: IpAddr, owner: &OwnerTag) -> Vec<Rule> {
    let allow_from = parse_entries(container, ALLOW_FROM_LABEL, AllowFrom::parse);
    if allow_from.as_ref().is_some_and(Vec::is_empty) {
        warn!(
            container_id = %container.short_id(),
            "{} has no usable entries, published ports stay closed", ALLOW_FROM_LABEL
        );
    }

    let mut rules = Vec::new();
    for mapping in &container.ports {
        let sources: Vec<Address> = match &allow_from {
            Some(entries) => entries
                .iter()
                .filter(|entry| entry.applies_to(mapping.container_port))
                .map(|entry| entry.source)
                .collect(),
            None => vec![Address::Any],
        };

        for source in sources {
            rules.push(Rule {
                action: Action::Allow,
                protocol: Some(mapping.protocol),
                from: source,
                to: Address::from(ip),
                port: Some(mapping.container_port),
                host_port: mapping.host_port,
                owner: owner.clone(),
            });
        }
    }
    rules
}

fn outbound_rules(container: &Container, ip: IpAddr, owner: &OwnerTag) -> Vec<Rule> {
    let mut rules: Vec<Rule> = parse_entries(container, ALLOW_TO_LABEL, AllowTo::parse)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| Rule {
            action: Action::Allow,
            protocol: entry.protocol,
            from: Address::from(ip),
            to: entry.destination,
            port: entry.port,
            host_port: None,
            owner: owner.clone(),
        })
        .collect();

    // Must come last so the allow rules above take precedence
    rules.push(Rule {
        action: Action::Deny,
        protocol: None,
        from: Address::from(ip),
        to: Address::Any,
        port: None,
        host_port: None,
        owner: owner.clone(),
    });
    rules
}
