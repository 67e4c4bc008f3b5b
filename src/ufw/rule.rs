use crate::docker::container::{Container, Protocol, SHORT_ID_LEN};
use crate::Error;
use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Allow,
    Deny,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Deny => "deny",
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Action::Allow),
            "deny" => Ok(Action::Deny),
            other => Err(Error::invalid_state(
                format!("Unsupported ufw action '{}'", other),
                other,
                "allow or deny",
            )),
        }
    }
}

/// Source or destination of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    Any,
    Net(IpNet),
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address::Net(IpNet::from(ip))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Any => f.write_str("any"),
            // ufw prints single hosts without a prefix length
            Address::Net(net) if net.prefix_len() == net.max_prefix_len() => {
                write!(f, "{}", net.addr())
            }
            Address::Net(net) => write!(f, "{}", net),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(Address::Any);
        }

        if s.contains('/') {
            s.parse::<IpNet>()
                .map(|net| Address::Net(net.trunc()))
                .map_err(|_| Error::invalid_ip(s, "Invalid CIDR notation"))
        } else {
            s.parse::<IpAddr>()
                .map(Address::from)
                .map_err(|_| Error::invalid_ip(s, "Invalid IP address"))
        }
    }
}

/// Identifies the container a managed rule belongs to; stored as the rule comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerTag {
    pub name: String,
    pub id: String,
}

impl OwnerTag {
    pub fn for_container(container: &Container) -> Self {
        Self {
            name: container.name.clone(),
            id: container.short_id().to_string(),
        }
    }

    /// Parse a rule comment of the form `<name>:<short id>`.
    ///
    /// Comments that do not end in a 12 character lowercase hex ID are not ours.
    pub fn parse(comment: &str) -> Option<Self> {
        let (name, id) = comment.trim().rsplit_once(':')?;
        let is_short_id = id.len() == SHORT_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

        if name.is_empty() || !is_short_id {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            id: id.to_string(),
        })
    }
}

impl fmt::Display for OwnerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

/// A routed ufw rule derived from a container's ports and labels.
///
/// `host_port` is informational only and does not take part in equality,
/// since ufw never sees it.
#[derive(Debug, Clone)]
pub struct Rule {
    pub action: Action,
    pub protocol: Option<Protocol>,
    pub from: Address,
    pub to: Address,
    pub port: Option<u16>,
    pub host_port: Option<u16>,
    pub owner: OwnerTag,
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.protocol == other.protocol
            && self.from == other.from
            && self.to == other.to
            && self.port == other.port
            && self.owner == other.owner
    }
}

impl Eq for Rule {}

impl Rule {
    fn spec_args(&self) -> Vec<String> {
        let mut args = vec![self.action.as_str().to_string()];
        if let Some(protocol) = self.protocol {
            args.push("proto".to_string());
            args.push(protocol.to_string());
        }
        args.push("from".to_string());
        args.push(self.from.to_string());
        args.push("to".to_string());
        args.push(self.to.to_string());
        if let Some(port) = self.port {
            args.push("port".to_string());
            args.push(port.to_string());
        }
        args
    }

    /// Arguments for `ufw` that install this rule.
    pub fn add_args(&self) -> Vec<String> {
        let mut args = vec!["route".to_string()];
        args.extend(self.spec_args());
        args.push("comment".to_string());
        args.push(self.owner.to_string());
        args
    }

    /// Arguments for `ufw` that remove this rule.
    pub fn delete_args(&self) -> Vec<String> {
        let mut args = vec!["route".to_string(), "delete".to_string()];
        args.extend(self.spec_args());
        args
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route {} comment '{}'", self.spec_args().join(" "), self.owner)
    }
}
