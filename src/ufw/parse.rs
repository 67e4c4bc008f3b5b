use crate::ufw::rule::{Action, Address, OwnerTag, Rule};
use tracing::debug;

/// Extract managed rules from the output of `ufw show added`.
///
/// Only routed rules whose comment is an owner tag are returned; everything
/// else on the host firewall is left alone.
pub fn parse_show_added(output: &str) -> Vec<Rule> {
    output.lines().filter_map(parse_added_line).collect()
}

fn parse_added_line(line: &str) -> Option<Rule> {
    let line = line.trim();
    let (spec, comment) = line.split_once(" comment ")?;
    let owner = OwnerTag::parse(unquote(comment))?;

    let mut tokens = spec.split_whitespace();
    if tokens.next()? != "ufw" || tokens.next()? != "route" {
        return None;
    }
    let action: Action = tokens.next()?.parse().ok()?;

    let mut rule = Rule {
        action,
        protocol: None,
        from: Address::Any,
        to: Address::Any,
        port: None,
        host_port: None,
        owner,
    };

    while let Some(key) = tokens.next() {
        let value = tokens.next()?;
        match key {
            "proto" => rule.protocol = Some(value.parse().ok()?),
            "from" => rule.from = value.parse().ok()?,
            "to" => rule.to = value.parse().ok()?,
            "port" => rule.port = Some(value.parse().ok()?),
            _ => {
                debug!("Skipping tagged rule with unsupported option '{}': {}", key, line);
                return None;
            }
        }
    }

    Some(rule)
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(s)
}
