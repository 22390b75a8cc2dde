//! Attribute validation
//!
//! Owns the fixed enumerations the API accepts and checks decoded attributes
//! before any remote call is made.

use crate::error::ProviderError;
use crate::model::{FirewallRule, FirewallRuleSet, ServerConfig};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Hardware profiles a server can be created with
pub const HARDWARE_PROFILES: &[&str] = &[
    "default",
    "legacy",
    "nested",
    "cisco_csr",
    "sophos_utm",
    "f5_bigip",
    "q35",
    "q35_nested",
];

/// Storage performance classes
pub const STORAGE_TYPES: &[&str] = &["storage", "storage_high", "storage_insane"];

/// Availability zones within a location
pub const AVAILABILITY_ZONES: &[&str] = &["a", "b", "c"];

/// Load balancer balancing algorithms
pub const LOADBALANCER_ALGORITHMS: &[&str] = &["roundrobin", "leastconn"];

/// Most storages a server can hold
pub const MAX_STORAGES: usize = 8;

/// Most networks (besides the public one) a server can hold
pub const MAX_NETWORKS: usize = 7;

/// Server hardware profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HardwareProfile {
    #[default]
    Default,
    Legacy,
    Nested,
    CiscoCsr,
    SophosUtm,
    F5Bigip,
    Q35,
    Q35Nested,
}

impl HardwareProfile {
    /// Name used by both the attribute surface and the API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Legacy => "legacy",
            Self::Nested => "nested",
            Self::CiscoCsr => "cisco_csr",
            Self::SophosUtm => "sophos_utm",
            Self::F5Bigip => "f5_bigip",
            Self::Q35 => "q35",
            Self::Q35Nested => "q35_nested",
        }
    }

    /// Profile reported by the API; unknown names fall back to the default profile
    pub fn from_remote(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for HardwareProfile {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(Self::Default),
            "legacy" => Ok(Self::Legacy),
            "nested" => Ok(Self::Nested),
            "cisco_csr" => Ok(Self::CiscoCsr),
            "sophos_utm" => Ok(Self::SophosUtm),
            "f5_bigip" => Ok(Self::F5Bigip),
            "q35" => Ok(Self::Q35),
            "q35_nested" => Ok(Self::Q35Nested),
            other => Err(not_one_of("hardware_profile", other, HARDWARE_PROFILES)),
        }
    }
}

impl fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn not_one_of(field: &str, value: &str, allowed: &[&str]) -> ProviderError {
    ProviderError::Validation(format!(
        "{} must be one of [{}], got '{}'",
        field,
        allowed.join(", "),
        value
    ))
}

/// Check that `value` is one of `allowed`
pub fn validate_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), ProviderError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(not_one_of(field, value, allowed))
    }
}

/// Check that `value` is a UUID
pub fn validate_uuid(field: &str, value: &str) -> Result<(), ProviderError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|e| ProviderError::Validation(format!("{} '{}' is not a valid UUID: {}", field, value, e)))
}

/// Check a port or a `from:to` port range
pub fn validate_port_range(field: &str, value: &str) -> Result<(), ProviderError> {
    let invalid = || {
        ProviderError::Validation(format!(
            "{} must be a port or a 'from:to' range between 1 and 65535, got '{}'",
            field, value
        ))
    };
    let parse = |part: &str| part.parse::<u16>().ok().filter(|p| *p > 0).ok_or_else(invalid);

    match value.split_once(':') {
        None => parse(value).map(|_| ()),
        Some((from, to)) => {
            if parse(from)? > parse(to)? {
                return Err(invalid());
            }
            Ok(())
        }
    }
}

/// Check an address or CIDR block of the given IP family
fn validate_cidr(field: &str, value: &str, family: u8) -> Result<(), ProviderError> {
    let (address, prefix) = match value.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (value, None),
    };
    let invalid = || ProviderError::Validation(format!("{} '{}' is not a valid IPv{} CIDR", field, value, family));

    let address: IpAddr = address.parse().map_err(|_| invalid())?;
    let max_prefix = match (address, family) {
        (IpAddr::V4(_), 4) => 32,
        (IpAddr::V6(_), 6) => 128,
        _ => return Err(invalid()),
    };
    if let Some(prefix) = prefix {
        let bits: u8 = prefix.parse().map_err(|_| invalid())?;
        if bits > max_prefix {
            return Err(invalid());
        }
    }
    Ok(())
}

fn validate_rule_list(network: &str, direction: &str, family: u8, rules: &[FirewallRule]) -> Result<(), ProviderError> {
    let mut orders = HashSet::new();
    for rule in rules {
        let field = |name: &str| format!("network {} {} {}", network, direction, name);
        if rule.order < 0 {
            return Err(ProviderError::Validation(format!("{} must not be negative", field("order"))));
        }
        if !orders.insert(rule.order) {
            return Err(ProviderError::Validation(format!(
                "{} {} is used by more than one rule",
                field("order"),
                rule.order
            )));
        }
        for (name, port) in [("dst_port", &rule.dst_port), ("src_port", &rule.src_port)] {
            if let Some(port) = port {
                validate_port_range(&field(name), port)?;
            }
        }
        for (name, cidr) in [("src_cidr", &rule.src_cidr), ("dst_cidr", &rule.dst_cidr)] {
            if let Some(cidr) = cidr {
                validate_cidr(&field(name), cidr, family)?;
            }
        }
    }
    Ok(())
}

/// Check every direction of a network attachment's firewall
pub fn validate_firewall(network: &str, firewall: &FirewallRuleSet) -> Result<(), ProviderError> {
    validate_rule_list(network, "rules_v4_in", 4, &firewall.rules_v4_in)?;
    validate_rule_list(network, "rules_v4_out", 4, &firewall.rules_v4_out)?;
    validate_rule_list(network, "rules_v6_in", 6, &firewall.rules_v6_in)?;
    validate_rule_list(network, "rules_v6_out", 6, &firewall.rules_v6_out)
}

fn validate_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), ProviderError> {
    let mut seen = HashSet::new();
    for id in ids {
        validate_uuid(kind, id)?;
        if !seen.insert(id) {
            return Err(ProviderError::Validation(format!("{} {} is listed more than once", kind, id)));
        }
    }
    Ok(())
}

/// Validate a desired server configuration before anything is sent
pub fn validate_server_config(config: &ServerConfig) -> Result<(), ProviderError> {
    let spec = &config.spec;
    if spec.name.trim().is_empty() {
        return Err(ProviderError::Validation("name must not be empty".to_string()));
    }
    if spec.cores < 1 {
        return Err(ProviderError::Validation("cores must be at least 1".to_string()));
    }
    if spec.memory < 1 {
        return Err(ProviderError::Validation("memory must be at least 1 GB".to_string()));
    }
    validate_uuid("location_uuid", &spec.location_uuid)?;
    if let Some(zone) = &spec.availability_zone {
        validate_one_of("availability_zone", zone, AVAILABILITY_ZONES)?;
    }

    let attachments = &config.attachments;
    if attachments.storages.len() > MAX_STORAGES {
        return Err(ProviderError::Validation(format!(
            "a server can hold at most {} storages, got {}",
            MAX_STORAGES,
            attachments.storages.len()
        )));
    }
    validate_unique("storage", attachments.storages.iter().map(|s| s.object_uuid.as_str()))?;
    if attachments.storages.iter().filter(|s| s.bootdevice).count() > 1 {
        return Err(ProviderError::Validation("only one storage can be the boot device".to_string()));
    }

    if attachments.networks.len() > MAX_NETWORKS {
        return Err(ProviderError::Validation(format!(
            "a server can hold at most {} networks, got {}",
            MAX_NETWORKS,
            attachments.networks.len()
        )));
    }
    validate_unique("network", attachments.networks.iter().map(|n| n.object_uuid.as_str()))?;
    if attachments.networks.iter().filter(|n| n.bootdevice).count() > 1 {
        return Err(ProviderError::Validation("only one network can be the boot device".to_string()));
    }
    for network in &attachments.networks {
        validate_firewall(&network.object_uuid, &network.firewall)?;
    }

    for (field, value) in [
        ("ipv4", &attachments.ipv4),
        ("ipv6", &attachments.ipv6),
        ("isoimage", &attachments.iso_image),
    ] {
        if let Some(id) = value {
            validate_uuid(field, id)?;
        }
    }
    if attachments.ipv4.is_some() && attachments.ipv4 == attachments.ipv6 {
        return Err(ProviderError::Validation(
            "ipv4 and ipv6 must reference different addresses".to_string(),
        ));
    }
    Ok(())
}
