//! Typed server configuration and the diff between two configurations
//!
//! The adapter produces these types from host attributes (desired state) and
//! from the remote server (current state); the reconciler only ever sees them.

use crate::validation::HardwareProfile;
use gridscale_client::{FirewallRuleProperties, FirewallRules};
use serde::{Deserialize, Serialize};

/// Firewall rule verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallAction {
    Allow,
    #[default]
    Drop,
}

impl FirewallAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Drop => "drop",
        }
    }
}

/// Transport protocol a rule matches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallProtocol {
    Tcp,
    Udp,
}

impl FirewallProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// One firewall rule; rules are evaluated by ascending `order`, first match wins
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FirewallRule {
    pub order: i64,
    pub action: FirewallAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<FirewallProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl FirewallRule {
    /// Drop empty optional strings so that "" and unset compare equal
    fn normalized(mut self) -> Self {
        self.dst_port = non_empty(&self.dst_port);
        self.src_port = non_empty(&self.src_port);
        self.src_cidr = non_empty(&self.src_cidr);
        self.dst_cidr = non_empty(&self.dst_cidr);
        self.comment = non_empty(&self.comment);
        self
    }

    pub fn to_api(&self) -> FirewallRuleProperties {
        FirewallRuleProperties {
            order: self.order,
            action: self.action.as_str().to_string(),
            protocol: self.protocol.map(|p| p.as_str().to_string()),
            dst_port: self.dst_port.clone(),
            src_port: self.src_port.clone(),
            src_cidr: self.src_cidr.clone(),
            dst_cidr: self.dst_cidr.clone(),
            comment: self.comment.clone(),
        }
    }

    pub fn from_api(rule: &FirewallRuleProperties) -> Self {
        let action = if rule.action == "allow" {
            FirewallAction::Allow
        } else {
            FirewallAction::Drop
        };
        let protocol = match rule.protocol.as_deref() {
            Some("tcp") => Some(FirewallProtocol::Tcp),
            Some("udp") => Some(FirewallProtocol::Udp),
            _ => None,
        };
        Self {
            order: rule.order,
            action,
            protocol,
            dst_port: rule.dst_port.clone(),
            src_port: rule.src_port.clone(),
            src_cidr: rule.src_cidr.clone(),
            dst_cidr: rule.dst_cidr.clone(),
            comment: rule.comment.clone(),
        }
        .normalized()
    }
}

/// The four ordered rule lists of a network attachment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallRuleSet {
    pub rules_v4_in: Vec<FirewallRule>,
    pub rules_v4_out: Vec<FirewallRule>,
    pub rules_v6_in: Vec<FirewallRule>,
    pub rules_v6_out: Vec<FirewallRule>,
}

fn canonical(rules: Vec<FirewallRule>) -> Vec<FirewallRule> {
    let mut rules: Vec<FirewallRule> = rules.into_iter().map(FirewallRule::normalized).collect();
    rules.sort_by_key(|r| r.order);
    rules
}

impl FirewallRuleSet {
    /// Sort each direction by order so that equal rule sets compare equal
    pub fn canonical(self) -> Self {
        Self {
            rules_v4_in: canonical(self.rules_v4_in),
            rules_v4_out: canonical(self.rules_v4_out),
            rules_v6_in: canonical(self.rules_v6_in),
            rules_v6_out: canonical(self.rules_v6_out),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules_v4_in.is_empty()
            && self.rules_v4_out.is_empty()
            && self.rules_v6_in.is_empty()
            && self.rules_v6_out.is_empty()
    }

    pub fn to_api(&self) -> FirewallRules {
        let convert = |rules: &[FirewallRule]| rules.iter().map(FirewallRule::to_api).collect();
        FirewallRules {
            rules_v4_in: convert(&self.rules_v4_in),
            rules_v4_out: convert(&self.rules_v4_out),
            rules_v6_in: convert(&self.rules_v6_in),
            rules_v6_out: convert(&self.rules_v6_out),
        }
    }

    pub fn from_api(rules: Option<&FirewallRules>) -> Self {
        let Some(rules) = rules else {
            return Self::default();
        };
        let convert = |rules: &[FirewallRuleProperties]| rules.iter().map(FirewallRule::from_api).collect();
        Self {
            rules_v4_in: convert(&rules.rules_v4_in),
            rules_v4_out: convert(&rules.rules_v4_out),
            rules_v6_in: convert(&rules.rules_v6_in),
            rules_v6_out: convert(&rules.rules_v6_out),
        }
        .canonical()
    }
}

/// A storage linked to a server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageAttachment {
    pub object_uuid: String,
    pub bootdevice: bool,
}

/// A (non-public) network linked to a server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkAttachment {
    pub object_uuid: String,
    pub bootdevice: bool,
    pub firewall: FirewallRuleSet,
}

/// Everything linked to a server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttachmentSet {
    pub storages: Vec<StorageAttachment>,
    pub networks: Vec<NetworkAttachment>,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub iso_image: Option<String>,
    /// Whether the server is (or must be) on the public network
    pub public_network: bool,
}

/// Scalar server settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerSpec {
    pub name: String,
    pub cores: u32,
    /// Memory in GB
    pub memory: u32,
    pub location_uuid: String,
    pub hardware_profile: HardwareProfile,
    /// Legacy servers cannot be hot-plugged
    pub legacy: bool,
    pub power: bool,
    pub availability_zone: Option<String>,
    pub labels: Vec<String>,
}

/// A complete server configuration, desired or current
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerConfig {
    pub spec: ServerSpec,
    pub attachments: AttachmentSet,
}

/// Attachments identified by the UUID of the linked object
pub trait Keyed {
    fn key(&self) -> &str;
    fn is_boot(&self) -> bool;
}

impl Keyed for StorageAttachment {
    fn key(&self) -> &str {
        &self.object_uuid
    }

    fn is_boot(&self) -> bool {
        self.bootdevice
    }
}

impl Keyed for NetworkAttachment {
    fn key(&self) -> &str {
        &self.object_uuid
    }

    fn is_boot(&self) -> bool {
        self.bootdevice
    }
}

/// Set difference of two attachment lists keyed by UUID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// In old only
    pub to_unlink: Vec<T>,
    /// In new only, boot device first
    pub to_link: Vec<T>,
    /// In both, but with different settings (new value)
    pub to_update: Vec<T>,
}

impl<T: Keyed + Clone + PartialEq> SetDiff<T> {
    pub fn between(old: &[T], new: &[T]) -> Self {
        let find = |list: &[T], key: &str| list.iter().position(|item| item.key() == key);

        let to_unlink = old.iter().filter(|o| find(new, o.key()).is_none()).cloned().collect();
        let mut to_link: Vec<T> = new.iter().filter(|n| find(old, n.key()).is_none()).cloned().collect();
        boot_first(&mut to_link);
        let to_update = new
            .iter()
            .filter(|n| find(old, n.key()).is_some_and(|i| old[i] != **n))
            .cloned()
            .collect();

        Self {
            to_unlink,
            to_link,
            to_update,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_unlink.is_empty() && self.to_link.is_empty() && self.to_update.is_empty()
    }
}

/// Stable sort putting the boot device in front
pub fn boot_first<T: Keyed>(items: &mut [T]) {
    items.sort_by_key(|item| !item.is_boot());
}

/// Everything that differs between the current and the desired configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// name, cores, memory, availability zone or labels differ
    pub fields_changed: bool,
    pub cores_decreased: bool,
    pub memory_decreased: bool,
    pub cores_or_memory_changed: bool,
    /// Legacy flag of the current server
    pub legacy: bool,
    pub iso_image_changed: bool,
    pub ipv4_changed: bool,
    pub ipv6_changed: bool,
    pub storages: SetDiff<StorageAttachment>,
    pub networks: SetDiff<NetworkAttachment>,
}

impl ChangeSet {
    pub fn between(old: &ServerConfig, new: &ServerConfig) -> Self {
        let (o, n) = (&old.spec, &new.spec);
        let cores_or_memory_changed = o.cores != n.cores || o.memory != n.memory;
        let mut old_labels = o.labels.clone();
        let mut new_labels = n.labels.clone();
        old_labels.sort();
        new_labels.sort();

        Self {
            fields_changed: o.name != n.name
                || cores_or_memory_changed
                || (n.availability_zone.is_some() && o.availability_zone != n.availability_zone)
                || old_labels != new_labels,
            cores_decreased: n.cores < o.cores,
            memory_decreased: n.memory < o.memory,
            cores_or_memory_changed,
            legacy: o.legacy,
            iso_image_changed: old.attachments.iso_image != new.attachments.iso_image,
            ipv4_changed: old.attachments.ipv4 != new.attachments.ipv4,
            ipv6_changed: old.attachments.ipv6 != new.attachments.ipv6,
            storages: SetDiff::between(&old.attachments.storages, &new.attachments.storages),
            networks: SetDiff::between(&old.attachments.networks, &new.attachments.networks),
        }
    }

    /// Whether the server has to be powered off before the change is applied
    pub fn requires_shutdown(&self) -> bool {
        self.cores_decreased
            || self.memory_decreased
            || (self.legacy && self.cores_or_memory_changed)
            || self.ipv4_changed
            || self.ipv6_changed
            || !self.storages.is_empty()
            || !self.networks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(id: &str, boot: bool) -> StorageAttachment {
        StorageAttachment {
            object_uuid: id.to_string(),
            bootdevice: boot,
        }
    }

    #[test]
    fn test_set_diff_by_uuid() {
        let old = vec![storage("a", true), storage("b", false)];
        let new = vec![storage("c", false), storage("b", false), storage("d", true)];

        let diff = SetDiff::between(&old, &new);
        assert_eq!(diff.to_unlink, vec![storage("a", true)]);
        assert_eq!(diff.to_link, vec![storage("d", true), storage("c", false)]);
        assert!(diff.to_update.is_empty());
    }

    #[test]
    fn test_set_diff_ignores_order() {
        let old = vec![storage("a", false), storage("b", false)];
        let new = vec![storage("b", false), storage("a", false)];
        assert!(SetDiff::between(&old, &new).is_empty());
    }

    #[test]
    fn test_set_diff_reports_changed_boot_flag_as_update() {
        let old = vec![storage("a", false)];
        let new = vec![storage("a", true)];
        let diff = SetDiff::between(&old, &new);
        assert!(diff.to_link.is_empty());
        assert!(diff.to_unlink.is_empty());
        assert_eq!(diff.to_update, vec![storage("a", true)]);
    }

    #[test]
    fn test_firewall_canonical_form_ignores_rule_order_and_empty_strings() {
        let rule = |order, comment: Option<&str>| FirewallRule {
            order,
            action: FirewallAction::Allow,
            comment: comment.map(str::to_string),
            ..Default::default()
        };
        let a = FirewallRuleSet {
            rules_v4_in: vec![rule(2, Some("")), rule(1, None)],
            ..Default::default()
        }
        .canonical();
        let b = FirewallRuleSet {
            rules_v4_in: vec![rule(1, None), rule(2, None)],
            ..Default::default()
        }
        .canonical();
        assert_eq!(a, b);
    }

    #[test]
    fn test_firewall_api_conversion() {
        let set = FirewallRuleSet {
            rules_v6_out: vec![FirewallRule {
                order: 5,
                action: FirewallAction::Allow,
                protocol: Some(FirewallProtocol::Udp),
                dst_port: Some("53".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let api = set.to_api();
        assert_eq!(api.rules_v6_out[0].action, "allow");
        assert_eq!(api.rules_v6_out[0].protocol.as_deref(), Some("udp"));
        assert_eq!(FirewallRuleSet::from_api(Some(&api)), set);
        assert!(FirewallRuleSet::from_api(None).is_empty());
    }
}
