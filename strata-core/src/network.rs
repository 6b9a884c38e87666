//! Per-host network profiles discovered through the node management agent.

use serde::{Deserialize, Serialize};

/// Network profile of one host interface.
///
/// Discovered from the NMA `network-profiles` endpoint and consumed by the
/// node creation and re-IP operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Interface name, e.g. `eth0`.
    pub name: String,
    /// Address bound to the interface.
    pub address: String,
    /// Subnet in CIDR form.
    pub subnet: String,
    /// Netmask.
    pub netmask: String,
    /// Broadcast address.
    pub broadcast: String,
}

impl NetworkProfile {
    /// The first empty field, if any. Every field of a usable profile must
    /// be populated.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("name")
        } else if self.address.is_empty() {
            Some("address")
        } else if self.subnet.is_empty() {
            Some("subnet")
        } else if self.netmask.is_empty() {
            Some("netmask")
        } else if self.broadcast.is_empty() {
            Some("broadcast")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> NetworkProfile {
        NetworkProfile {
            name: "eth0".into(),
            address: "192.168.100.1".into(),
            subnet: "192.168.0.0/16".into(),
            netmask: "255.255.0.0".into(),
            broadcast: "192.168.255.255".into(),
        }
    }

    #[test]
    fn complete_profile_has_no_missing_field() {
        assert_eq!(full_profile().missing_field(), None);
    }

    #[test]
    fn empty_broadcast_is_reported() {
        let mut profile = full_profile();
        profile.broadcast.clear();
        assert_eq!(profile.missing_field(), Some("broadcast"));
    }
}
