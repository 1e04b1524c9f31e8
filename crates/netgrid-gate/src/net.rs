//! CIDR parsing and address-family helpers.

use std::collections::BTreeSet;

use ipnet::IpNet;
use netgrid_core::NetworkSpec;

use crate::error::ConfigError;

pub const MIN_MTU_IPV4: u32 = 576;
pub const MIN_MTU_IPV6: u32 = 1280;
pub const MAX_MTU: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => IpFamily::V4,
            IpNet::V6(_) => IpFamily::V6,
        }
    }

    pub fn address_bits(&self) -> u32 {
        match self {
            IpFamily::V4 => 32,
            IpFamily::V6 => 128,
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Parse a CIDR, normalising away host bits.
pub fn parse_cidr(field: &str, value: &str) -> Result<IpNet, ConfigError> {
    value
        .trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|e| ConfigError::malformed(field, value, e))
}

/// Parseable cluster network blocks with their host prefix, in order.
/// Malformed entries are skipped; the validator reports them.
pub fn cluster_blocks(spec: &NetworkSpec) -> Vec<(IpNet, u32)> {
    spec.cluster_network
        .iter()
        .filter_map(|e| parse_cidr("spec.clusterNetwork", &e.cidr).ok().map(|n| (n, e.host_prefix)))
        .collect()
}

/// Parseable service network blocks, in order.
pub fn service_blocks(spec: &NetworkSpec) -> Vec<IpNet> {
    spec.service_network
        .iter()
        .filter_map(|c| parse_cidr("spec.serviceNetwork", c).ok())
        .collect()
}

pub fn cluster_families(spec: &NetworkSpec) -> BTreeSet<IpFamily> {
    cluster_blocks(spec).iter().map(|(n, _)| IpFamily::of(n)).collect()
}

pub fn service_families(spec: &NetworkSpec) -> BTreeSet<IpFamily> {
    service_blocks(spec).iter().map(IpFamily::of).collect()
}

/// Whether any part of the pod or service space is IPv6.
pub fn uses_ipv6(spec: &NetworkSpec) -> bool {
    cluster_families(spec).contains(&IpFamily::V6) || service_families(spec).contains(&IpFamily::V6)
}

/// Smallest MTU valid for the spec's address families.
pub fn min_mtu(spec: &NetworkSpec) -> u32 {
    if cluster_families(spec).contains(&IpFamily::V6) {
        MIN_MTU_IPV6
    } else {
        MIN_MTU_IPV4
    }
}

pub fn format_families(families: &BTreeSet<IpFamily>) -> String {
    families
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

pub fn valid_port(port: u32) -> bool {
    (1..=65535).contains(&port)
}
