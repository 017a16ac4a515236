//! Local interface enumeration, used to pick a default scan target

use crate::network::range::AddressRange;
use crate::ScanError;
use ipnetwork::IpNetwork;
use pnet::datalink::{self, NetworkInterface};
use serde::Serialize;
use std::net::Ipv4Addr;

/// An active, non-loopback IPv4 address bound to a local interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalInterface {
    pub name: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub network: Ipv4Addr,
    pub prefix: u8,
    pub mac: Option<String>,
}

impl LocalInterface {
    /// `network/prefix` string for the attached subnet
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.network, self.prefix)
    }

    /// Usable host range of the attached subnet
    pub fn range(&self) -> crate::Result<AddressRange> {
        AddressRange::new(self.network, self.prefix)
    }
}

/// Every up, non-loopback interface address with an IPv4 network
pub fn list_interfaces() -> Vec<LocalInterface> {
    let interfaces = datalink::interfaces();
    log::debug!("Identified {} network interface(s)", interfaces.len());

    interfaces
        .iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback())
        .flat_map(ipv4_addresses)
        .collect()
}

/// Subnet of the first active interface with usable host addresses
pub fn default_range() -> crate::Result<AddressRange> {
    first_usable_range(&list_interfaces())
}

/// First interface whose subnet has usable hosts. Point-to-point links
/// (/31, /32) are skipped.
pub fn first_usable_range(interfaces: &[LocalInterface]) -> crate::Result<AddressRange> {
    for iface in interfaces {
        match iface.range() {
            Ok(range) => {
                log::info!("Using {} on {} as scan target", iface.cidr(), iface.name);
                return Ok(range);
            }
            Err(e) => log::debug!("Skipping {} ({}): {}", iface.name, iface.cidr(), e),
        }
    }

    Err(ScanError::InvalidRange(
        "No active IPv4 network interface with usable host addresses found".to_string(),
    ))
}

fn ipv4_addresses(iface: &NetworkInterface) -> Vec<LocalInterface> {
    iface
        .ips
        .iter()
        .filter_map(|net| match net {
            IpNetwork::V4(v4) if !v4.ip().is_loopback() => Some(LocalInterface {
                name: iface.name.clone(),
                address: v4.ip(),
                netmask: v4.mask(),
                network: v4.network(),
                prefix: v4.prefix(),
                mac: iface.mac.map(|mac| mac.to_string()),
            }),
            _ => None,
        })
        .collect()
}
