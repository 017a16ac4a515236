//! Address-range provider: CIDR in, usable host addresses out

use crate::ScanError;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Largest prefix that still leaves usable hosts once the network and
/// broadcast addresses are removed
pub const MAX_PREFIX: u8 = 30;

/// An IPv4 subnet, iterated as its usable host addresses in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    network: Ipv4Addr,
    prefix: u8,
}

impl AddressRange {
    /// Parse `a.b.c.d/prefix`. Host bits in the address are masked off.
    pub fn parse(cidr: &str) -> crate::Result<Self> {
        let cidr = cidr.trim();
        let Some((address, prefix)) = cidr.split_once('/') else {
            return Err(ScanError::InvalidRange(format!(
                "{} is not in CIDR notation",
                cidr
            )));
        };

        // Dotted quads only; shorthand like `10.1/16` is rejected
        let address = Ipv4Addr::from_str(address)
            .map_err(|_| ScanError::InvalidRange(format!("Invalid address in {}", cidr)))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| ScanError::InvalidRange(format!("Invalid prefix in {}", cidr)))?;

        Self::new(address, prefix)
    }

    /// Build a range from any address inside it and a prefix length
    pub fn new(address: Ipv4Addr, prefix: u8) -> crate::Result<Self> {
        if prefix > MAX_PREFIX {
            return Err(ScanError::InvalidRange(format!(
                "{}/{} has no usable host addresses",
                address, prefix
            )));
        }

        let network = Ipv4Network::new(address, prefix)
            .map_err(|e| ScanError::InvalidRange(format!("{}/{}: {}", address, prefix, e)))?;

        Ok(Self {
            network: network.network(),
            prefix,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | self.host_mask())
    }

    /// Number of usable host addresses, `2^(32-prefix) - 2`
    pub fn len(&self) -> usize {
        (self.host_mask() as usize) - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        let ip = u32::from(address);
        ip > u32::from(self.network) && ip < u32::from(self.broadcast())
    }

    /// Usable host addresses, ascending
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let first = u32::from(self.network) + 1;
        let last = u32::from(self.broadcast()) - 1;
        (first..=last).map(Ipv4Addr::from)
    }

    fn host_mask(&self) -> u32 {
        u32::MAX >> self.prefix
    }
}

impl FromStr for AddressRange {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}
