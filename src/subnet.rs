use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network that production workloads live in, e.g. `172.31.192.0/18`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductionRange {
    network: Ipv4Addr,
    prefix: u8,
}

#[derive(Debug, PartialEq)]
pub struct ParseRangeError(String);

impl fmt::Display for ParseRangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid CIDR range: {}", self.0)
    }
}

impl std::error::Error for ParseRangeError {}

impl FromStr for ProductionRange {
    type Err = ParseRangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (address, prefix) =
            split_cidr(value).ok_or_else(|| ParseRangeError(value.to_string()))?;
        let prefix = prefix.ok_or_else(|| ParseRangeError(value.to_string()))?;
        Ok(ProductionRange {
            network: Ipv4Addr::from(u32::from(address) & mask(prefix)),
            prefix,
        })
    }
}

impl ProductionRange {
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & mask(self.prefix) == u32::from(self.network)
    }

    /// Whether the network address of `cidr_block` falls inside this range.
    /// Accepts either a bare address or `address/prefix`.
    pub fn contains_block(&self, cidr_block: &str) -> bool {
        split_cidr(cidr_block).map_or(false, |(address, _)| self.contains(address))
    }
}

fn split_cidr(value: &str) -> Option<(Ipv4Addr, Option<u8>)> {
    let mut parts = value.trim().splitn(2, '/');
    let address = parts.next()?.parse::<Ipv4Addr>().ok()?;
    match parts.next() {
        None => Some((address, None)),
        Some(prefix) => match prefix.parse::<u8>() {
            Ok(prefix) if prefix <= 32 => Some((address, Some(prefix))),
            _ => None,
        },
    }
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}
