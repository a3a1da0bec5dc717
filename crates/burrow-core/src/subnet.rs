use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid CIDR subnet '{0}'")]
pub struct SubnetParseError(String);

/// A CIDR block whose members may read internal statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedSubnet {
    network: IpAddr,
    prefix_len: u8,
}

impl TrustedSubnet {
    pub fn new(network: IpAddr, prefix_len: u8) -> Result<Self, SubnetParseError> {
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(SubnetParseError(format!("{network}/{prefix_len}")));
        }
        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Whether `ip` lies inside the block. Mixed address families never match.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (ip, self.network) {
            (IpAddr::V4(ip), IpAddr::V4(net)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                let ip_bits = u32::from_be_bytes(ip.octets());
                let net_bits = u32::from_be_bytes(net.octets());
                (ip_bits & mask) == (net_bits & mask)
            }
            (IpAddr::V6(ip), IpAddr::V6(net)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                let ip_bits = u128::from_be_bytes(ip.octets());
                let net_bits = u128::from_be_bytes(net.octets());
                (ip_bits & mask) == (net_bits & mask)
            }
            _ => false,
        }
    }

    /// Parses `raw` as an address and checks membership. Unparseable input
    /// is treated as outside the block.
    pub fn contains_str(&self, raw: &str) -> bool {
        raw.trim()
            .parse::<IpAddr>()
            .is_ok_and(|ip| self.contains(&ip))
    }
}

impl FromStr for TrustedSubnet {
    type Err = SubnetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SubnetParseError(s.to_string());

        let (network, prefix_len) = s.trim().split_once('/').ok_or_else(invalid)?;
        let network: IpAddr = network.parse().map_err(|_| invalid())?;
        let prefix_len: u8 = prefix_len.parse().map_err(|_| invalid())?;

        Self::new(network, prefix_len).map_err(|_| invalid())
    }
}

impl Display for TrustedSubnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}
