//! Effective client address of a DNS request.
//!
//! Precedence: the EDNS(0) Client Subnet address if the option is
//! present, otherwise the transport source. A Client Subnet option that
//! is present but unusable does not fall back to the transport source.

use std::net::IpAddr;

use hickory_proto::error::ProtoError;
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsCode, EdnsOption};

use super::Request;

/// Where the address used for the lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAddress {
    /// Address from the EDNS Client Subnet option.
    Subnet(IpAddr),
    /// Transport source address.
    Transport(IpAddr),
    /// A Client Subnet option was present but could not be used.
    Malformed,
}

impl ClientAddress {
    /// The address to look up, canonicalised so v4-mapped v6 is v4.
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            ClientAddress::Subnet(ip) | ClientAddress::Transport(ip) => Some(ip.to_canonical()),
            ClientAddress::Malformed => None,
        }
    }
}

/// Address and source prefix of a Client Subnet option.
///
/// The option keeps its fields private, so they are read back from the
/// RFC 7871 wire form: FAMILY (2), SOURCE PREFIX (1), SCOPE PREFIX (1),
/// then the address truncated to the source prefix. Encoding fails when
/// the source prefix is wider than the family.
fn subnet_address(subnet: &ClientSubnet) -> Result<(IpAddr, u8), ProtoError> {
    let wire = Vec::<u8>::try_from(subnet)?;
    let (header, address) = wire.split_at(wire.len().min(4));
    let (family, source_prefix) = match header {
        [hi, lo, source_prefix, _scope] => (u16::from_be_bytes([*hi, *lo]), *source_prefix),
        _ => return Err(ProtoError::from("truncated client subnet option")),
    };

    let ip = match family {
        1 => IpAddr::from(widen::<4>(address)?),
        2 => IpAddr::from(widen::<16>(address)?),
        _ => return Err(ProtoError::from("unknown client subnet family")),
    };
    Ok((ip, source_prefix))
}

/// Zero-extend a truncated address to the family width.
fn widen<const W: usize>(address: &[u8]) -> Result<[u8; W], ProtoError> {
    let mut octets = [0u8; W];
    octets
        .get_mut(..address.len())
        .ok_or_else(|| ProtoError::from("client subnet address longer than family"))?
        .copy_from_slice(address);
    Ok(octets)
}

/// Determine the client address for `request`.
pub fn client_address(request: &Request) -> ClientAddress {
    let subnet = request
        .message
        .extensions()
        .as_ref()
        .and_then(|edns| edns.options().get(EdnsCode::Subnet));

    match subnet {
        Some(EdnsOption::Subnet(subnet)) => match subnet_address(subnet) {
            Ok((ip, source_prefix)) => {
                tracing::trace!(address = %ip, prefix = source_prefix, "Client subnet option");
                ClientAddress::Subnet(ip)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Unusable client subnet option");
                ClientAddress::Malformed
            }
        },
        Some(_) => {
            tracing::debug!("Undecodable client subnet option");
            ClientAddress::Malformed
        }
        None => ClientAddress::Transport(request.source.ip()),
    }
}
