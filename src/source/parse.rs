//! Parsing prefix list pairs into routing table entries.
//!
//! A malformed pair is logged and skipped; the rest of the list is
//! still applied.

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use thiserror::Error;

use super::types::{AddressPrefix, PrefixList};
use crate::observability::metrics;
use crate::routing::PrefixEntry;

/// Errors parsing a single `(address, size)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixParseError {
    #[error("invalid {family} address literal {address:?}")]
    InvalidAddress {
        address: String,
        family: &'static str,
    },

    #[error("mask length {size} out of range 0..={max} for {address}")]
    MaskOutOfRange { address: String, size: i64, max: u8 },
}

fn mask_len(prefix: &AddressPrefix, max: u8) -> Result<u8, PrefixParseError> {
    u8::try_from(prefix.size)
        .ok()
        .filter(|len| *len <= max)
        .ok_or_else(|| PrefixParseError::MaskOutOfRange {
            address: prefix.address.clone(),
            size: prefix.size,
            max,
        })
}

/// Parse a v4 pair. Host bits are truncated.
pub fn parse_v4(prefix: &AddressPrefix) -> Result<Ipv4Net, PrefixParseError> {
    let address: Ipv4Addr =
        prefix
            .address
            .trim()
            .parse()
            .map_err(|_| PrefixParseError::InvalidAddress {
                address: prefix.address.clone(),
                family: "v4",
            })?;
    let len = mask_len(prefix, 32)?;
    Ok(Ipv4Net::new_assert(address, len).trunc())
}

/// Parse a v6 pair. Host bits are truncated.
pub fn parse_v6(prefix: &AddressPrefix) -> Result<Ipv6Net, PrefixParseError> {
    let address: Ipv6Addr =
        prefix
            .address
            .trim()
            .parse()
            .map_err(|_| PrefixParseError::InvalidAddress {
                address: prefix.address.clone(),
                family: "v6",
            })?;
    let len = mask_len(prefix, 128)?;
    Ok(Ipv6Net::new_assert(address, len).trunc())
}

/// Every well-formed entry of `list`, labelled with its destination.
pub fn list_entries(list: &PrefixList) -> Vec<PrefixEntry> {
    let label: std::sync::Arc<str> = list.destination.as_str().into();
    let mut entries = Vec::with_capacity(list.prefix.v4.len() + list.prefix.v6.len());

    for prefix in &list.prefix.v4 {
        match parse_v4(prefix) {
            Ok(net) => entries.push(PrefixEntry::new(net.into(), label.clone())),
            Err(e) => {
                tracing::error!(list = %list.name, error = %e, "Skipping malformed v4 prefix");
                metrics::record_parse_error("v4");
            }
        }
    }

    for prefix in &list.prefix.v6 {
        match parse_v6(prefix) {
            Ok(net) => entries.push(PrefixEntry::new(net.into(), label.clone())),
            Err(e) => {
                tracing::error!(list = %list.name, error = %e, "Skipping malformed v6 prefix");
                metrics::record_parse_error("v6");
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v4() {
        let net = parse_v4(&AddressPrefix::new("10.1.2.3", 8)).unwrap();
        assert_eq!(net.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_parse_v6() {
        let net = parse_v6(&AddressPrefix::new("2001:db8::1", 32)).unwrap();
        assert_eq!(net.to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_wrong_family_rejected() {
        assert!(matches!(
            parse_v4(&AddressPrefix::new("2001:db8::", 32)),
            Err(PrefixParseError::InvalidAddress { family: "v4", .. })
        ));
        assert!(matches!(
            parse_v6(&AddressPrefix::new("10.0.0.0", 8)),
            Err(PrefixParseError::InvalidAddress { family: "v6", .. })
        ));
    }

    #[test]
    fn test_mask_range() {
        assert!(parse_v4(&AddressPrefix::new("0.0.0.0", 0)).is_ok());
        assert!(parse_v4(&AddressPrefix::new("1.2.3.4", 32)).is_ok());
        assert!(matches!(
            parse_v4(&AddressPrefix::new("1.2.3.4", 33)),
            Err(PrefixParseError::MaskOutOfRange { max: 32, .. })
        ));
        assert!(matches!(
            parse_v4(&AddressPrefix::new("1.2.3.4", -1)),
            Err(PrefixParseError::MaskOutOfRange { .. })
        ));
        assert!(parse_v6(&AddressPrefix::new("::", 128)).is_ok());
        assert!(parse_v6(&AddressPrefix::new("::", 129)).is_err());
    }

    #[test]
    fn test_list_entries_skips_malformed() {
        let list = PrefixList::new("mixed", "eu-west")
            .with_v4("10.0.0.0", 8)
            .with_v4("not-an-address", 8)
            .with_v4("192.0.2.0", 40)
            .with_v6("2001:db8::", 32);

        let entries = list_entries(&list);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| &**e.label() == "eu-west"));
        assert_eq!(entries[0].network().to_string(), "10.0.0.0/8");
        assert_eq!(entries[1].network().to_string(), "2001:db8::/32");
    }
}
