//! YAML document forms of a prefix list.
//!
//! Two shapes are accepted and both map to [`PrefixList`]:
//!
//! ```yaml
//! routing:
//!   location: eu-west
//!   prefix:
//!     v4: [{ address: 10.0.0.0, size: 8 }]
//! ```
//!
//! ```yaml
//! metadata: { name: eu-west, namespace: edge }
//! spec:
//!   destination: eu-west
//!   prefix:
//!     v6: [{ address: "2001:db8::", size: 32 }]
//! ```
//!
//! The `routing:` form has no name of its own; the caller supplies one
//! (the file stem for directory sources).

use serde::Deserialize;
use thiserror::Error;

use super::types::{PrefixList, PrefixSet};

/// Errors decoding a prefix list document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("prefix list {0} has an empty destination")]
    EmptyDestination(String),

    #[error("prefix list object has an empty name")]
    EmptyName,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Resource(ResourceDocument),
    Routing(RoutingDocument),
}

#[derive(Debug, Deserialize)]
struct RoutingDocument {
    routing: RoutingInner,
}

#[derive(Debug, Deserialize)]
struct RoutingInner {
    location: String,
    #[serde(default)]
    prefix: PrefixSet,
}

#[derive(Debug, Deserialize)]
struct ResourceDocument {
    metadata: ObjectMeta,
    spec: ResourceSpec,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceSpec {
    destination: String,
    #[serde(default)]
    prefix: PrefixSet,
}

/// Decode a prefix list from YAML text.
pub fn parse_document(text: &str, fallback_name: &str) -> Result<PrefixList, DocumentError> {
    let list = match serde_yaml::from_str::<Document>(text)? {
        Document::Resource(doc) => PrefixList {
            name: doc.metadata.name,
            namespace: doc.metadata.namespace,
            destination: doc.spec.destination,
            prefix: doc.spec.prefix,
        },
        Document::Routing(doc) => PrefixList {
            name: fallback_name.to_string(),
            namespace: None,
            destination: doc.routing.location,
            prefix: doc.routing.prefix,
        },
    };

    if list.name.is_empty() {
        return Err(DocumentError::EmptyName);
    }
    if list.destination.is_empty() {
        return Err(DocumentError::EmptyDestination(list.name));
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::AddressPrefix;

    #[test]
    fn test_routing_form() {
        let yaml = r#"
routing:
  location: eu-west
  prefix:
    v4:
      - address: 10.0.0.0
        size: 8
      - address: 192.0.2.0
        size: 24
    v6:
      - address: "2001:db8::"
        size: 32
"#;
        let list = parse_document(yaml, "eu-west-file").unwrap();
        assert_eq!(list.name, "eu-west-file");
        assert_eq!(list.namespace, None);
        assert_eq!(list.destination, "eu-west");
        assert_eq!(list.prefix.v4.len(), 2);
        assert_eq!(list.prefix.v4[1], AddressPrefix::new("192.0.2.0", 24));
        assert_eq!(list.prefix.v6[0], AddressPrefix::new("2001:db8::", 32));
    }

    #[test]
    fn test_resource_form() {
        let yaml = r#"
metadata:
  name: asia-pacific
  namespace: edge
spec:
  destination: asia
  prefix:
    v6:
      - address: "2001:db8::"
        size: 32
"#;
        let list = parse_document(yaml, "ignored").unwrap();
        assert_eq!(list.name, "asia-pacific");
        assert_eq!(list.namespace.as_deref(), Some("edge"));
        assert_eq!(list.destination, "asia");
        assert!(list.prefix.v4.is_empty());
        assert_eq!(list.prefix.v6.len(), 1);
    }

    #[test]
    fn test_out_of_range_size_still_decodes() {
        // Range checks happen per entry in the adapter.
        let yaml = "routing:\n  location: x\n  prefix:\n    v4:\n      - address: 10.0.0.0\n        size: 99\n";
        let list = parse_document(yaml, "x").unwrap();
        assert_eq!(list.prefix.v4[0].size, 99);
    }

    #[test]
    fn test_empty_destination_rejected() {
        let yaml = "routing:\n  location: \"\"\n";
        assert!(matches!(
            parse_document(yaml, "empty"),
            Err(DocumentError::EmptyDestination(name)) if name == "empty"
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            parse_document("just: [a, list", "bad"),
            Err(DocumentError::Yaml(_))
        ));
        assert!(matches!(
            parse_document("unrelated: 1", "bad"),
            Err(DocumentError::Yaml(_))
        ));
    }
}
