//! Domain join automation document

use stackgraph::{PropertyBag, PropertyValue, Resource, ResourceKind, bag};

/// A Systems Manager command document joining instances to a directory
///
/// The document body embeds references to the directory's identifier, name
/// and DNS addresses; they are compiled into apply-time references together
/// with the rest of the plan.
#[derive(Debug, Clone)]
pub struct DomainJoinDocument {
    pub name: String,
    pub directory_id: PropertyValue,
    pub domain_name: PropertyValue,
    pub dns_addresses: PropertyValue,
}

impl Resource for DomainJoinDocument {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::AutomationDocument
    }

    fn description(&self) -> String {
        "Join instances to the managed directory".to_string()
    }

    fn properties(&self) -> PropertyBag {
        let join = bag([
            ("directoryId", self.directory_id.clone()),
            ("directoryName", self.domain_name.clone()),
            ("dnsIpAddresses", self.dns_addresses.clone()),
        ]);
        let content = bag([
            ("schemaVersion", PropertyValue::from("1.2")),
            ("description", PropertyValue::from(self.description())),
            (
                "runtimeConfig",
                PropertyValue::Map(bag([(
                    "aws:domainJoin",
                    PropertyValue::Map(bag([("properties", join)])),
                )])),
            ),
        ]);
        bag([
            ("DocumentType", PropertyValue::from("Command")),
            ("Content", PropertyValue::Map(content)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph::{Attribute, DeferredValue};

    #[test]
    fn test_document_embeds_directory_references() {
        let doc = DomainJoinDocument {
            name: "DomainJoin".into(),
            directory_id: PropertyValue::deferred("Directory", Attribute::Identifier),
            domain_name: PropertyValue::deferred("Directory", Attribute::DomainName),
            dns_addresses: PropertyValue::deferred("Directory", Attribute::DnsAddresses),
        };

        let mut found: Vec<DeferredValue> = Vec::new();
        for value in doc.properties().values() {
            value.visit_deferred(&mut |d| found.push(d.clone()));
        }
        let attributes: Vec<_> = found.iter().map(|d| d.attribute).collect();
        assert_eq!(
            attributes,
            vec![Attribute::Identifier, Attribute::DomainName, Attribute::DnsAddresses]
        );
    }
}
