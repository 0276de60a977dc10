//! Resource nodes and the declaration trait
//!
//! A [`ResourceNode`] is one named unit of desired infrastructure state.
//! Typed declarations implement [`Resource`] and are turned into nodes with
//! [`ResourceExt::to_node`].

use crate::error::GraphError;
use crate::value::{Attribute, PropertyBag, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of infrastructure a node declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Network,
    DirectoryService,
    Secret,
    ComputeInstance,
    SecurityGroup,
    AutomationDocument,
    InstanceProfile,
    Role,
}

impl ResourceKind {
    pub const ALL: [Self; 8] = [
        Self::Network,
        Self::DirectoryService,
        Self::Secret,
        Self::ComputeInstance,
        Self::SecurityGroup,
        Self::AutomationDocument,
        Self::InstanceProfile,
        Self::Role,
    ];

    /// Kind name as written in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::DirectoryService => "directory-service",
            Self::Secret => "secret",
            Self::ComputeInstance => "compute-instance",
            Self::SecurityGroup => "security-group",
            Self::AutomationDocument => "automation-document",
            Self::InstanceProfile => "instance-profile",
            Self::Role => "role",
        }
    }

    /// Resource type name understood by the provisioning backend
    pub fn provider_type(&self) -> &'static str {
        match self {
            Self::Network => "AWS::EC2::VPC",
            Self::DirectoryService => "AWS::DirectoryService::MicrosoftAD",
            Self::Secret => "AWS::SecretsManager::Secret",
            Self::ComputeInstance => "AWS::EC2::Instance",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::AutomationDocument => "AWS::SSM::Document",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
            Self::Role => "AWS::IAM::Role",
        }
    }

    /// Attributes the backend generates for this kind
    pub fn attributes(&self) -> &'static [Attribute] {
        use Attribute::*;
        match self {
            Self::Network => &[Identifier, CidrBlock, PrivateSubnetIds, PublicSubnetIds],
            Self::DirectoryService => &[Identifier, Alias, DnsAddresses, DomainName],
            Self::Secret => &[Identifier, Arn, GeneratedPassword],
            Self::ComputeInstance => &[
                Identifier,
                PrivateIp,
                PublicDnsName,
                AvailabilityZone,
            ],
            Self::SecurityGroup => &[Identifier, VpcId],
            Self::AutomationDocument => &[Identifier],
            Self::InstanceProfile => &[Identifier, Arn],
            Self::Role => &[Identifier, Arn],
        }
    }

    /// Whether `attribute` is produced by this kind
    pub fn supports(&self, attribute: Attribute) -> bool {
        self.attributes().contains(&attribute)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = GraphError;

    /// Accepts the kebab-case manifest spelling or the PascalCase variant name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || format!("{kind:?}") == s)
            .ok_or_else(|| GraphError::InvalidKind(s.to_string()))
    }
}

/// A named unit of desired state
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    /// Stable name, unique within a graph
    pub name: String,
    pub kind: ResourceKind,
    /// Desired properties, possibly containing deferred values
    pub properties: PropertyBag,
    /// Names of resources that must be applied first
    pub depends_on: Vec<String>,
}

impl ResourceNode {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: PropertyBag::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.depends_on.contains(&name) {
            self.depends_on.push(name);
        }
        self
    }

    /// A deferred reference to one of this node's attributes
    pub fn reference(&self, attribute: Attribute) -> PropertyValue {
        PropertyValue::deferred(self.name.clone(), attribute)
    }
}

/// Core trait for typed resource declarations
///
/// Implementors describe one resource of a known kind. The graph only ever
/// sees the [`ResourceNode`] produced by [`ResourceExt::to_node`], so a
/// declaration is free to compute its properties from its own fields.
///
/// # Example
///
/// ```
/// use stackgraph::{PropertyBag, Resource, ResourceExt, ResourceKind, bag};
///
/// #[derive(Debug)]
/// struct Vpc { cidr: String }
///
/// impl Resource for Vpc {
///     fn name(&self) -> String { "vpc".into() }
///     fn kind(&self) -> ResourceKind { ResourceKind::Network }
///     fn properties(&self) -> PropertyBag { bag([("CidrBlock", self.cidr.as_str())]) }
/// }
///
/// let node = Vpc { cidr: "10.0.0.0/16".into() }.to_node();
/// assert_eq!(node.name, "vpc");
/// ```
pub trait Resource: fmt::Debug {
    /// Stable name of the resource
    fn name(&self) -> String;

    /// What kind of infrastructure this is
    fn kind(&self) -> ResourceKind;

    /// Human-readable description
    fn description(&self) -> String {
        format!("{} {}", self.kind(), self.name())
    }

    /// Desired properties
    fn properties(&self) -> PropertyBag;

    /// Explicit dependencies beyond those implied by deferred values
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Conversions available on every [`Resource`]
pub trait ResourceExt {
    /// Build the graph node for this declaration
    fn to_node(&self) -> ResourceNode;

    /// A deferred reference to one of this resource's attributes
    fn reference(&self, attribute: Attribute) -> PropertyValue;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn to_node(&self) -> ResourceNode {
        self.depends_on().into_iter().fold(
            ResourceNode::new(self.name(), self.kind()).with_properties(self.properties()),
            ResourceNode::depends_on,
        )
    }

    fn reference(&self, attribute: Attribute) -> PropertyValue {
        PropertyValue::deferred(self.name(), attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::bag;

    #[derive(Debug)]
    struct Role;

    impl Resource for Role {
        fn name(&self) -> String {
            "instance-role".into()
        }

        fn kind(&self) -> ResourceKind {
            ResourceKind::Role
        }

        fn properties(&self) -> PropertyBag {
            bag([("RoleName", "corp-instance-role")])
        }

        fn depends_on(&self) -> Vec<String> {
            vec!["vpc".into(), "vpc".into()]
        }
    }

    #[test]
    fn test_kind_parses_both_spellings() {
        assert_eq!(
            "directory-service".parse::<ResourceKind>().unwrap(),
            ResourceKind::DirectoryService
        );
        assert_eq!(
            "ComputeInstance".parse::<ResourceKind>().unwrap(),
            ResourceKind::ComputeInstance
        );
        assert!("bucket".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_attribute_catalog() {
        assert!(ResourceKind::Secret.supports(Attribute::GeneratedPassword));
        assert!(!ResourceKind::Network.supports(Attribute::GeneratedPassword));
        assert!(ResourceKind::DirectoryService.supports(Attribute::DnsAddresses));
        for kind in ResourceKind::ALL {
            assert!(kind.supports(Attribute::Identifier), "{kind} lacks Identifier");
        }
    }

    #[test]
    fn test_to_node_dedupes_dependencies() {
        let node = Role.to_node();
        assert_eq!(node.name, "instance-role");
        assert_eq!(node.kind, ResourceKind::Role);
        assert_eq!(node.depends_on, vec!["vpc".to_string()]);
        assert_eq!(
            node.properties.get("RoleName"),
            Some(&PropertyValue::from("corp-instance-role"))
        );
    }

    #[test]
    fn test_reference_points_at_resource() {
        assert_eq!(
            Role.reference(Attribute::Arn),
            PropertyValue::deferred("instance-role", Attribute::Arn)
        );
    }
}
