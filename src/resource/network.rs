//! VPC resource

use stackgraph::{PropertyBag, PropertyValue, Resource, ResourceKind, bag};

use super::name_tags;

/// A VPC with one private and one public subnet per availability zone
#[derive(Debug, Clone)]
pub struct Vpc {
    pub name: String,
    pub cidr: String,
    pub max_azs: u32,
    pub nat_gateways: u32,
}

impl Vpc {
    pub fn new(name: &str, cidr: &str) -> Self {
        Self {
            name: name.to_string(),
            cidr: cidr.to_string(),
            max_azs: 2,
            nat_gateways: 1,
        }
    }

    fn subnet(name: &str, subnet_type: &str) -> PropertyValue {
        PropertyValue::Map(bag([
            ("Name", PropertyValue::from(name)),
            ("SubnetType", PropertyValue::from(subnet_type)),
            ("CidrMask", PropertyValue::from(24_i64)),
        ]))
    }
}

impl Resource for Vpc {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Network
    }

    fn description(&self) -> String {
        format!("VPC {} ({})", self.name, self.cidr)
    }

    fn properties(&self) -> PropertyBag {
        bag([
            ("CidrBlock", PropertyValue::from(&self.cidr)),
            ("EnableDnsSupport", PropertyValue::from(true)),
            ("EnableDnsHostnames", PropertyValue::from(true)),
            ("MaxAzs", PropertyValue::from(self.max_azs)),
            ("NatGateways", PropertyValue::from(self.nat_gateways)),
            (
                "SubnetConfiguration",
                PropertyValue::List(vec![
                    Self::subnet("Private", "PRIVATE_WITH_EGRESS"),
                    Self::subnet("Public", "PUBLIC"),
                ]),
            ),
            ("Tags", name_tags(&self.name)),
        ])
    }
}
