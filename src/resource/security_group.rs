//! Security group resource

use stackgraph::{PropertyBag, PropertyValue, Resource, ResourceKind, bag};

/// One inbound rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub port: u16,
    pub cidr: String,
}

impl IngressRule {
    pub fn tcp(port: u16, cidr: &str) -> Self {
        Self {
            protocol: "tcp".to_string(),
            port,
            cidr: cidr.to_string(),
        }
    }

    fn to_property(&self) -> PropertyValue {
        PropertyValue::Map(bag([
            ("IpProtocol", PropertyValue::from(&self.protocol)),
            ("FromPort", PropertyValue::from(self.port)),
            ("ToPort", PropertyValue::from(self.port)),
            ("CidrIp", PropertyValue::from(&self.cidr)),
        ]))
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroup {
    pub name: String,
    pub description: String,
    /// Reference to the VPC identifier
    pub vpc: PropertyValue,
    pub ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    pub fn new(name: &str, description: &str, vpc: PropertyValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            vpc,
            ingress: Vec::new(),
        }
    }

    pub fn allow(mut self, rule: IngressRule) -> Self {
        if !self.ingress.contains(&rule) {
            self.ingress.push(rule);
        }
        self
    }
}

impl Resource for SecurityGroup {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::SecurityGroup
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn properties(&self) -> PropertyBag {
        bag([
            ("GroupDescription", PropertyValue::from(&self.description)),
            ("VpcId", self.vpc.clone()),
            (
                "SecurityGroupIngress",
                PropertyValue::List(self.ingress.iter().map(IngressRule::to_property).collect()),
            ),
        ])
    }
}
