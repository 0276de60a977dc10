//! IAM role and instance profile resources

use stackgraph::{PropertyBag, PropertyValue, Resource, ResourceKind, bag};

/// Managed policy letting instances register with Systems Manager
pub const SSM_MANAGED_INSTANCE_CORE: &str = "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore";
/// Managed policy letting instances join a managed directory
pub const SSM_DIRECTORY_SERVICE_ACCESS: &str =
    "arn:aws:iam::aws:policy/AmazonSSMDirectoryServiceAccess";

/// An IAM role assumed by a service
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub service: String,
    pub managed_policies: Vec<String>,
}

impl Role {
    /// A role EC2 instances can assume
    pub fn for_ec2(name: &str) -> Self {
        Self {
            name: name.to_string(),
            service: "ec2.amazonaws.com".to_string(),
            managed_policies: Vec::new(),
        }
    }

    pub fn with_policy(mut self, arn: &str) -> Self {
        self.managed_policies.push(arn.to_string());
        self
    }
}

impl Resource for Role {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Role
    }

    fn description(&self) -> String {
        format!("Role {} for {}", self.name, self.service)
    }

    fn properties(&self) -> PropertyBag {
        let statement = PropertyValue::Map(bag([
            ("Effect", PropertyValue::from("Allow")),
            (
                "Principal",
                PropertyValue::Map(bag([("Service", self.service.as_str())])),
            ),
            ("Action", PropertyValue::from("sts:AssumeRole")),
        ]));
        bag([
            (
                "AssumeRolePolicyDocument",
                PropertyValue::Map(bag([
                    ("Version", PropertyValue::from("2012-10-17")),
                    ("Statement", PropertyValue::List(vec![statement])),
                ])),
            ),
            ("ManagedPolicyArns", PropertyValue::from(self.managed_policies.clone())),
        ])
    }
}

/// An instance profile wrapping one role
#[derive(Debug, Clone)]
pub struct InstanceProfile {
    pub name: String,
    /// Reference to the role's identifier
    pub role: PropertyValue,
}

impl InstanceProfile {
    pub fn new(name: &str, role: PropertyValue) -> Self {
        Self {
            name: name.to_string(),
            role,
        }
    }
}

impl Resource for InstanceProfile {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::InstanceProfile
    }

    fn properties(&self) -> PropertyBag {
        bag([("Roles", PropertyValue::List(vec![self.role.clone()]))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph::{Attribute, ResourceExt};

    #[test]
    fn test_role_policies() {
        let role = Role::for_ec2("InstanceRole")
            .with_policy(SSM_MANAGED_INSTANCE_CORE)
            .with_policy(SSM_DIRECTORY_SERVICE_ACCESS);
        let props = role.properties();
        assert_eq!(props["ManagedPolicyArns"].as_list().map(<[_]>::len), Some(2));
        assert_eq!(role.kind(), ResourceKind::Role);
    }

    #[test]
    fn test_profile_references_role() {
        let role = Role::for_ec2("InstanceRole");
        let profile = InstanceProfile::new("Profile", role.reference(Attribute::Identifier));
        let roles = profile.properties();
        assert_eq!(
            roles["Roles"].as_list().unwrap()[0],
            PropertyValue::deferred("InstanceRole", Attribute::Identifier)
        );
    }
}
