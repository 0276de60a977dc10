//! Compute instance resource

use stackgraph::{PropertyBag, PropertyValue, Resource, ResourceKind, bag};

/// An EC2 instance
#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    pub instance_type: String,
    pub image_id: String,
    pub key_pair: Option<String>,
    pub subnet: PropertyValue,
    pub security_groups: Vec<PropertyValue>,
    pub instance_profile: PropertyValue,
    /// Documents associated with the instance at launch
    pub documents: Vec<PropertyValue>,
    /// Resources to wait for that no property refers to
    pub after: Vec<String>,
}

impl Resource for Instance {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ComputeInstance
    }

    fn description(&self) -> String {
        format!("{} instance {}", self.instance_type, self.name)
    }

    fn properties(&self) -> PropertyBag {
        let mut props = bag([
            ("InstanceType", PropertyValue::from(&self.instance_type)),
            ("ImageId", PropertyValue::from(&self.image_id)),
            ("SubnetId", self.subnet.clone()),
            ("SecurityGroupIds", PropertyValue::List(self.security_groups.clone())),
            ("IamInstanceProfile", self.instance_profile.clone()),
            (
                "SsmAssociations",
                PropertyValue::List(
                    self.documents
                        .iter()
                        .map(|doc| PropertyValue::Map(bag([("DocumentName", doc.clone())])))
                        .collect(),
                ),
            ),
            ("Tags", super::name_tags(&self.name)),
        ]);
        if let Some(key) = &self.key_pair {
            props.insert("KeyName".into(), key.into());
        }
        props
    }

    fn depends_on(&self) -> Vec<String> {
        self.after.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph::{Attribute, ResourceExt};

    fn instance() -> Instance {
        Instance {
            name: "JumpBox".into(),
            instance_type: "t3.medium".into(),
            image_id: "ami-123".into(),
            key_pair: Some("ops".into()),
            subnet: PropertyValue::deferred("Vpc", Attribute::PublicSubnetIds),
            security_groups: vec![PropertyValue::deferred("Sg", Attribute::Identifier)],
            instance_profile: PropertyValue::deferred("Profile", Attribute::Identifier),
            documents: vec![PropertyValue::deferred("DomainJoin", Attribute::Identifier)],
            after: vec!["Directory".into()],
        }
    }

    #[test]
    fn test_instance_node() {
        let node = instance().to_node();
        assert_eq!(node.depends_on, vec!["Directory"]);
        assert_eq!(node.properties["KeyName"].as_str(), Some("ops"));

        let mut targets = Vec::new();
        for value in node.properties.values() {
            value.visit_deferred(&mut |d| targets.push(d.target.clone()));
        }
        assert_eq!(targets.len(), 4);
    }

    #[test]
    fn test_key_pair_is_optional() {
        let mut bare = instance();
        bare.key_pair = None;
        assert!(!bare.properties().contains_key("KeyName"));
    }
}
