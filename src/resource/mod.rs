//! Typed declarations for the directory environment
//!
//! Each declaration knows its kind and renders its own property bag. Values
//! that only exist after another resource is provisioned are passed in as
//! deferred references, never as names spelled twice.

mod directory;
mod document;
mod iam;
mod instance;
mod network;
mod secret;
mod security_group;

pub use directory::MicrosoftAd;
pub use document::DomainJoinDocument;
pub use iam::{InstanceProfile, Role, SSM_DIRECTORY_SERVICE_ACCESS, SSM_MANAGED_INSTANCE_CORE};
pub use instance::Instance;
pub use network::Vpc;
pub use secret::GeneratedSecret;
pub use security_group::{IngressRule, SecurityGroup};

use stackgraph::{PropertyValue, bag};

/// Standard `Tags` list with a single `Name` tag
fn name_tags(name: &str) -> PropertyValue {
    PropertyValue::List(vec![PropertyValue::Map(bag([
        ("Key", "Name"),
        ("Value", name),
    ]))])
}

/// `{"Fn::Select": [index, list]}` over a list-valued reference
pub fn select(index: i64, list: PropertyValue) -> PropertyValue {
    PropertyValue::Map(bag([(
        "Fn::Select",
        PropertyValue::List(vec![PropertyValue::from(index), list]),
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph::Attribute;

    #[test]
    fn test_select_keeps_reference_nested() {
        let value = select(0, PropertyValue::deferred("Vpc", Attribute::PublicSubnetIds));
        let mut targets = Vec::new();
        value.visit_deferred(&mut |deferred| targets.push(deferred.target.clone()));
        assert_eq!(targets, vec!["Vpc"]);
    }

    #[test]
    fn test_name_tags() {
        assert_eq!(
            serde_json::to_value(name_tags("corp")).unwrap(),
            serde_json::json!([{ "Key": "Name", "Value": "corp" }])
        );
    }
}
