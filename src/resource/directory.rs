//! Managed Microsoft AD resource

use stackgraph::{PropertyBag, PropertyValue, Resource, ResourceKind, bag};

/// A managed Microsoft Active Directory
///
/// `password` is normally a `GeneratedPassword` reference to a secret, so the
/// plaintext never appears in the plan.
#[derive(Debug, Clone)]
pub struct MicrosoftAd {
    pub name: String,
    pub domain_name: String,
    pub edition: String,
    pub short_name: Option<String>,
    pub password: PropertyValue,
    pub vpc: PropertyValue,
    pub subnets: PropertyValue,
}

impl Resource for MicrosoftAd {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::DirectoryService
    }

    fn description(&self) -> String {
        format!("Microsoft AD {} ({})", self.domain_name, self.edition)
    }

    fn properties(&self) -> PropertyBag {
        let mut props = bag([
            ("Name", PropertyValue::from(&self.domain_name)),
            ("Edition", PropertyValue::from(&self.edition)),
            ("Password", self.password.clone()),
            (
                "VpcSettings",
                PropertyValue::Map(bag([
                    ("VpcId", self.vpc.clone()),
                    ("SubnetIds", self.subnets.clone()),
                ])),
            ),
        ]);
        if let Some(short) = &self.short_name {
            props.insert("ShortName".into(), short.into());
        }
        props
    }
}
