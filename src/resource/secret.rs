//! Generated secret resource

use stackgraph::{PropertyBag, PropertyValue, Resource, ResourceKind, SECRET_PASSWORD_KEY, bag};

/// A secret whose password is generated by the backend
///
/// The password is stored under [`SECRET_PASSWORD_KEY`] so that
/// `GeneratedPassword` references resolve to the generated field.
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    pub name: String,
    pub username: String,
    pub length: u32,
    pub exclude_punctuation: bool,
}

impl GeneratedSecret {
    pub fn new(name: &str, username: &str) -> Self {
        Self {
            name: name.to_string(),
            username: username.to_string(),
            length: 32,
            exclude_punctuation: true,
        }
    }
}

impl Resource for GeneratedSecret {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Secret
    }

    fn description(&self) -> String {
        format!("Generated credentials for {}", self.username)
    }

    fn properties(&self) -> PropertyBag {
        let template = serde_json::json!({ "username": self.username }).to_string();
        bag([
            ("Description", PropertyValue::from(self.description())),
            (
                "GenerateSecretString",
                PropertyValue::Map(bag([
                    ("SecretStringTemplate", PropertyValue::from(template)),
                    ("GenerateStringKey", PropertyValue::from(SECRET_PASSWORD_KEY)),
                    ("PasswordLength", PropertyValue::from(self.length)),
                    ("ExcludePunctuation", PropertyValue::from(self.exclude_punctuation)),
                ])),
            ),
        ])
    }
}
