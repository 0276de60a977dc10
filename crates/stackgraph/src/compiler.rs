//! Document compiler - replaces deferred values with wire-level references
//!
//! The provisioning backend substitutes generated values at apply time. The
//! compiler's job is to turn every [`PropertyValue::Deferred`] and
//! [`PropertyValue::Import`] into the tagged construct the backend
//! understands, leaving literals untouched. Compilation never mutates its
//! input and is deterministic, so the same declared stack always yields the
//! same plan.

use crate::error::{GraphError, Result};
use crate::graph::DependencyGraph;
use crate::node::ResourceKind;
use crate::value::{Attribute, DeferredValue, PropertyBag, PropertyValue, bag};

/// Key the generated password lives under inside a generated secret
pub const SECRET_PASSWORD_KEY: &str = "password";

/// A reference the backend resolves during apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireReference {
    /// The backend-generated identifier of a resource
    Ref { target: String },
    /// A generated attribute of a resource
    GetAtt {
        target: String,
        attribute: &'static str,
    },
    /// A secret field read only when the consumer is applied
    SecretValue { target: String, key: &'static str },
    /// A value exported by another stack
    Import { export: String },
}

impl WireReference {
    /// Build the reference for a deferred value pointing at a resource of `kind`
    pub fn for_deferred(kind: ResourceKind, deferred: &DeferredValue) -> Result<Self> {
        if !kind.supports(deferred.attribute) {
            return Err(GraphError::UnresolvableReference {
                target: deferred.target.clone(),
                attribute: deferred.attribute,
                reason: format!("a {kind} does not produce {}", deferred.attribute),
            });
        }

        let target = deferred.target.clone();
        Ok(match deferred.attribute {
            Attribute::Identifier => Self::Ref { target },
            Attribute::GeneratedPassword => Self::SecretValue {
                target,
                key: SECRET_PASSWORD_KEY,
            },
            other => Self::GetAtt {
                target,
                attribute: other.wire_name(),
            },
        })
    }

    /// The tagged property tree for this reference
    pub fn to_property(&self) -> PropertyValue {
        match self {
            Self::Ref { target } => PropertyValue::Map(bag([("Ref", target.as_str())])),
            Self::GetAtt { target, attribute } => PropertyValue::Map(bag([(
                "Fn::GetAtt",
                PropertyValue::from(vec![target.as_str(), *attribute]),
            )])),
            Self::SecretValue { target, key } => {
                let parts = vec![
                    PropertyValue::from("{{resolve:secretsmanager:"),
                    Self::Ref {
                        target: target.clone(),
                    }
                    .to_property(),
                    PropertyValue::from(format!(":SecretString:{key}}}}}")),
                ];
                PropertyValue::Map(bag([(
                    "Fn::Join",
                    PropertyValue::List(vec![PropertyValue::from(""), PropertyValue::List(parts)]),
                )]))
            }
            Self::Import { export } => {
                PropertyValue::Map(bag([("Fn::ImportValue", export.as_str())]))
            }
        }
    }
}

/// Resolve a deferred value against `graph`
pub fn reference_for(graph: &DependencyGraph, deferred: &DeferredValue) -> Result<WireReference> {
    let target = graph
        .node(&deferred.target)
        .ok_or_else(|| GraphError::UnresolvableReference {
            target: deferred.target.clone(),
            attribute: deferred.attribute,
            reason: "no such resource in this stack".to_string(),
        })?;
    WireReference::for_deferred(target.kind, deferred)
}

/// Compile a property bag against `graph`
///
/// Returns a structurally identical bag in which every deferred value and
/// import has been replaced by its wire-level reference. Compiling a bag
/// that contains no references returns an equal bag.
pub fn compile(bag: &PropertyBag, graph: &DependencyGraph) -> Result<PropertyBag> {
    bag.iter()
        .map(|(key, value)| Ok((key.clone(), compile_value(value, graph)?)))
        .collect()
}

/// Compile a single value, recursing through lists and maps
pub fn compile_value(value: &PropertyValue, graph: &DependencyGraph) -> Result<PropertyValue> {
    Ok(match value {
        PropertyValue::Deferred(deferred) => reference_for(graph, deferred)?.to_property(),
        PropertyValue::Import(export) => WireReference::Import {
            export: export.clone(),
        }
        .to_property(),
        PropertyValue::List(items) => PropertyValue::List(
            items
                .iter()
                .map(|item| compile_value(item, graph))
                .collect::<Result<_>>()?,
        ),
        PropertyValue::Map(inner) => PropertyValue::Map(compile(inner, graph)?),
        literal => literal.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ResourceNode;
    use serde_json::json;

    fn graph() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph
            .add_node(ResourceNode::new("admin-secret", ResourceKind::Secret))
            .unwrap();
        graph
            .add_node(ResourceNode::new("directory", ResourceKind::DirectoryService))
            .unwrap();
        graph
    }

    fn to_json(bag: &PropertyBag) -> serde_json::Value {
        serde_json::to_value(bag).unwrap()
    }

    #[test]
    fn test_compiles_nested_document() {
        let document = bag([(
            "Content",
            PropertyValue::Map(bag([(
                "mainSteps",
                PropertyValue::List(vec![PropertyValue::Map(bag([(
                    "inputs",
                    PropertyValue::Map(bag([
                        (
                            "directoryId",
                            PropertyValue::deferred("directory", Attribute::Identifier),
                        ),
                        ("directoryName", PropertyValue::from("corp.example.com")),
                        (
                            "dnsIpAddresses",
                            PropertyValue::deferred("directory", Attribute::DnsAddresses),
                        ),
                    ])),
                )]))]),
            )])),
        )]);

        let compiled = compile(&document, &graph()).unwrap();
        assert_eq!(
            to_json(&compiled),
            json!({
                "Content": {
                    "mainSteps": [{
                        "inputs": {
                            "directoryId": { "Ref": "directory" },
                            "directoryName": "corp.example.com",
                            "dnsIpAddresses": { "Fn::GetAtt": ["directory", "DnsIpAddresses"] }
                        }
                    }]
                }
            })
        );
    }

    #[test]
    fn test_generated_password_resolves_at_apply_time() {
        let props = bag([(
            "Password",
            PropertyValue::deferred("admin-secret", Attribute::GeneratedPassword),
        )]);
        let compiled = compile(&props, &graph()).unwrap();
        assert_eq!(
            to_json(&compiled),
            json!({
                "Password": {
                    "Fn::Join": ["", [
                        "{{resolve:secretsmanager:",
                        { "Ref": "admin-secret" },
                        ":SecretString:password}}"
                    ]]
                }
            })
        );
    }

    #[test]
    fn test_import_compiles_to_import_value() {
        let props = bag([("VpcId", PropertyValue::import("vpc-id"))]);
        let compiled = compile(&props, &graph()).unwrap();
        assert_eq!(to_json(&compiled), json!({ "VpcId": { "Fn::ImportValue": "vpc-id" } }));
    }

    #[test]
    fn test_missing_target_is_unresolvable() {
        let props = bag([("VpcId", PropertyValue::deferred("vpc", Attribute::Identifier))]);
        assert!(matches!(
            compile(&props, &graph()),
            Err(GraphError::UnresolvableReference { target, .. }) if target == "vpc"
        ));
    }

    #[test]
    fn test_attribute_must_match_kind() {
        let props = bag([(
            "Password",
            PropertyValue::deferred("directory", Attribute::GeneratedPassword),
        )]);
        assert!(matches!(
            compile(&props, &graph()),
            Err(GraphError::UnresolvableReference { attribute: Attribute::GeneratedPassword, .. })
        ));
    }

    #[test]
    fn test_compiling_compiled_bag_is_identity() {
        let props = bag([
            ("Id", PropertyValue::deferred("directory", Attribute::Identifier)),
            ("Alias", PropertyValue::deferred("directory", Attribute::Alias)),
            ("Size", PropertyValue::from(3_i64)),
        ]);
        let graph = graph();
        let once = compile(&props, &graph).unwrap();
        let twice = compile(&once, &graph).unwrap();
        assert_eq!(once, twice);
        assert!(once.values().all(PropertyValue::is_resolved));
    }

    #[test]
    fn test_equal_inputs_compile_to_equal_outputs() {
        let build = || {
            bag([
                ("A", PropertyValue::deferred("admin-secret", Attribute::Arn)),
                ("B", PropertyValue::from(vec![1.5_f64, 2.5_f64])),
            ])
        };
        let graph = graph();
        let first = build();
        let second = build();
        assert_eq!(first, second);
        assert_eq!(compile(&first, &graph).unwrap(), compile(&second, &graph).unwrap());
        // input untouched
        assert_eq!(first, build());
    }
}
