//! Template backend - writes emitted plans as deployment templates
//!
//! The template is the hand-off point to the real provisioning engine: one
//! `Resources` entry per planned step with its dependencies, and one `Outputs` entry
//! per export carrying its export name.

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use stackgraph::{OperationOutcome, PlannedExport, PlannedResource, ProvisioningBackend};
use std::fs;
use std::path::{Path, PathBuf};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Writes one template per stack to a file, or to stdout
#[derive(Debug)]
pub struct TemplateBackend {
    stack: String,
    destination: Option<PathBuf>,
    resources: Map<String, Value>,
    outputs: Map<String, Value>,
}

impl TemplateBackend {
    pub fn new(stack: &str, destination: Option<PathBuf>) -> Self {
        Self {
            stack: stack.to_string(),
            destination,
            resources: Map::new(),
            outputs: Map::new(),
        }
    }

    /// Template file for `stack` inside `dir`
    pub fn template_path(dir: &Path, stack: &str) -> PathBuf {
        dir.join(format!("{stack}.template.json"))
    }

    /// The template built so far
    pub fn template(&self) -> Value {
        let mut template = Map::new();
        template.insert(
            "AWSTemplateFormatVersion".into(),
            Value::from(TEMPLATE_FORMAT_VERSION),
        );
        template.insert(
            "Description".into(),
            Value::from(format!("Stack {}", self.stack)),
        );
        template.insert("Resources".into(), Value::Object(self.resources.clone()));
        if !self.outputs.is_empty() {
            template.insert("Outputs".into(), Value::Object(self.outputs.clone()));
        }
        Value::Object(template)
    }
}

/// Output logical IDs must be alphanumeric: "vpc-id" becomes "VpcId"
fn output_key(export: &str) -> String {
    export
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

impl ProvisioningBackend for TemplateBackend {
    fn name(&self) -> &str {
        "template"
    }

    fn apply(&mut self, _stack: &str, step: &PlannedResource) -> Result<OperationOutcome> {
        let mut resource = Map::new();
        resource.insert("Type".into(), Value::from(step.provider_type.clone()));
        resource.insert(
            "Properties".into(),
            serde_json::to_value(&step.properties)
                .with_context(|| format!("Failed to serialize properties of {}", step.name))?,
        );
        if !step.depends_on.is_empty() {
            resource.insert("DependsOn".into(), json!(step.depends_on));
        }

        let outcome = if self.resources.contains_key(&step.name) {
            OperationOutcome::Updated
        } else {
            OperationOutcome::Created
        };
        self.resources.insert(step.name.clone(), Value::Object(resource));
        Ok(outcome)
    }

    fn publish_exports(&mut self, _stack: &str, exports: &[PlannedExport]) -> Result<()> {
        for export in exports {
            self.outputs.insert(
                output_key(&export.name),
                json!({
                    "Description": format!("{}.{}", export.resource, export.attribute),
                    "Value": export.value,
                    "Export": { "Name": export.name },
                }),
            );
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let rendered = serde_json::to_string_pretty(&self.template())?;
        match &self.destination {
            Some(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Could not create {}", parent.display()))?;
                }
                fs::write(path, rendered + "\n")
                    .with_context(|| format!("Could not write template {}", path.display()))?;
                log::info!("Wrote template for stack '{}' to {}", self.stack, path.display());
            }
            None => println!("{rendered}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph::{Attribute, EmitOptions, PropertyValue, ResourceKind, ResourceNode, Stack, emit_simple};
    use tempfile::TempDir;

    fn plan() -> stackgraph::ExecutionPlan {
        let mut stack = Stack::new("network");
        stack
            .add_node(
                ResourceNode::new("Vpc", ResourceKind::Network).with_property("CidrBlock", "10.0.0.0/16"),
            )
            .unwrap();
        stack
            .add_node(
                ResourceNode::new("Sg", ResourceKind::SecurityGroup)
                    .with_property("VpcId", PropertyValue::deferred("Vpc", Attribute::Identifier)),
            )
            .unwrap();
        stack.export("vpc-id", "Vpc", Attribute::Identifier).unwrap();
        stack.plan().unwrap()
    }

    #[test]
    fn test_output_key() {
        assert_eq!(output_key("vpc-id"), "VpcId");
        assert_eq!(output_key("FQDN"), "FQDN");
        assert_eq!(output_key("instance_role.name"), "InstanceRoleName");
    }

    #[test]
    fn test_writes_template() {
        let dir = TempDir::new().unwrap();
        let path = TemplateBackend::template_path(&dir.path().join("out"), "network");
        let mut backend = TemplateBackend::new("network", Some(path.clone()));

        let summary = emit_simple(&plan(), &mut backend, &EmitOptions::default()).unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.exports_published, 1);

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["Resources"]["Vpc"]["Type"], "AWS::EC2::VPC");
        assert_eq!(written["Resources"]["Sg"]["DependsOn"], json!(["Vpc"]));
        assert_eq!(
            written["Resources"]["Sg"]["Properties"]["VpcId"],
            json!({ "Ref": "Vpc" })
        );
        assert_eq!(
            written["Outputs"]["VpcId"],
            json!({
                "Description": "Vpc.Identifier",
                "Value": { "Ref": "Vpc" },
                "Export": { "Name": "vpc-id" }
            })
        );
    }

    #[test]
    fn test_reapply_is_update() {
        let plan = plan();
        let mut backend = TemplateBackend::new("network", None);
        assert_eq!(backend.apply("network", &plan.steps[0]).unwrap(), OperationOutcome::Created);
        assert_eq!(backend.apply("network", &plan.steps[0]).unwrap(), OperationOutcome::Updated);
        assert!(backend.template().get("Outputs").is_none());
    }
}
