//! Stack manifest schema
//!
//! A manifest is a TOML file with one `[[stacks]]` table per deployment unit
//! and an optional `[blueprint]` table enabling the built-in directory
//! environment.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use stackgraph::{Attribute, PropertyBag, PropertyValue, ResourceKind, ResourceNode, Stack, StackSet};
use std::path::{Path, PathBuf};

use crate::blueprint::{BlueprintConfig, directory_environment};

/// Manifest read when `--manifest` is not given
pub const DEFAULT_MANIFEST: &str = "stackplan.toml";

// ============================================================================
// Main Manifest Schema
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub stacks: Vec<StackConfig>,

    /// Built-in directory environment settings
    #[serde(default)]
    pub blueprint: Option<BlueprintConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    #[serde(default)]
    pub exports: Vec<ExportConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    pub name: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub properties: toml::Table,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    pub name: String,
    pub resource: String,
    pub attribute: String,
}

/// Expand `~` in a user-supplied manifest path, falling back to the default
pub fn manifest_path(path: Option<&str>) -> PathBuf {
    let raw = path.unwrap_or(DEFAULT_MANIFEST);
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in stack manifest")
    }

    /// Build every declared stack
    ///
    /// The blueprint stack is added first when the manifest has a
    /// `[blueprint]` table or `with_builtin` is set.
    pub fn into_stack_set(self, with_builtin: bool) -> Result<StackSet> {
        let mut set = StackSet::new();

        if with_builtin || self.blueprint.is_some() {
            let config = self.blueprint.unwrap_or_default();
            let stack = directory_environment(&config).context("Invalid blueprint")?;
            set.add(stack)?;
        }

        for config in &self.stacks {
            let stack = config
                .build()
                .with_context(|| format!("Invalid stack '{}'", config.name))?;
            set.add(stack)?;
        }

        Ok(set)
    }
}

impl StackConfig {
    /// Build the stack: resources in declaration order, then explicit
    /// dependencies, then exports
    ///
    /// `depends_on` may name a resource declared further down the manifest.
    pub fn build(&self) -> Result<Stack> {
        let mut stack = Stack::new(&self.name);

        for resource in &self.resources {
            let node = resource
                .to_node()
                .with_context(|| format!("Invalid resource '{}'", resource.name))?;
            stack.add_node(node)?;
        }

        for resource in &self.resources {
            for dep in &resource.depends_on {
                stack
                    .add_dependency(&resource.name, dep)
                    .with_context(|| format!("Invalid resource '{}'", resource.name))?;
            }
        }

        for export in &self.exports {
            let attribute: Attribute = export
                .attribute
                .parse()
                .with_context(|| format!("Invalid export '{}'", export.name))?;
            stack
                .export(&export.name, &export.resource, attribute)
                .with_context(|| format!("Invalid export '{}'", export.name))?;
        }

        Ok(stack)
    }
}

impl ResourceConfig {
    /// The node with its properties; explicit dependencies are added by
    /// [`StackConfig::build`] once every resource exists
    pub fn to_node(&self) -> Result<ResourceNode> {
        let properties = convert_table(&self.properties)?;
        Ok(ResourceNode::new(&self.name, self.kind).with_properties(properties))
    }
}

// ============================================================================
// Value Conversion
// ============================================================================

fn convert_table(table: &toml::Table) -> Result<PropertyBag> {
    table
        .iter()
        .map(|(key, value)| {
            let converted = convert_value(value).with_context(|| format!("in property '{key}'"))?;
            Ok((key.clone(), converted))
        })
        .collect()
}

/// Convert a TOML value into a property value
///
/// `{ ref = "...", attribute = "..." }` becomes a deferred value and
/// `{ import = "..." }` a cross-stack import.
pub fn convert_value(value: &toml::Value) -> Result<PropertyValue> {
    Ok(match value {
        toml::Value::String(s) => PropertyValue::String(s.clone()),
        toml::Value::Integer(i) => PropertyValue::Integer(*i),
        toml::Value::Float(f) => PropertyValue::Float(*f),
        toml::Value::Boolean(b) => PropertyValue::Bool(*b),
        toml::Value::Datetime(dt) => bail!("datetime values are not supported: {dt}"),
        toml::Value::Array(items) => PropertyValue::List(
            items
                .iter()
                .map(convert_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        toml::Value::Table(table) => {
            if let Some(reference) = as_reference(table)? {
                reference
            } else {
                PropertyValue::Map(convert_table(table)?)
            }
        }
    })
}

/// Recognise the reference shapes; other tables are plain maps
fn as_reference(table: &toml::Table) -> Result<Option<PropertyValue>> {
    let is_deferred = table.len() == 2 && table.contains_key("ref") && table.contains_key("attribute");
    let is_import = table.len() == 1 && table.contains_key("import");

    if is_deferred {
        let (Some(target), Some(attribute)) = (
            table.get("ref").and_then(toml::Value::as_str),
            table.get("attribute").and_then(toml::Value::as_str),
        ) else {
            bail!("'ref' and 'attribute' must both be strings");
        };
        let attribute: Attribute = attribute.parse()?;
        return Ok(Some(PropertyValue::deferred(target, attribute)));
    }

    if is_import {
        let Some(export) = table.get("import").and_then(toml::Value::as_str) else {
            bail!("'import' must be a string");
        };
        return Ok(Some(PropertyValue::import(export)));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST: &str = r#"
[[stacks]]
name = "network"

[[stacks.resources]]
name = "vpc"
kind = "network"
[stacks.resources.properties]
CidrBlock = "10.0.0.0/16"
MaxAzs = 2

[[stacks.exports]]
name = "vpc-id"
resource = "vpc"
attribute = "GeneratedIdentifier"

[[stacks]]
name = "app"

[[stacks.resources]]
name = "sg"
kind = "security-group"
[stacks.resources.properties]
VpcId = { import = "vpc-id" }

[[stacks.resources]]
name = "host"
kind = "compute-instance"
depends_on = ["sg"]
[stacks.resources.properties]
SecurityGroupIds = [{ ref = "sg", attribute = "Identifier" }]
Tags = { Name = "host" }
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.stacks.len(), 2);
        assert!(manifest.blueprint.is_none());
        assert_eq!(manifest.stacks[1].resources[1].kind, ResourceKind::ComputeInstance);
        assert_eq!(manifest.stacks[1].resources[1].depends_on, vec!["sg"]);
    }

    #[test]
    fn test_reference_shapes() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let sg = manifest.stacks[1].resources[0].to_node().unwrap();
        assert_eq!(sg.properties["VpcId"], PropertyValue::import("vpc-id"));

        let host = manifest.stacks[1].resources[1].to_node().unwrap();
        assert_eq!(
            host.properties["SecurityGroupIds"],
            PropertyValue::List(vec![PropertyValue::deferred("sg", Attribute::Identifier)])
        );
        assert_eq!(
            host.properties["Tags"].as_map().unwrap()["Name"].as_str(),
            Some("host")
        );
    }

    #[test]
    fn test_stack_set_plans() {
        let mut set = Manifest::parse(MANIFEST).unwrap().into_stack_set(false).unwrap();
        let plans = set.plan_all(2).unwrap();
        let stacks: Vec<_> = plans.iter().map(|plan| plan.stack.as_str()).collect();
        assert_eq!(stacks, vec!["network", "app"]);
        assert_eq!(plans[1].names(), vec!["sg", "host"]);
    }

    #[test]
    fn test_builtin_blueprint_is_added() {
        let set = Manifest::default().into_stack_set(true).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get("directory-environment").is_some());

        let manifest = Manifest::parse("[blueprint]\nstack_name = \"corp\"\n").unwrap();
        let set = manifest.into_stack_set(false).unwrap();
        assert!(set.get("corp").is_some());
    }

    #[test]
    fn test_datetime_rejected() {
        let manifest = Manifest::parse(
            "[[stacks]]\nname = \"s\"\n[[stacks.resources]]\nname = \"r\"\nkind = \"secret\"\n[stacks.resources.properties]\nCreated = 1979-05-27T07:32:00Z\n",
        )
        .unwrap();
        let err = manifest.into_stack_set(false).unwrap_err();
        assert!(format!("{err:#}").contains("datetime"));
    }

    #[test]
    fn test_bad_export_attribute() {
        let manifest = Manifest::parse(
            "[[stacks]]\nname = \"s\"\n[[stacks.resources]]\nname = \"r\"\nkind = \"secret\"\n[[stacks.exports]]\nname = \"e\"\nresource = \"r\"\nattribute = \"DnsAddresses\"\n",
        )
        .unwrap();
        let err = manifest.into_stack_set(false).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid export 'e'"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Manifest::parse("[[stacks]]\nname = \"s\"\n[[stacks.resources]]\nname = \"r\"\nkind = \"bucket\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        let manifest = Manifest::load(file.path()).unwrap();
        assert_eq!(manifest.stacks[0].name, "network");

        let missing = Manifest::load(Path::new("/nonexistent/stackplan.toml")).unwrap_err();
        assert!(missing.to_string().contains("Could not read manifest"));
    }

    #[test]
    fn test_manifest_path() {
        assert_eq!(manifest_path(None), PathBuf::from(DEFAULT_MANIFEST));
        assert_eq!(manifest_path(Some("envs/a.toml")), PathBuf::from("envs/a.toml"));
    }

    #[test]
    fn test_depends_on_may_point_forward() {
        let manifest = Manifest::parse(
            "[[stacks]]\nname = \"s\"\n\
             [[stacks.resources]]\nname = \"host\"\nkind = \"compute-instance\"\ndepends_on = [\"role\"]\n\
             [[stacks.resources]]\nname = \"role\"\nkind = \"role\"\n",
        )
        .unwrap();
        let mut set = manifest.into_stack_set(false).unwrap();
        let plans = set.plan_all(1).unwrap();
        assert_eq!(plans[0].names(), vec!["role", "host"]);
    }

    #[test]
    fn test_depends_on_unknown_resource() {
        let manifest = Manifest::parse(
            "[[stacks]]\nname = \"s\"\n[[stacks.resources]]\nname = \"host\"\nkind = \"compute-instance\"\ndepends_on = [\"ghost\"]\n",
        )
        .unwrap();
        let err = manifest.into_stack_set(false).unwrap_err();
        assert!(format!("{err:#}").contains("unknown resource 'ghost'"));
    }
}
