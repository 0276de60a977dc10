//! Built-in directory environment blueprint
//!
//! A VPC, a managed Microsoft AD whose admin password is generated into a
//! secret, and a Windows jump box that joins the domain through an
//! automation document at launch.

use serde::{Deserialize, Serialize};
use stackgraph::{Attribute, ResourceExt, Stack};

use crate::resource::{
    DomainJoinDocument, GeneratedSecret, IngressRule, Instance, InstanceProfile, MicrosoftAd, Role,
    SSM_DIRECTORY_SERVICE_ACCESS, SSM_MANAGED_INSTANCE_CORE, SecurityGroup, Vpc, select,
};

/// Export names published by the blueprint
pub const EXPORT_VPC_ID: &str = "vpc-id";
pub const EXPORT_FQDN: &str = "FQDN";
pub const EXPORT_INSTANCE_ROLE: &str = "InstanceRoleName";
pub const EXPORT_DIRECTORY_ID: &str = "DirectoryId";

/// `[blueprint]` table of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlueprintConfig {
    /// Name of the generated stack
    pub stack_name: String,
    /// Fully qualified domain name of the directory
    pub domain_name: String,
    /// NetBIOS name
    pub short_name: Option<String>,
    /// Directory edition: Standard or Enterprise
    pub edition: String,
    pub vpc_cidr: String,
    pub instance_type: String,
    pub image_id: String,
    pub key_pair: Option<String>,
    /// CIDR allowed to reach the jump box over RDP; no rule when unset
    pub rdp_cidr: Option<String>,
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            stack_name: "directory-environment".to_string(),
            domain_name: "corp.example.com".to_string(),
            short_name: None,
            edition: "Standard".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            instance_type: "t3.medium".to_string(),
            image_id: "{{resolve:ssm:/aws/service/ami-windows-latest/Windows_Server-2022-English-Full-Base}}"
                .to_string(),
            key_pair: None,
            rdp_cidr: None,
        }
    }
}

/// Build the directory environment stack
pub fn directory_environment(config: &BlueprintConfig) -> stackgraph::Result<Stack> {
    let vpc = Vpc::new("Vpc", &config.vpc_cidr);
    let secret = GeneratedSecret::new("DirectoryAdminSecret", "Admin");
    let directory = MicrosoftAd {
        name: "Directory".to_string(),
        domain_name: config.domain_name.clone(),
        edition: config.edition.clone(),
        short_name: config.short_name.clone(),
        password: secret.reference(Attribute::GeneratedPassword),
        vpc: vpc.reference(Attribute::Identifier),
        subnets: vpc.reference(Attribute::PrivateSubnetIds),
    };
    let role = Role::for_ec2("InstanceRole")
        .with_policy(SSM_MANAGED_INSTANCE_CORE)
        .with_policy(SSM_DIRECTORY_SERVICE_ACCESS);
    let profile = InstanceProfile::new("InstanceProfile", role.reference(Attribute::Identifier));

    let mut security_group = SecurityGroup::new(
        "JumpBoxSecurityGroup",
        "Jump box access",
        vpc.reference(Attribute::Identifier),
    );
    if let Some(cidr) = &config.rdp_cidr {
        security_group = security_group.allow(IngressRule::tcp(3389, cidr));
    }

    let document = DomainJoinDocument {
        name: "DomainJoinDocument".to_string(),
        directory_id: directory.reference(Attribute::Identifier),
        domain_name: directory.reference(Attribute::DomainName),
        dns_addresses: directory.reference(Attribute::DnsAddresses),
    };
    let jump_box = Instance {
        name: "JumpBox".to_string(),
        instance_type: config.instance_type.clone(),
        image_id: config.image_id.clone(),
        key_pair: config.key_pair.clone(),
        subnet: select(0, vpc.reference(Attribute::PublicSubnetIds)),
        security_groups: vec![security_group.reference(Attribute::Identifier)],
        instance_profile: profile.reference(Attribute::Identifier),
        documents: vec![document.reference(Attribute::Identifier)],
        after: Vec::new(),
    };

    let mut stack = Stack::new(&config.stack_name);
    stack.add(&vpc)?;
    stack.add(&secret)?;
    stack.add(&directory)?;
    stack.add(&role)?;
    stack.add(&profile)?;
    stack.add(&security_group)?;
    stack.add(&document)?;
    stack.add(&jump_box)?;

    stack.export(EXPORT_VPC_ID, vpc.name.as_str(), Attribute::Identifier)?;
    stack.export(EXPORT_FQDN, directory.name.as_str(), Attribute::DomainName)?;
    stack.export(EXPORT_INSTANCE_ROLE, role.name.as_str(), Attribute::Identifier)?;
    stack.export(EXPORT_DIRECTORY_ID, directory.name.as_str(), Attribute::Identifier)?;

    log::debug!(
        "Built blueprint stack '{}' with {} resources",
        config.stack_name,
        stack.graph().len()
    );
    Ok(stack)
}
