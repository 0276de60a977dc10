//! Property values and deferred references
//!
//! A resource's desired state is a [`PropertyBag`]: a sorted map of property
//! names to [`PropertyValue`]s. Most values are literals. A
//! [`PropertyValue::Deferred`] marks a value that only exists once another
//! resource in the same stack has been provisioned, and a
//! [`PropertyValue::Import`] marks a value published by a different stack.

use crate::error::GraphError;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Property names to values, kept sorted so plans serialize deterministically
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// Attribute selector for a deferred value
///
/// Which selectors are valid depends on the kind of the target resource,
/// see [`ResourceKind::attributes`](crate::node::ResourceKind::attributes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, Deserialize)]
pub enum Attribute {
    /// The identifier the backend generates for the resource
    Identifier,
    /// Fully qualified resource name
    Arn,
    /// Password generated for a secret
    GeneratedPassword,
    /// DNS server addresses of a directory
    DnsAddresses,
    /// Access alias of a directory
    Alias,
    /// Fully qualified domain name of a directory
    DomainName,
    /// Subnets without inbound internet access
    PrivateSubnetIds,
    /// Subnets routed to an internet gateway
    PublicSubnetIds,
    /// Address range of a network
    CidrBlock,
    /// Private address of an instance
    PrivateIp,
    /// Public DNS name of an instance
    PublicDnsName,
    /// Availability zone an instance landed in
    AvailabilityZone,
    /// Identifier of the group's owning network
    VpcId,
}

impl Attribute {
    /// Every selector, in declaration order
    pub const ALL: [Self; 13] = [
        Self::Identifier,
        Self::Arn,
        Self::GeneratedPassword,
        Self::DnsAddresses,
        Self::Alias,
        Self::DomainName,
        Self::PrivateSubnetIds,
        Self::PublicSubnetIds,
        Self::CidrBlock,
        Self::PrivateIp,
        Self::PublicDnsName,
        Self::AvailabilityZone,
        Self::VpcId,
    ];

    /// Selector name as written in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identifier => "Identifier",
            Self::Arn => "Arn",
            Self::GeneratedPassword => "GeneratedPassword",
            Self::DnsAddresses => "DnsAddresses",
            Self::Alias => "Alias",
            Self::DomainName => "DomainName",
            Self::PrivateSubnetIds => "PrivateSubnetIds",
            Self::PublicSubnetIds => "PublicSubnetIds",
            Self::CidrBlock => "CidrBlock",
            Self::PrivateIp => "PrivateIp",
            Self::PublicDnsName => "PublicDnsName",
            Self::AvailabilityZone => "AvailabilityZone",
            Self::VpcId => "VpcId",
        }
    }

    /// Attribute name as the provisioning backend spells it
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::DnsAddresses => "DnsIpAddresses",
            Self::DomainName => "Name",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "GeneratedIdentifier" {
            return Ok(Self::Identifier);
        }
        Self::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| GraphError::InvalidAttribute(s.to_string()))
    }
}

/// A value supplied by the provisioning backend once `target` is applied
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, Deserialize)]
pub struct DeferredValue {
    /// Name of the resource that produces the value
    pub target: String,
    /// Which of the target's attributes to substitute
    pub attribute: Attribute,
}

impl DeferredValue {
    pub fn new(target: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            target: target.into(),
            attribute,
        }
    }
}

impl fmt::Display for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute)
    }
}

/// A single property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(PropertyBag),
    /// Value produced by another resource in the same stack
    Deferred(DeferredValue),
    /// Value exported by another stack, by export name
    Import(String),
}

impl PropertyValue {
    /// Shorthand for a deferred reference
    pub fn deferred(target: impl Into<String>, attribute: Attribute) -> Self {
        Self::Deferred(DeferredValue::new(target, attribute))
    }

    /// Shorthand for a cross-stack import
    pub fn import(export: impl Into<String>) -> Self {
        Self::Import(export.into())
    }

    /// Whether this value and everything nested in it is a literal
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Deferred(_) | Self::Import(_) => false,
            Self::List(items) => items.iter().all(Self::is_resolved),
            Self::Map(bag) => bag.values().all(Self::is_resolved),
            _ => true,
        }
    }

    /// Call `f` for every deferred value nested anywhere in this value
    pub fn visit_deferred<F: FnMut(&DeferredValue)>(&self, f: &mut F) {
        match self {
            Self::Deferred(deferred) => f(deferred),
            Self::List(items) => items.iter().for_each(|item| item.visit_deferred(f)),
            Self::Map(bag) => bag.values().for_each(|value| value.visit_deferred(f)),
            _ => {}
        }
    }

    /// Call `f` for every import nested anywhere in this value
    pub fn visit_imports<F: FnMut(&str)>(&self, f: &mut F) {
        match self {
            Self::Import(export) => f(export),
            Self::List(items) => items.iter().for_each(|item| item.visit_imports(f)),
            Self::Map(bag) => bag.values().for_each(|value| value.visit_imports(f)),
            _ => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyBag> {
        match self {
            Self::Map(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Build a [`PropertyBag`] from `(name, value)` pairs
pub fn bag<K, V, I>(entries: I) -> PropertyBag
where
    K: Into<String>,
    V: Into<PropertyValue>,
    I: IntoIterator<Item = (K, V)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Call `f` for every deferred value in a bag
pub fn visit_bag_deferred<F: FnMut(&DeferredValue)>(bag: &PropertyBag, f: &mut F) {
    bag.values().for_each(|value| value.visit_deferred(f));
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for PropertyValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<DeferredValue> for PropertyValue {
    fn from(value: DeferredValue) -> Self {
        Self::Deferred(value)
    }
}

impl From<PropertyBag> for PropertyValue {
    fn from(value: PropertyBag) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(bag) => {
                let mut map = serializer.serialize_map(Some(bag.len()))?;
                for (key, value) in bag {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            // Unresolved markers only show up when debugging uncompiled bags
            Self::Deferred(deferred) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$deferred", &deferred.to_string())?;
                map.end()
            }
            Self::Import(export) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$import", export)?;
                map.end()
            }
        }
    }
}
