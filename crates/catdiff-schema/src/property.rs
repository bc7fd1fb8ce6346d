//! Typed properties attached to bundles and channels.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cmp::Ordering;

/// Property type carrying a bundle's own package name and version.
pub const TYPE_PACKAGE: &str = "olm.package";
/// Property type declaring a required package and version range.
pub const TYPE_PACKAGE_REQUIRED: &str = "olm.package.required";
/// Property type declaring a provided API (group/version/kind).
pub const TYPE_GVK: &str = "olm.gvk";
/// Property type declaring a required API (group/version/kind).
pub const TYPE_GVK_REQUIRED: &str = "olm.gvk.required";
/// Property type carrying a channel's priority for default-channel selection.
pub const TYPE_CHANNEL_PRIORITY: &str = "olm.channel.priority";

/// Errors raised when a known property type carries a malformed value.
#[derive(thiserror::Error, Debug)]
pub enum PropertyError {
    /// The value did not match the shape expected for its type.
    #[error("parse {type_:?} property {value}: {source}")]
    Shape {
        /// The property type.
        type_: String,
        /// The raw value, serialized.
        value: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// A raw `{type, value}` property as written in a catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property type, e.g. `olm.package`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Property value; its shape depends on the type.
    pub value: Value,
}

impl Property {
    /// Builds a property of an arbitrary type.
    pub fn new(type_: &str, value: Value) -> Self {
        Self {
            type_: type_.to_string(),
            value,
        }
    }

    /// `olm.package` for the given package and version.
    pub fn package(name: &str, version: &str) -> Self {
        Self::new(
            TYPE_PACKAGE,
            json!({ "packageName": name, "version": version }),
        )
    }

    /// `olm.package.required` for the given package and range.
    pub fn package_required(name: &str, range: &str) -> Self {
        Self::new(
            TYPE_PACKAGE_REQUIRED,
            json!({ "packageName": name, "versionRange": range }),
        )
    }

    /// `olm.gvk` for a provided API.
    pub fn gvk(group: &str, version: &str, kind: &str) -> Self {
        Self::new(
            TYPE_GVK,
            json!({ "group": group, "version": version, "kind": kind }),
        )
    }

    /// `olm.gvk.required` for a required API.
    pub fn gvk_required(group: &str, version: &str, kind: &str) -> Self {
        Self::new(
            TYPE_GVK_REQUIRED,
            json!({ "group": group, "version": version, "kind": kind }),
        )
    }

    /// `olm.channel.priority` for the given channel.
    pub fn channel_priority(channel: &str, priority: i32) -> Self {
        Self::new(
            TYPE_CHANNEL_PRIORITY,
            json!({ "channel": channel, "priority": priority }),
        )
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, PropertyError> {
        serde_json::from_value(self.value.clone()).map_err(|source| PropertyError::Shape {
            type_: self.type_.clone(),
            value: self.value.to_string(),
            source,
        })
    }
}

/// Canonical ordering for properties: by type, then by serialized value.
pub fn compare_properties(a: &Property, b: &Property) -> Ordering {
    a.type_
        .cmp(&b.type_)
        .then_with(|| a.value.to_string().cmp(&b.value.to_string()))
}

/// Value of an `olm.package` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageProperty {
    /// Package the bundle belongs to.
    pub package_name: String,
    /// The bundle's semver version.
    pub version: String,
}

/// Value of an `olm.package.required` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequired {
    /// Package that must be present.
    pub package_name: String,
    /// Range its version must satisfy.
    pub version_range: String,
}

/// Value of an `olm.gvk` or `olm.gvk.required` property.
///
/// Two tuples match only when all three fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gvk {
    /// API group, e.g. `etcd.database.coreos.com`.
    pub group: String,
    /// API version, e.g. `v1`.
    pub version: String,
    /// Kind, e.g. `EtcdCluster`.
    pub kind: String,
}

impl std::fmt::Display for Gvk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.kind)
    }
}

/// Value of an `olm.channel.priority` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPriority {
    /// Channel the priority applies to.
    pub channel: String,
    /// Higher wins.
    pub priority: i32,
}

/// Properties sorted into typed buckets.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// `olm.package` values.
    pub packages: Vec<PackageProperty>,
    /// `olm.package.required` values.
    pub packages_required: Vec<PackageRequired>,
    /// `olm.gvk` values.
    pub gvks: Vec<Gvk>,
    /// `olm.gvk.required` values.
    pub gvks_required: Vec<Gvk>,
    /// `olm.channel.priority` values.
    pub channel_priorities: Vec<ChannelPriority>,
    /// Everything else, untouched.
    pub others: Vec<Property>,
}

impl Properties {
    /// Decodes every known property type.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Shape`] if a known type's value is malformed.
    pub fn parse(props: &[Property]) -> Result<Self, PropertyError> {
        let mut out = Self::default();
        for prop in props {
            match prop.type_.as_str() {
                TYPE_PACKAGE => out.packages.push(prop.decode()?),
                TYPE_PACKAGE_REQUIRED => out.packages_required.push(prop.decode()?),
                TYPE_GVK => out.gvks.push(prop.decode()?),
                TYPE_GVK_REQUIRED => out.gvks_required.push(prop.decode()?),
                TYPE_CHANNEL_PRIORITY => out.channel_priorities.push(prop.decode()?),
                _ => out.others.push(prop.clone()),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_buckets() {
        let props = vec![
            Property::package("etcd", "0.9.0"),
            Property::gvk("etcd.database.coreos.com", "v1", "EtcdCluster"),
            Property::gvk_required("etcd.database.coreos.com", "v1", "EtcdBackup"),
            Property::package_required("foo", "<0.2.0"),
            Property::new("olm.deprecated", json!({})),
        ];
        let parsed = Properties::parse(&props).unwrap();
        assert_eq!(parsed.packages[0].package_name, "etcd");
        assert_eq!(parsed.packages[0].version, "0.9.0");
        assert_eq!(parsed.gvks[0].kind, "EtcdCluster");
        assert_eq!(parsed.gvks_required[0].kind, "EtcdBackup");
        assert_eq!(parsed.packages_required[0].version_range, "<0.2.0");
        assert_eq!(parsed.others.len(), 1);
    }

    #[test]
    fn test_malformed_known_type() {
        let props = vec![Property::new(TYPE_PACKAGE, json!({ "version": 3 }))];
        let err = Properties::parse(&props).unwrap_err();
        assert!(err.to_string().contains("olm.package"));
    }

    #[test]
    fn test_canonical_order() {
        let mut props = vec![
            Property::package("foo", "0.1.0"),
            Property::gvk_required("a", "v1", "B"),
            Property::gvk("a", "v1", "A"),
        ];
        props.sort_by(compare_properties);
        let types: Vec<_> = props.iter().map(|p| p.type_.as_str()).collect();
        assert_eq!(types, vec![TYPE_GVK, TYPE_GVK_REQUIRED, TYPE_PACKAGE]);
    }
}
