//! Declarative-config catalog documents.
//!
//! A catalog is a stream of JSON (or YAML) objects, each tagged with a
//! `schema` field. Packages, channels and bundles are decoded into typed
//! structs; anything else is kept as raw JSON so it survives a round trip.

use crate::property::Property;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Schema tag of a package blob.
pub const SCHEMA_PACKAGE: &str = "olm.package";
/// Schema tag of a channel blob.
pub const SCHEMA_CHANNEL: &str = "olm.channel";
/// Schema tag of a bundle blob.
pub const SCHEMA_BUNDLE: &str = "olm.bundle";

/// Errors that can occur while reading or writing catalog documents.
#[derive(thiserror::Error, Debug)]
pub enum DeclcfgError {
    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Walking a catalog directory failed.
    #[error("walk catalog directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A JSON document could not be parsed or encoded.
    #[error("{origin}: invalid JSON: {source}")]
    Json {
        /// File name or stream label.
        origin: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A YAML document could not be parsed.
    #[error("{origin}: invalid YAML: {source}")]
    Yaml {
        /// File name.
        origin: String,
        /// Underlying parser error.
        #[source]
        source: serde_yaml::Error,
    },

    /// An object had no string `schema` field.
    #[error("{origin}: object has no \"schema\" field: {blob}")]
    MissingSchema {
        /// File name or stream label.
        origin: String,
        /// The offending object, truncated.
        blob: String,
    },
}

/// Icon embedded in a package blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    /// Base64 encoded image data.
    #[serde(rename = "base64data")]
    pub data: String,
    /// Image media type.
    #[serde(rename = "mediatype")]
    pub media_type: String,
}

/// An `olm.package` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Always `olm.package`.
    pub schema: String,
    /// Package name.
    pub name: String,
    /// Channel subscriptions use when none is named.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_channel: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Optional icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
}

/// One bundle's position in a channel's upgrade graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    /// Bundle name.
    pub name: String,
    /// Immediate upgrade predecessor.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replaces: String,
    /// Predecessors this bundle may upgrade from directly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skips: Vec<String>,
    /// Semver range of predecessors this bundle may upgrade from directly.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub skip_range: String,
}

/// An `olm.channel` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Always `olm.channel`.
    pub schema: String,
    /// Owning package.
    pub package: String,
    /// Channel name.
    pub name: String,
    /// Upgrade graph entries.
    #[serde(default)]
    pub entries: Vec<ChannelEntry>,
    /// Channel properties such as `olm.channel.priority`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

/// An image a bundle needs beyond its own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelatedImage {
    /// Optional short name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Image reference.
    pub image: String,
}

/// An `olm.bundle` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Always `olm.bundle`.
    pub schema: String,
    /// Owning package.
    pub package: String,
    /// Bundle name, unique within the package.
    pub name: String,
    /// Bundle image reference.
    #[serde(default)]
    pub image: String,
    /// Typed properties.
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Operand and auxiliary images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_images: Vec<RelatedImage>,
}

/// A full catalog document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarativeConfig {
    /// `olm.package` blobs.
    pub packages: Vec<Package>,
    /// `olm.channel` blobs.
    pub channels: Vec<Channel>,
    /// `olm.bundle` blobs.
    pub bundles: Vec<Bundle>,
    /// Blobs of any other schema, kept verbatim.
    pub others: Vec<Value>,
}

impl DeclarativeConfig {
    /// Returns true if the document holds no blobs at all.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
            && self.channels.is_empty()
            && self.bundles.is_empty()
            && self.others.is_empty()
    }

    /// Parses a stream of concatenated JSON objects.
    ///
    /// # Errors
    ///
    /// Returns [`DeclcfgError::Json`] on malformed input and
    /// [`DeclcfgError::MissingSchema`] for untagged objects.
    pub fn load_reader<R: Read>(reader: R, origin: &str) -> Result<Self, DeclcfgError> {
        let mut cfg = Self::default();
        let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();
        for blob in stream {
            let blob = blob.map_err(|source| DeclcfgError::Json {
                origin: origin.to_string(),
                source,
            })?;
            cfg.push_blob(blob, origin)?;
        }
        Ok(cfg)
    }

    /// Parses one or more `---`-separated YAML documents.
    ///
    /// # Errors
    ///
    /// Returns [`DeclcfgError::Yaml`] on malformed input and
    /// [`DeclcfgError::MissingSchema`] for untagged objects.
    pub fn load_yaml_str(content: &str, origin: &str) -> Result<Self, DeclcfgError> {
        let mut cfg = Self::default();
        for doc in serde_yaml::Deserializer::from_str(content) {
            let blob = Value::deserialize(doc).map_err(|source| DeclcfgError::Yaml {
                origin: origin.to_string(),
                source,
            })?;
            if blob.is_null() {
                continue;
            }
            cfg.push_blob(blob, origin)?;
        }
        Ok(cfg)
    }

    /// Loads a catalog from a file or from every `.json`, `.yaml` and `.yml`
    /// file below a directory, visited in file-name order.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclcfgError`] if any file cannot be read or parsed.
    pub fn load_path(path: &Path) -> Result<Self, DeclcfgError> {
        let mut cfg = Self::default();
        if path.is_file() {
            cfg.extend(Self::load_file(path)?);
            return Ok(cfg);
        }

        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_catalog_file(entry.path()) {
                continue;
            }
            debug!(file = %entry.path().display(), "loading catalog file");
            cfg.extend(Self::load_file(entry.path())?);
        }
        Ok(cfg)
    }

    fn load_file(path: &Path) -> Result<Self, DeclcfgError> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| DeclcfgError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::load_yaml_str(&content, &origin),
            _ => Self::load_reader(content.as_bytes(), &origin),
        }
    }

    fn push_blob(&mut self, blob: Value, origin: &str) -> Result<(), DeclcfgError> {
        let json_err = |source| DeclcfgError::Json {
            origin: origin.to_string(),
            source,
        };
        let Some(schema) = blob.get("schema").and_then(Value::as_str) else {
            return Err(DeclcfgError::MissingSchema {
                origin: origin.to_string(),
                blob: blob.to_string().chars().take(120).collect(),
            });
        };
        match schema {
            SCHEMA_PACKAGE => self
                .packages
                .push(serde_json::from_value(blob).map_err(json_err)?),
            SCHEMA_CHANNEL => self
                .channels
                .push(serde_json::from_value(blob).map_err(json_err)?),
            SCHEMA_BUNDLE => self
                .bundles
                .push(serde_json::from_value(blob).map_err(json_err)?),
            _ => self.others.push(blob),
        }
        Ok(())
    }

    /// Appends every blob of `other`.
    pub fn extend(&mut self, other: Self) {
        self.packages.extend(other.packages);
        self.channels.extend(other.channels);
        self.bundles.extend(other.bundles);
        self.others.extend(other.others);
    }

    /// Writes the document as pretty JSON objects: each package followed by
    /// its channels and bundles, then any other blobs.
    ///
    /// # Errors
    ///
    /// Returns [`DeclcfgError::Json`] if encoding or writing fails.
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<(), DeclcfgError> {
        for pkg in &self.packages {
            write_blob(&mut writer, pkg)?;
            for ch in self.channels.iter().filter(|c| c.package == pkg.name) {
                write_blob(&mut writer, ch)?;
            }
            for b in self.bundles.iter().filter(|b| b.package == pkg.name) {
                write_blob(&mut writer, b)?;
            }
        }
        for other in &self.others {
            write_blob(&mut writer, other)?;
        }
        writer.flush().map_err(|e| output_err(serde_json::Error::io(e)))
    }

    /// Combines several documents, keeping the last definition of each
    /// package, channel and bundle. Other blobs are concatenated.
    ///
    /// The result is sorted by package, then channel or bundle name.
    pub fn merge_prefer_last(configs: Vec<Self>) -> Self {
        let mut packages = BTreeMap::new();
        let mut channels = BTreeMap::new();
        let mut bundles = BTreeMap::new();
        let mut others = Vec::new();
        for cfg in configs {
            for p in cfg.packages {
                packages.insert(p.name.clone(), p);
            }
            for c in cfg.channels {
                channels.insert((c.package.clone(), c.name.clone()), c);
            }
            for b in cfg.bundles {
                bundles.insert((b.package.clone(), b.name.clone()), b);
            }
            others.extend(cfg.others);
        }
        Self {
            packages: packages.into_values().collect(),
            channels: channels.into_values().collect(),
            bundles: bundles.into_values().collect(),
            others,
        }
    }
}

fn output_err(source: serde_json::Error) -> DeclcfgError {
    DeclcfgError::Json {
        origin: "output".to_string(),
        source,
    }
}

fn write_blob<W: Write, T: Serialize>(writer: &mut W, blob: &T) -> Result<(), DeclcfgError> {
    serde_json::to_writer_pretty(&mut *writer, blob).map_err(output_err)?;
    writer
        .write_all(b"\n")
        .map_err(|e| output_err(serde_json::Error::io(e)))
}

fn is_catalog_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "yaml" | "yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = r#"
{"schema": "olm.package", "name": "foo", "defaultChannel": "stable"}
{"schema": "olm.channel", "package": "foo", "name": "stable",
 "entries": [{"name": "foo.v0.1.0"}, {"name": "foo.v0.2.0", "replaces": "foo.v0.1.0", "skipRange": "<0.2.0"}]}
{"schema": "olm.bundle", "package": "foo", "name": "foo.v0.1.0", "image": "reg/foo:v0.1.0",
 "properties": [{"type": "olm.package", "value": {"packageName": "foo", "version": "0.1.0"}}]}
{"schema": "olm.deprecations", "package": "foo"}
"#;

    #[test]
    fn test_load_stream() {
        let cfg = DeclarativeConfig::load_reader(STREAM.as_bytes(), "stdin").unwrap();
        assert_eq!(cfg.packages.len(), 1);
        assert_eq!(cfg.packages[0].default_channel, "stable");
        assert_eq!(cfg.channels[0].entries[1].replaces, "foo.v0.1.0");
        assert_eq!(cfg.channels[0].entries[1].skip_range, "<0.2.0");
        assert_eq!(cfg.bundles[0].image, "reg/foo:v0.1.0");
        assert_eq!(cfg.others.len(), 1);
    }

    #[test]
    fn test_missing_schema() {
        let err = DeclarativeConfig::load_reader(r#"{"name": "x"}"#.as_bytes(), "stdin")
            .unwrap_err();
        assert!(matches!(err, DeclcfgError::MissingSchema { .. }));
    }

    #[test]
    fn test_load_dir_mixed_formats() {
        let dir = tempfile::tempdir().unwrap();
        let pkg_dir = dir.path().join("foo");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(
            pkg_dir.join("package.yaml"),
            "schema: olm.package\nname: foo\ndefaultChannel: stable\n---\nschema: olm.channel\npackage: foo\nname: stable\nentries:\n  - name: foo.v0.1.0\n",
        )
        .unwrap();
        fs::write(
            pkg_dir.join("bundles.json"),
            r#"{"schema": "olm.bundle", "package": "foo", "name": "foo.v0.1.0", "image": "reg/foo:v0.1.0"}"#,
        )
        .unwrap();
        fs::write(pkg_dir.join("README.md"), "not a catalog").unwrap();

        let cfg = DeclarativeConfig::load_path(dir.path()).unwrap();
        assert_eq!(cfg.packages.len(), 1);
        assert_eq!(cfg.channels.len(), 1);
        assert_eq!(cfg.bundles.len(), 1);
    }

    #[test]
    fn test_write_groups_by_package() {
        let cfg = DeclarativeConfig::load_reader(STREAM.as_bytes(), "stdin").unwrap();
        let mut out = Vec::new();
        cfg.write_json(&mut out).unwrap();
        let reloaded = DeclarativeConfig::load_reader(out.as_slice(), "out").unwrap();
        assert_eq!(reloaded, cfg);

        let text = String::from_utf8(out).unwrap();
        let pkg_at = text.find("\"olm.package\"").unwrap();
        let ch_at = text.find("\"olm.channel\"").unwrap();
        assert!(pkg_at < ch_at);
        assert!(!text.contains("\"replaces\": \"\""));
    }

    #[test]
    fn test_merge_prefer_last() {
        let first = DeclarativeConfig::load_reader(STREAM.as_bytes(), "a").unwrap();
        let mut second = first.clone();
        second.bundles[0].image = "reg/foo@sha256:abc".to_string();
        second.others.clear();

        let merged = DeclarativeConfig::merge_prefer_last(vec![first, second]);
        assert_eq!(merged.packages.len(), 1);
        assert_eq!(merged.bundles.len(), 1);
        assert_eq!(merged.bundles[0].image, "reg/foo@sha256:abc");
        assert_eq!(merged.others.len(), 1);
    }
}
